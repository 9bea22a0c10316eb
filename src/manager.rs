//! Persistence of the operation graph between runs: load, save, and carrying
//! the observations of a previous run over to a freshly generated graph.

use crate::db;
use crate::error::{Error, Result};
use crate::file_state::FileSystemState;
use crate::graph::{FileId, OperationGraph};
use rustc_hash::FxHashMap;
use std::io::Write;
use std::path::Path;
use tracing::{error, info};

/// Load a previously saved graph, with its file ids rewritten into
/// `file_state`'s numbering.
///
/// A missing or malformed file is not an error: it yields Ok(None) and the
/// build proceeds as if there were no previous run.
pub fn try_load_state(
    path: &Path,
    file_state: &mut FileSystemState,
) -> Result<Option<OperationGraph>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            info!("no previous operation graph at {}", path.display());
            return Ok(None);
        }
        Err(err) => {
            error!("failed to read operation graph {}: {}", path.display(), err);
            return Ok(None);
        }
    };
    let mut graph = match db::deserialize(&bytes) {
        Ok(graph) => graph,
        Err(err) => {
            error!("ignoring operation graph {}: {}", path.display(), err);
            return Ok(None);
        }
    };
    remap_file_ids(&mut graph, file_state)?;
    info!(
        operations = graph.len(),
        "loaded operation graph from {}",
        path.display()
    );
    Ok(Some(graph))
}

/// Rewrite a loaded graph's file ids through its embedded path table.
fn remap_file_ids(graph: &mut OperationGraph, file_state: &mut FileSystemState) -> Result<()> {
    let mut mapping: FxHashMap<FileId, FileId> = FxHashMap::default();
    let mut files = Vec::with_capacity(graph.files().len());
    for (old, path) in graph.files() {
        let new = file_state.to_file_id(path);
        mapping.insert(*old, new);
        files.push((new, path.clone()));
    }
    for op in graph.operations_mut() {
        let id = op.id;
        op.remap_files(|old| {
            mapping.get(&old).copied().ok_or_else(|| {
                Error::Corrupt(format!(
                    "operation {} refers to file id {} missing from the file table",
                    id, old.0
                ))
            })
        })?;
    }
    graph.set_files(files);
    Ok(())
}

/// Persist `graph`, first recomputing its embedded path table from every
/// file it refers to.  The file is replaced atomically.
pub fn save_state(
    path: &Path,
    graph: &mut OperationGraph,
    file_state: &FileSystemState,
) -> Result<()> {
    let files = graph
        .referenced_files()
        .into_iter()
        .map(|id| (id, file_state.file_path(id).to_owned()))
        .collect();
    graph.set_files(files);
    graph.set_state_id(file_state.state_id());

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = Path::new(&tmp);
    {
        let mut w = db::Writer::new(std::io::BufWriter::new(std::fs::File::create(tmp)?));
        w.write_graph(graph)?;
        w.into_inner().flush()?;
    }
    std::fs::rename(tmp, path)?;
    info!(
        operations = graph.len(),
        "saved operation graph to {}",
        path.display()
    );
    Ok(())
}

/// Carry the run state of operations in the graph saved at `path` over to
/// the same commands in `graph`.  Returns whether a previous graph existed.
pub fn try_merge_existing(
    path: &Path,
    graph: &mut OperationGraph,
    file_state: &mut FileSystemState,
) -> Result<bool> {
    let previous = match try_load_state(path, file_state)? {
        Some(previous) => previous,
        None => return Ok(false),
    };
    let mut merged = 0;
    for op in graph.operations_mut() {
        if let Some(prev) = previous.try_find_operation(&op.command) {
            op.was_successful_run = prev.was_successful_run;
            op.observed_input = prev.observed_input.clone();
            op.observed_output = prev.observed_output.clone();
            merged += 1;
        }
    }
    info!(
        merged,
        previous = previous.len(),
        "merged previous operation graph"
    );
    Ok(true)
}
