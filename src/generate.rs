//! Builds an OperationGraph from declared operations, inferring the edges
//! between them from the files they declare.

use crate::canon;
use crate::error::{Error, Result};
use crate::file_state::FileSystemState;
use crate::graph::{CommandInfo, FileId, Operation, OperationGraph, OperationId};
use rustc_hash::FxHashMap;
use tracing::debug;

pub struct OperationGraphGenerator<'a> {
    file_state: &'a mut FileSystemState,
    graph: OperationGraph,
    next_id: u32,
}

impl<'a> OperationGraphGenerator<'a> {
    pub fn new(file_state: &'a mut FileSystemState) -> Self {
        let graph = OperationGraph::new(file_state.state_id());
        OperationGraphGenerator {
            file_state,
            graph,
            next_id: 1,
        }
    }

    /// Declare an operation.  Relative input/output paths are resolved
    /// against `working_directory`; a trailing '/' declares a directory.
    pub fn create_operation<S: AsRef<str>>(
        &mut self,
        title: &str,
        executable: &str,
        arguments: &str,
        working_directory: &str,
        declared_input: &[S],
        declared_output: &[S],
    ) -> Result<OperationId> {
        if !canon::is_absolute(working_directory) {
            return Err(Error::InvalidArgument(format!(
                "working directory must be absolute: {:?}",
                working_directory
            )));
        }
        let working_directory = canon::canon_path(format!("{}/", working_directory));
        let command = CommandInfo {
            working_directory,
            executable: executable.to_owned(),
            arguments: arguments.to_owned(),
        };
        if self.graph.has_command(&command) {
            return Err(Error::DuplicateOperation(command));
        }

        let id = OperationId(self.next_id);
        let declared_input = self
            .file_state
            .to_file_ids(&command.working_directory, declared_input);
        let declared_output = self
            .file_state
            .to_file_ids(&command.working_directory, declared_output);
        let op = Operation::new(
            id,
            title.to_owned(),
            command,
            declared_input,
            declared_output,
        );
        self.graph.add_operation(op)?;
        self.next_id += 1;
        Ok(id)
    }

    /// Finish the graph: infer parent->child edges, count dependencies and
    /// collect the roots.
    pub fn build_graph(self) -> Result<OperationGraph> {
        let OperationGraphGenerator {
            file_state,
            mut graph,
            ..
        } = self;

        let mut file_outputs: FxHashMap<FileId, Vec<OperationId>> = FxHashMap::default();
        let mut dir_outputs: FxHashMap<FileId, Vec<OperationId>> = FxHashMap::default();
        for op in graph.operations() {
            for &out in &op.declared_output {
                let index = if canon::is_dir(file_state.file_path(out)) {
                    &mut dir_outputs
                } else {
                    &mut file_outputs
                };
                index.entry(out).or_default().push(op.id);
            }
        }

        let mut edges: Vec<(OperationId, OperationId)> = Vec::new();
        for op in graph.operations() {
            // Producers of a file we read.
            for input in &op.declared_input {
                if let Some(parents) = file_outputs.get(input) {
                    edges.extend(parents.iter().map(|&parent| (parent, op.id)));
                }
            }
            // Creators of a directory we write into.
            for &out in &op.declared_output {
                for dir in canon::ancestors(file_state.file_path(out)) {
                    let parents = file_state
                        .try_find_file_id(dir)
                        .and_then(|dir| dir_outputs.get(&dir));
                    if let Some(parents) = parents {
                        edges.extend(parents.iter().map(|&parent| (parent, op.id)));
                    }
                }
            }
        }

        for (parent, child) in edges {
            if parent == child {
                continue;
            }
            let parent_op = graph.operation_mut(parent)?;
            if parent_op.children.contains(&child) {
                continue;
            }
            parent_op.children.push(child);
            graph.operation_mut(child)?.dependency_count += 1;
        }

        check_acyclic(&graph)?;

        let mut roots = Vec::new();
        for op in graph.operations_mut() {
            if op.dependency_count == 0 {
                op.dependency_count = 1;
                roots.push(op.id);
            }
        }
        debug!(
            operations = graph.len(),
            roots = roots.len(),
            "built operation graph"
        );
        graph.set_root_operation_ids(roots);
        Ok(graph)
    }
}

/// Kahn's algorithm: every operation must be reachable by retiring edges
/// from the operations with no parents.
fn check_acyclic(graph: &OperationGraph) -> Result<()> {
    let mut remaining: FxHashMap<OperationId, i32> = graph
        .operations()
        .map(|op| (op.id, op.dependency_count))
        .collect();
    let mut ready: Vec<OperationId> = graph
        .operations()
        .filter(|op| op.dependency_count == 0)
        .map(|op| op.id)
        .collect();
    let mut retired = 0;
    while let Some(id) = ready.pop() {
        retired += 1;
        for &child in &graph.operation(id)?.children {
            let count = remaining.entry(child).or_default();
            *count -= 1;
            if *count == 0 {
                ready.push(child);
            }
        }
    }
    if retired == remaining.len() {
        return Ok(());
    }
    let mut stuck: Vec<OperationId> = remaining
        .into_iter()
        .filter(|&(_, count)| count > 0)
        .map(|(id, _)| id)
        .collect();
    stuck.sort();
    Err(Error::Cycle(stuck))
}
