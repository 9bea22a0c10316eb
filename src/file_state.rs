//! FileSystemState: the per-run table of paths to FileIds, plus a cache of
//! their last write times.

use crate::canon;
use crate::densemap::DenseMap;
use crate::fs::{FileSystem, MTime};
use crate::graph::FileId;
use rustc_hash::FxHashMap;

pub struct FileSystemState {
    /// Opaque marker for this instance, persisted as the graph's StateId.
    state_id: u32,
    fs: Box<dyn FileSystem>,
    paths: DenseMap<FileId, String>,
    ids: FxHashMap<String, FileId>,
    /// Cached stat() results; None when not yet queried in this run.
    write_times: DenseMap<FileId, Option<MTime>>,
}

impl FileSystemState {
    pub fn new(fs: Box<dyn FileSystem>) -> Self {
        Self::with_state_id(std::process::id(), fs)
    }

    pub fn with_state_id(state_id: u32, fs: Box<dyn FileSystem>) -> Self {
        FileSystemState {
            state_id,
            fs,
            paths: DenseMap::default(),
            ids: FxHashMap::default(),
            write_times: DenseMap::default(),
        }
    }

    pub fn state_id(&self) -> u32 {
        self.state_id
    }

    /// Get the id for an absolute path, allocating one if it is new.
    /// The path is canonicalized first.
    pub fn to_file_id(&mut self, path: &str) -> FileId {
        let canon = canon::canon_path(path);
        self.intern(canon)
    }

    /// Like to_file_id, but resolves relative paths against `working_dir`.
    pub fn to_file_id_in(&mut self, working_dir: &str, path: &str) -> FileId {
        let canon = canon::resolve(working_dir, path);
        self.intern(canon)
    }

    /// Convert a list of paths, dropping repeats but keeping first-seen order.
    pub fn to_file_ids<S: AsRef<str>>(&mut self, working_dir: &str, paths: &[S]) -> Vec<FileId> {
        let mut ids = Vec::with_capacity(paths.len());
        for path in paths {
            let id = self.to_file_id_in(working_dir, path.as_ref());
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }

    fn intern(&mut self, canon: String) -> FileId {
        if let Some(&id) = self.ids.get(&canon) {
            return id;
        }
        let id = self.paths.push(canon.clone());
        self.ids.insert(canon, id);
        id
    }

    /// Look up an already-canonical path without allocating an id.
    pub fn try_find_file_id(&self, path: &str) -> Option<FileId> {
        self.ids.get(path).copied()
    }

    pub fn file_path(&self, id: FileId) -> &str {
        &self.paths[id]
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// The last write time of a file, stat()ing it on first use in this run.
    pub fn last_write_time(&mut self, id: FileId) -> std::io::Result<MTime> {
        if let Some(Some(mtime)) = self.write_times.lookup(id) {
            return Ok(*mtime);
        }
        self.refresh(id)
    }

    /// Drop any cached write times for these files and stat() them again.
    /// Called after an operation has (re)written them.
    pub fn check_file_write_times(&mut self, ids: &[FileId]) -> std::io::Result<()> {
        for &id in ids {
            self.refresh(id)?;
        }
        Ok(())
    }

    fn refresh(&mut self, id: FileId) -> std::io::Result<MTime> {
        let mtime = self.fs.stat(&self.paths[id])?;
        self.write_times.set_grow(id, Some(mtime), None);
        Ok(mtime)
    }
}
