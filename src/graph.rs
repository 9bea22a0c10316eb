//! The operation graph: build steps, the edges between them, and the
//! observation state carried from one run to the next.

use crate::densemap::{self, DenseMap};
use crate::error::{Error, Result};
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;

/// Id for a path within one FileSystemState.  Not stable across runs.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct FileId(pub u32);
impl densemap::Index for FileId {
    fn index(&self) -> usize {
        self.0 as usize
    }
}
impl From<usize> for FileId {
    fn from(u: usize) -> FileId {
        FileId(u as u32)
    }
}

/// Id for an operation, assigned from 1 upwards by the generator.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct OperationId(pub u32);
impl densemap::Index for OperationId {
    fn index(&self) -> usize {
        self.0 as usize - 1
    }
}
impl From<usize> for OperationId {
    fn from(u: usize) -> OperationId {
        OperationId(u as u32 + 1)
    }
}
impl std::fmt::Display for OperationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The command an operation runs.  Two operations with the same
/// CommandInfo are the same operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandInfo {
    pub working_directory: String,
    pub executable: String,
    pub arguments: String,
}

impl CommandInfo {
    /// The command as a single line, as handed to a shell.
    pub fn cmdline(&self) -> String {
        if self.arguments.is_empty() {
            self.executable.clone()
        } else {
            format!("{} {}", self.executable, self.arguments)
        }
    }
}

impl std::fmt::Display for CommandInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} in {:?}", self.cmdline(), self.working_directory)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub id: OperationId,
    pub title: String,
    pub command: CommandInfo,
    /// Files the author says this operation reads.
    pub declared_input: Vec<FileId>,
    /// Files or directories the author says this operation writes.
    pub declared_output: Vec<FileId>,
    pub children: Vec<OperationId>,
    /// Number of distinct incoming edges, or 1 for a root.
    pub dependency_count: i32,
    pub was_successful_run: bool,
    /// Files actually read during the last successful run.
    pub observed_input: Vec<FileId>,
    /// Files actually written during the last successful run.
    pub observed_output: Vec<FileId>,
}

impl Operation {
    pub fn new(
        id: OperationId,
        title: String,
        command: CommandInfo,
        declared_input: Vec<FileId>,
        declared_output: Vec<FileId>,
    ) -> Self {
        Operation {
            id,
            title,
            command,
            declared_input,
            declared_output,
            children: Vec::new(),
            dependency_count: 0,
            was_successful_run: false,
            observed_input: Vec::new(),
            observed_output: Vec::new(),
        }
    }

    /// Every file id this operation refers to.
    pub fn file_ids(&self) -> impl Iterator<Item = FileId> + '_ {
        self.declared_input
            .iter()
            .chain(self.declared_output.iter())
            .chain(self.observed_input.iter())
            .chain(self.observed_output.iter())
            .copied()
    }

    /// Rewrite every file id through `f`.
    pub fn remap_files(&mut self, mut f: impl FnMut(FileId) -> Result<FileId>) -> Result<()> {
        for set in [
            &mut self.declared_input,
            &mut self.declared_output,
            &mut self.observed_input,
            &mut self.observed_output,
        ] {
            for id in set.iter_mut() {
                *id = f(*id)?;
            }
        }
        Ok(())
    }
}

pub struct OperationGraph {
    /// Marker of the FileSystemState generation that produced this graph.
    state_id: u32,
    operations: DenseMap<OperationId, Option<Operation>>,
    by_command: FxHashMap<CommandInfo, OperationId>,
    root_operation_ids: Vec<OperationId>,
    /// Paths of the files referenced by operations, making the graph
    /// self-describing once it leaves the FileSystemState that built it.
    files: Vec<(FileId, String)>,
}

impl OperationGraph {
    pub fn new(state_id: u32) -> Self {
        OperationGraph {
            state_id,
            operations: DenseMap::default(),
            by_command: FxHashMap::default(),
            root_operation_ids: Vec::new(),
            files: Vec::new(),
        }
    }

    pub fn state_id(&self) -> u32 {
        self.state_id
    }

    pub fn set_state_id(&mut self, state_id: u32) {
        self.state_id = state_id;
    }

    pub fn root_operation_ids(&self) -> &[OperationId] {
        &self.root_operation_ids
    }

    pub fn set_root_operation_ids(&mut self, ids: Vec<OperationId>) {
        self.root_operation_ids = ids;
    }

    pub fn files(&self) -> &[(FileId, String)] {
        &self.files
    }

    pub fn set_files(&mut self, files: Vec<(FileId, String)>) {
        self.files = files;
    }

    pub fn has_command(&self, command: &CommandInfo) -> bool {
        self.by_command.contains_key(command)
    }

    pub fn try_find_operation(&self, command: &CommandInfo) -> Option<&Operation> {
        let id = *self.by_command.get(command)?;
        self.operation(id).ok()
    }

    pub fn operation(&self, id: OperationId) -> Result<&Operation> {
        if id.0 == 0 {
            return Err(Error::NotFound(id));
        }
        match self.operations.lookup(id) {
            Some(Some(op)) => Ok(op),
            _ => Err(Error::NotFound(id)),
        }
    }

    pub fn operation_mut(&mut self, id: OperationId) -> Result<&mut Operation> {
        if id.0 == 0 {
            return Err(Error::NotFound(id));
        }
        match self.operations.lookup_mut(id) {
            Some(Some(op)) => Ok(op),
            _ => Err(Error::NotFound(id)),
        }
    }

    pub fn add_operation(&mut self, op: Operation) -> Result<()> {
        if op.id.0 == 0 || matches!(self.operations.lookup(op.id), Some(Some(_))) {
            return Err(Error::DuplicateId(op.id));
        }
        if self.by_command.contains_key(&op.command) {
            return Err(Error::DuplicateOperation(op.command));
        }
        self.by_command.insert(op.command.clone(), op.id);
        let id = op.id;
        self.operations.set_grow(id, Some(op), None);
        Ok(())
    }

    /// Operations in id order.
    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.operations.iter().filter_map(|(_, op)| op.as_ref())
    }

    pub fn operations_mut(&mut self) -> impl Iterator<Item = &mut Operation> {
        self.operations.values_mut().filter_map(|op| op.as_mut())
    }

    pub fn len(&self) -> usize {
        self.operations().count()
    }

    pub fn is_empty(&self) -> bool {
        self.operations().next().is_none()
    }

    /// The union of every file id referenced by any operation.
    pub fn referenced_files(&self) -> BTreeSet<FileId> {
        self.operations().flat_map(|op| op.file_ids()).collect()
    }
}

impl std::fmt::Debug for OperationGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationGraph")
            .field("state_id", &self.state_id)
            .field("root_operation_ids", &self.root_operation_ids)
            .field("operations", &self.operations().collect::<Vec<_>>())
            .field("files", &self.files)
            .finish()
    }
}
