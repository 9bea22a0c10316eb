//! Errors produced by graph construction, persistence and evaluation.

use crate::graph::{CommandInfo, OperationId};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("operation already exists: {0}")]
    DuplicateOperation(CommandInfo),
    #[error("operation id already exists: {0}")]
    DuplicateId(OperationId),
    #[error("operation not found: {0}")]
    NotFound(OperationId),
    #[error("corrupt operation graph: {0}")]
    Corrupt(String),
    #[error("negative dependency count for operation {0}")]
    NegativeDependencyCount(OperationId),
    #[error("dependency cycle between operations {0:?}")]
    Cycle(Vec<OperationId>),
    /// A build step exited with a non-zero code.  Evaluation stopped after it.
    #[error("build failed: {title:?} exited with {exit_code}")]
    BuildFailed {
        id: OperationId,
        title: String,
        exit_code: i32,
    },
    /// The step could not be run at all (e.g. spawn failure).
    #[error("running {title:?}: {message}")]
    Execute { title: String, message: String },
    /// A build extension failed while declaring operations.
    #[error("extension {name}: {message}")]
    Extension { name: String, message: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
