//! Build progress reporting, for the purpose of display to the user.

use crate::graph::{Operation, OperationId};
use crate::task::ProcessResult;

/// Trait for build progress notifications.
pub trait Progress {
    /// Called when an operation is about to execute.
    fn task_started(&mut self, id: OperationId, op: &Operation);

    /// Called when an operation is up to date and won't execute.
    fn task_skipped(&mut self, id: OperationId, op: &Operation);

    /// Called when an operation's process exits.
    fn task_finished(&mut self, id: OperationId, op: &Operation, result: &ProcessResult);

    /// Log a line of output.
    fn log(&mut self, msg: &str);
}

/// Compute the message to display on the console for a given operation.
pub fn operation_message(op: &Operation) -> String {
    if op.title.is_empty() {
        op.command.cmdline()
    } else {
        op.title.clone()
    }
}

/// Progress implementation that prints one line per executed operation,
/// without any overprinting.
#[derive(Default)]
pub struct ConsoleProgress {
    /// Whether to print command lines of started programs.
    verbose: bool,
    started: usize,
}

impl ConsoleProgress {
    pub fn new(verbose: bool) -> Self {
        ConsoleProgress {
            verbose,
            started: 0,
        }
    }
}

impl Progress for ConsoleProgress {
    fn task_started(&mut self, _id: OperationId, op: &Operation) {
        self.started += 1;
        let msg = if self.verbose {
            op.command.cmdline()
        } else {
            operation_message(op)
        };
        self.log(&format!("[{}] {}", self.started, msg));
    }

    fn task_skipped(&mut self, _id: OperationId, _op: &Operation) {
        // ignore
    }

    fn task_finished(&mut self, _id: OperationId, op: &Operation, result: &ProcessResult) {
        if !result.success() {
            self.log(&format!("failed: {}", operation_message(op)));
        } else if self.verbose && !result.stdout.is_empty() {
            print!("{}", result.stdout);
        }
    }

    fn log(&mut self, msg: &str) {
        println!("{}", msg);
    }
}

/// Progress implementation that prints nothing.
#[derive(Default)]
pub struct NoProgress {}

impl Progress for NoProgress {
    fn task_started(&mut self, _id: OperationId, _op: &Operation) {}
    fn task_skipped(&mut self, _id: OperationId, _op: &Operation) {}
    fn task_finished(&mut self, _id: OperationId, _op: &Operation, _result: &ProcessResult) {}
    fn log(&mut self, _msg: &str) {}
}
