//! Evaluates an operation graph: walks operations in dependency order,
//! skipping those that are up to date and executing the rest.

use crate::error::{Error, Result};
use crate::file_state::FileSystemState;
use crate::graph::{OperationGraph, OperationId};
use crate::history::BuildHistoryChecker;
use crate::progress::Progress;
use crate::task::{CommandRunner, ProcessRequest};
use crate::trace;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, error, warn};

/// The state of one operation within an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationState {
    /// Not yet reached by its last incoming edge.
    Pending,
    /// Up to date; not executed.
    Skipped,
    Succeeded,
    Failed,
}

/// Counts of what an evaluation did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EvaluateSummary {
    pub executed: usize,
    pub skipped: usize,
}

/// Depth-first walk over the graph that yields an operation once every
/// edge into it has been walked.
struct Scheduler {
    /// Edges into each visited operation not yet walked.
    remaining: FxHashMap<OperationId, i32>,
    stack: Vec<OperationId>,
}

impl Scheduler {
    fn new(graph: &OperationGraph) -> Self {
        Scheduler {
            remaining: FxHashMap::default(),
            stack: graph.root_operation_ids().iter().rev().copied().collect(),
        }
    }

    /// The next operation whose dependencies are all done, if any.
    fn next(&mut self, graph: &OperationGraph) -> Result<Option<OperationId>> {
        while let Some(id) = self.stack.pop() {
            let count = match self.remaining.get_mut(&id) {
                Some(count) => {
                    *count -= 1;
                    *count
                }
                None => {
                    let count = graph.operation(id)?.dependency_count - 1;
                    self.remaining.insert(id, count);
                    count
                }
            };
            if count < 0 {
                return Err(Error::NegativeDependencyCount(id));
            }
            if count == 0 {
                return Ok(Some(id));
            }
            // Another parent will finish this one.
        }
        Ok(None)
    }

    /// Mark `id` done, making its children visitable.
    fn finished(&mut self, graph: &OperationGraph, id: OperationId) -> Result<()> {
        let children = &graph.operation(id)?.children;
        self.stack.extend(children.iter().rev());
        Ok(())
    }
}

/// Whether an operation has to run: it never succeeded, or what it
/// observed last time is stale.
fn needs_run(
    graph: &OperationGraph,
    file_state: &mut FileSystemState,
    id: OperationId,
) -> Result<bool> {
    let op = graph.operation(id)?;
    if !op.was_successful_run {
        debug!("{}: no previous successful run", op.title);
        return Ok(true);
    }
    let outdated =
        BuildHistoryChecker::new(file_state).is_outdated(&op.observed_output, &op.observed_input);
    if outdated {
        debug!("{}: outdated", op.title);
    }
    Ok(outdated)
}

pub struct Work<'a> {
    graph: &'a mut OperationGraph,
    file_state: &'a mut FileSystemState,
    runner: &'a mut dyn CommandRunner,
    progress: &'a mut dyn Progress,
    states: FxHashMap<OperationId, OperationState>,
}

impl<'a> Work<'a> {
    pub fn new(
        graph: &'a mut OperationGraph,
        file_state: &'a mut FileSystemState,
        runner: &'a mut dyn CommandRunner,
        progress: &'a mut dyn Progress,
    ) -> Self {
        Work {
            graph,
            file_state,
            runner,
            progress,
            states: FxHashMap::default(),
        }
    }

    pub fn state(&self, id: OperationId) -> OperationState {
        self.states
            .get(&id)
            .copied()
            .unwrap_or(OperationState::Pending)
    }

    /// Walk the whole graph.  Stops at the first failing operation with
    /// Error::BuildFailed; operations not reached keep their previous state.
    pub fn run(&mut self) -> Result<EvaluateSummary> {
        let mut summary = EvaluateSummary::default();
        let mut scheduler = Scheduler::new(self.graph);
        while let Some(id) = scheduler.next(self.graph)? {
            if needs_run(self.graph, self.file_state, id)? {
                self.execute(id)?;
                summary.executed += 1;
            } else {
                let op = self.graph.operation(id)?;
                debug!("{}: up to date", op.title);
                self.progress.task_skipped(id, op);
                self.states.insert(id, OperationState::Skipped);
                summary.skipped += 1;
            }
            scheduler.finished(self.graph, id)?;
        }
        Ok(summary)
    }

    fn execute(&mut self, id: OperationId) -> Result<()> {
        let op = self.graph.operation(id)?;
        let request = ProcessRequest {
            command: &op.command,
            declared_input: op
                .declared_input
                .iter()
                .map(|&f| self.file_state.file_path(f))
                .collect(),
            declared_output: op
                .declared_output
                .iter()
                .map(|&f| self.file_state.file_path(f))
                .collect(),
        };

        self.progress.task_started(id, op);
        let runner = &mut self.runner;
        let result = trace::scope("run", || runner.run(&request)).map_err(|err| Error::Execute {
            title: op.title.clone(),
            message: format!("{:#}", err),
        })?;
        self.progress.task_finished(id, op, &result);

        if !result.stderr.is_empty() {
            error!("{}: {}", op.title, result.stderr.trim_end());
        }
        if !result.success() {
            if !result.stdout.is_empty() {
                warn!("{}: {}", op.title, result.stdout.trim_end());
            }
            self.states.insert(id, OperationState::Failed);
            return Err(Error::BuildFailed {
                id,
                title: op.title.clone(),
                exit_code: result.exit_code,
            });
        }

        let working_dir = op.command.working_directory.clone();
        let observed_input = self
            .file_state
            .to_file_ids(&working_dir, &result.observed_reads);
        let observed_output = self
            .file_state
            .to_file_ids(&working_dir, &result.observed_writes);
        self.file_state.check_file_write_times(&observed_output)?;

        let op = self.graph.operation_mut(id)?;
        op.was_successful_run = true;
        op.observed_input = observed_input;
        op.observed_output = observed_output;
        self.states.insert(id, OperationState::Succeeded);
        Ok(())
    }
}

/// Evaluate `graph`, executing what is out of date through `runner`.
pub fn evaluate(
    file_state: &mut FileSystemState,
    graph: &mut OperationGraph,
    runner: &mut dyn CommandRunner,
    progress: &mut dyn Progress,
) -> Result<EvaluateSummary> {
    Work::new(graph, file_state, runner, progress).run()
}

/// The operations an evaluation would execute, in the order it would
/// execute them, without running anything.  Operations downstream of one
/// that would run are listed too, as their inputs are about to change.
pub fn outdated(graph: &OperationGraph, file_state: &mut FileSystemState) -> Result<Vec<OperationId>> {
    let mut ids = Vec::new();
    let mut dirty: FxHashSet<OperationId> = FxHashSet::default();
    let mut scheduler = Scheduler::new(graph);
    while let Some(id) = scheduler.next(graph)? {
        if dirty.contains(&id) || needs_run(graph, file_state, id)? {
            ids.push(id);
            dirty.extend(graph.operation(id)?.children.iter().copied());
        }
        scheduler.finished(graph, id)?;
    }
    Ok(ids)
}
