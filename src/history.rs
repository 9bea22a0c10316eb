//! Decides whether the files an operation produced last time are stale.

use crate::file_state::FileSystemState;
use crate::fs::MTime;
use crate::graph::FileId;
use std::time::SystemTime;
use tracing::debug;

pub struct BuildHistoryChecker<'a> {
    file_state: &'a mut FileSystemState,
}

impl<'a> BuildHistoryChecker<'a> {
    pub fn new(file_state: &'a mut FileSystemState) -> Self {
        BuildHistoryChecker { file_state }
    }

    /// An operation is outdated when one of its outputs is missing, an input
    /// is missing, or its oldest output is older than its newest input.
    /// Files that can't be stat()ed count as missing.
    pub fn is_outdated(&mut self, outputs: &[FileId], inputs: &[FileId]) -> bool {
        let mut oldest_output: Option<SystemTime> = None;
        for &id in outputs {
            match self.stamp(id) {
                Some(time) => {
                    oldest_output = Some(oldest_output.map_or(time, |t| t.min(time)));
                }
                None => {
                    debug!("output {} does not exist", self.file_state.file_path(id));
                    return true;
                }
            }
        }

        for &id in inputs {
            match self.stamp(id) {
                None => {
                    debug!("input {} does not exist", self.file_state.file_path(id));
                    return true;
                }
                Some(time) => {
                    if let Some(oldest) = oldest_output {
                        if oldest < time {
                            debug!("input {} is newer than outputs", self.file_state.file_path(id));
                            return true;
                        }
                    }
                }
            }
        }
        false
    }

    fn stamp(&mut self, id: FileId) -> Option<SystemTime> {
        match self.file_state.last_write_time(id) {
            Ok(MTime::Stamp(time)) => Some(time),
            Ok(MTime::Missing) => None,
            Err(err) => {
                debug!("stat {}: {}", self.file_state.file_path(id), err);
                None
            }
        }
    }
}
