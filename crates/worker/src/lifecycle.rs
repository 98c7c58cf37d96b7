//! Worker lifecycle state machine.
//!
//! installing -> installed -> activating -> activated. There is no terminal
//! state: a worker is retired only when the next version's install cycle
//! supersedes it.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use swcache_core::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Installing,
    Installed,
    Activating,
    Activated,
}

impl WorkerState {
    pub fn can_transition_to(self, next: WorkerState) -> bool {
        matches!(
            (self, next),
            (WorkerState::Installing, WorkerState::Installed)
                | (WorkerState::Installed, WorkerState::Activating)
                | (WorkerState::Activating, WorkerState::Activated)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current state of one worker instance.
#[derive(Debug)]
pub struct Lifecycle {
    tag: String,
    state: Mutex<WorkerState>,
}

impl Lifecycle {
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into(), state: Mutex::new(WorkerState::Installing) }
    }

    pub fn state(&self) -> WorkerState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move to `next`, returning the state left behind.
    pub fn transition(&self, next: WorkerState) -> Result<WorkerState, Error> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = *state;
        if !previous.can_transition_to(next) {
            return Err(Error::InvalidState(format!("{}: cannot go from {previous} to {next}", self.tag)));
        }
        *state = next;
        tracing::info!(generation = %self.tag, from = %previous, to = %next, "worker state changed");
        Ok(previous)
    }
}
