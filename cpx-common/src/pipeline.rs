// cpx-common/src/pipeline.rs
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CpxError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum SchedulerEvent {
    RunStarted {
        total: usize,
        workers: usize,
    },
    /// Submitted to the pool; the walk may have blocked on a free slot first.
    TaskDispatched {
        name: String,
    },
    TaskStarted {
        name: String,
    },
    TaskSucceeded {
        name: String,
    },
    TaskFailed {
        name: String,
        error: String,
    },
    RunFinished {
        succeeded: usize,
        failed: usize,
        duration_secs: f64,
    },
}

impl SchedulerEvent {
    pub fn task_failed(name: String, error: &CpxError) -> Self {
        SchedulerEvent::TaskFailed {
            name,
            error: error.to_string(),
        }
    }
}

/// An install task that reported failure (or panicked).
#[derive(Debug, Clone)]
pub struct TaskFailure {
    pub name: String,
    pub error: CpxError,
}

/// Outcome of a single task as reported back by a worker.
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    pub name: String,
    pub result: Result<(), CpxError>,
}

/// Aggregate report returned once every dispatched task has finished.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Names in submission order.
    pub dispatch_order: Vec<String>,
    /// Names in the order workers finished them, failures included.
    pub completion_order: Vec<String>,
    pub succeeded: Vec<String>,
    pub failures: Vec<TaskFailure>,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn total(&self) -> usize {
        self.dispatch_order.len()
    }
}
