// cpx-core/src/pipeline/engine.rs
use std::sync::Arc;

use cpx_common::dependency::PackageNode;
use cpx_common::pipeline::{SchedulerEvent, TaskOutcome};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use threadpool::ThreadPool;
use tracing::debug;

use super::worker::{self, send_event};
use crate::install::Installer;

/// Fixed-size pool with a counting semaphore in front of it.
///
/// The semaphore is a channel with `worker_limit` capacity: a token is sent
/// before a task is handed to the pool and taken back when the task ends, so
/// `submit` blocks the caller while every slot is occupied.
pub(super) struct WorkerPool {
    pool: ThreadPool,
    slots_tx: Sender<()>,
    slots_rx: Receiver<()>,
    outcome_tx: Sender<TaskOutcome>,
    installer: Arc<dyn Installer>,
    events: Option<Sender<SchedulerEvent>>,
}

/// Frees a slot on drop, including when the task unwinds.
struct SlotGuard(Receiver<()>);

impl Drop for SlotGuard {
    fn drop(&mut self) {
        let _ = self.0.try_recv();
    }
}

impl WorkerPool {
    pub(super) fn new(
        worker_limit: usize,
        installer: Arc<dyn Installer>,
        events: Option<Sender<SchedulerEvent>>,
    ) -> (Self, Receiver<TaskOutcome>) {
        let (slots_tx, slots_rx) = bounded(worker_limit);
        let (outcome_tx, outcome_rx) = unbounded();
        debug!("Worker pool created with {} workers", worker_limit);
        (
            Self {
                pool: ThreadPool::with_name("cpx-worker".to_string(), worker_limit),
                slots_tx,
                slots_rx,
                outcome_tx,
                installer,
                events,
            },
            outcome_rx,
        )
    }

    /// Hands `node` to the pool, blocking until a slot is free.
    pub(super) fn submit(&self, node: PackageNode) {
        // Both ends live in `self`, so the channel cannot be disconnected here.
        let _ = self.slots_tx.send(());
        send_event(
            self.events.as_ref(),
            SchedulerEvent::TaskDispatched {
                name: node.name.clone(),
            },
        );
        debug!("[{}] Submitting task to worker pool", node.name);

        let slot = SlotGuard(self.slots_rx.clone());
        let installer = Arc::clone(&self.installer);
        let outcome_tx = self.outcome_tx.clone();
        let events = self.events.clone();

        self.pool.execute(move || {
            let outcome = worker::execute_task(&node, installer.as_ref(), events.as_ref());
            drop(slot);
            let _ = outcome_tx.send(outcome);
        });
    }

    /// Waits for every submitted task to finish.
    pub(super) fn join(self) {
        self.pool.join();
        debug!("Worker pool drained");
    }
}
