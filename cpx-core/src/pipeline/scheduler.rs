// cpx-core/src/pipeline/scheduler.rs
//! Dependency-first dispatch of a resolved graph onto a bounded worker pool.
//!
//! A dependency is always *submitted* before its dependents, but nothing waits
//! for it to *finish*: with more than one worker a dependent can start while
//! one of its dependencies is still installing. Runs with a single worker
//! admit and complete tasks strictly in submission order.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use cpx_common::dependency::{NodeId, ResolvedGraph};
use cpx_common::error::{CpxError, Result};
use cpx_common::pipeline::{RunReport, SchedulerEvent, TaskFailure};
use crossbeam_channel::Sender;
use tracing::{debug, instrument};

use super::engine::WorkerPool;
use super::worker::send_event;
use crate::install::Installer;

#[derive(Debug, Clone)]
pub struct Scheduler {
    worker_limit: usize,
    events: Option<Sender<SchedulerEvent>>,
}

impl Scheduler {
    pub fn new(worker_limit: usize) -> Result<Self> {
        if worker_limit == 0 {
            return Err(CpxError::Config(
                "worker limit must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            worker_limit,
            events: None,
        })
    }

    /// Streams progress events to `events` while running.
    pub fn with_events(mut self, events: Sender<SchedulerEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn worker_limit(&self) -> usize {
        self.worker_limit
    }

    /// Runs `installer` once for every node reachable from the graph's roots
    /// and returns after all of them have finished.
    #[instrument(skip_all, fields(workers = self.worker_limit))]
    pub fn run(&self, graph: &ResolvedGraph, installer: Arc<dyn Installer>) -> RunReport {
        let started = Instant::now();
        let total = graph.reachable_count();
        debug!(
            "Scheduling {} package(s) on {} worker(s)",
            total, self.worker_limit
        );
        send_event(
            self.events.as_ref(),
            SchedulerEvent::RunStarted {
                total,
                workers: self.worker_limit,
            },
        );

        let (pool, outcomes) = WorkerPool::new(self.worker_limit, installer, self.events.clone());
        let mut walk = Walk {
            graph,
            pool: &pool,
            visited: HashSet::new(),
            dispatch_order: Vec::with_capacity(total),
        };
        walk.visit_level(graph.roots());
        let dispatch_order = walk.dispatch_order;
        debug!("All {} task(s) dispatched; waiting", dispatch_order.len());

        pool.join();

        let mut report = RunReport {
            dispatch_order,
            ..RunReport::default()
        };
        for outcome in outcomes.try_iter() {
            report.completion_order.push(outcome.name.clone());
            match outcome.result {
                Ok(()) => report.succeeded.push(outcome.name),
                Err(error) => report.failures.push(TaskFailure {
                    name: outcome.name,
                    error,
                }),
            }
        }
        report.elapsed = started.elapsed();

        debug!(
            "Run finished: {} succeeded, {} failed in {}",
            report.succeeded.len(),
            report.failures.len(),
            humantime::format_duration(truncate_to_millis(report.elapsed))
        );
        send_event(
            self.events.as_ref(),
            SchedulerEvent::RunFinished {
                succeeded: report.succeeded.len(),
                failed: report.failures.len(),
                duration_secs: report.elapsed.as_secs_f64(),
            },
        );
        report
    }
}

/// State of one walk over the graph. Only the walking thread touches it.
struct Walk<'a> {
    graph: &'a ResolvedGraph,
    pool: &'a WorkerPool,
    visited: HashSet<String>,
    dispatch_order: Vec<String>,
}

impl Walk<'_> {
    fn visit_level(&mut self, level: &BTreeMap<String, NodeId>) {
        for id in level.values() {
            self.visit(*id);
        }
    }

    fn visit(&mut self, id: NodeId) {
        let graph = self.graph;
        let node = graph.node(id);
        if !self.visited.insert(node.name.clone()) {
            return;
        }
        if node.has_dependencies() {
            self.visit_level(&node.dependencies);
        }
        self.dispatch_order.push(node.name.clone());
        self.pool.submit(node.clone());
    }
}

fn truncate_to_millis(d: Duration) -> Duration {
    Duration::from_millis(d.as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpx_common::dependency::PackageNode;

    #[test]
    fn zero_workers_is_a_config_error() {
        assert!(matches!(Scheduler::new(0), Err(CpxError::Config(_))));
        assert_eq!(Scheduler::new(3).unwrap().worker_limit(), 3);
    }

    #[test]
    fn empty_graph_finishes_immediately() {
        let scheduler = Scheduler::new(2).unwrap();
        let installer: Arc<dyn Installer> =
            Arc::new(|_: &PackageNode| -> Result<()> { panic!("nothing to install") });
        let report = scheduler.run(&ResolvedGraph::new(), installer);
        assert_eq!(report.total(), 0);
        assert!(report.is_success());
    }

    #[test]
    fn events_bracket_the_run() {
        let mut graph = ResolvedGraph::new();
        let foo = graph.add_node("Foo", "", "", BTreeMap::new());
        graph.add_root("Foo", foo);

        let (tx, rx) = crossbeam_channel::unbounded();
        let scheduler = Scheduler::new(1).unwrap().with_events(tx);
        let installer: Arc<dyn Installer> = Arc::new(|_: &PackageNode| -> Result<()> { Ok(()) });
        scheduler.run(&graph, installer);

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            events.first(),
            Some(&SchedulerEvent::RunStarted {
                total: 1,
                workers: 1
            })
        );
        assert!(events.contains(&SchedulerEvent::TaskDispatched { name: "Foo".into() }));
        assert!(events.contains(&SchedulerEvent::TaskSucceeded { name: "Foo".into() }));
        assert!(matches!(
            events.last(),
            Some(SchedulerEvent::RunFinished {
                succeeded: 1,
                failed: 0,
                ..
            })
        ));
    }
}
