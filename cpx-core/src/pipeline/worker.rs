// cpx-core/src/pipeline/worker.rs
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use cpx_common::dependency::PackageNode;
use cpx_common::error::CpxError;
use cpx_common::pipeline::{SchedulerEvent, TaskOutcome};
use crossbeam_channel::Sender;
use tracing::{debug, instrument, warn};

use crate::install::Installer;

/// Runs one install task on the current worker thread. A panic inside the
/// installer is turned into a failed outcome rather than tearing down the pool.
#[instrument(skip_all, fields(package = %node.name))]
pub(super) fn execute_task(
    node: &PackageNode,
    installer: &dyn Installer,
    events: Option<&Sender<SchedulerEvent>>,
) -> TaskOutcome {
    send_event(
        events,
        SchedulerEvent::TaskStarted {
            name: node.name.clone(),
        },
    );
    debug!("[{}] Install task started", node.name);

    let result = match panic::catch_unwind(AssertUnwindSafe(|| installer.install(node))) {
        Ok(result) => result,
        Err(payload) => Err(CpxError::InstallError(format!(
            "install task for '{}' panicked: {}",
            node.name,
            panic_message(payload.as_ref())
        ))),
    };

    match &result {
        Ok(()) => {
            debug!("[{}] Install task succeeded", node.name);
            send_event(
                events,
                SchedulerEvent::TaskSucceeded {
                    name: node.name.clone(),
                },
            );
        }
        Err(e) => {
            warn!("[{}] Install task failed: {}", node.name, e);
            send_event(events, SchedulerEvent::task_failed(node.name.clone(), e));
        }
    }

    TaskOutcome {
        name: node.name.clone(),
        result,
    }
}

pub(super) fn send_event(events: Option<&Sender<SchedulerEvent>>, event: SchedulerEvent) {
    if let Some(tx) = events {
        // Nobody listening is fine.
        let _ = tx.send(event);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
