//! Worker
//!
//! One execution context: takes a task at a time from its channel, runs it on
//! a blocking thread and reports back.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::pool::message::{WorkerId, WorkerReply, WorkerRequest};
use crate::pool::TaskHandler;

/// Spawns a worker. It announces itself with a `ready` reply, then serves
/// requests until its channel closes or its handler panics.
pub fn spawn_worker(
    worker_id: WorkerId,
    handler: Arc<dyn TaskHandler>,
    mut requests: mpsc::UnboundedReceiver<WorkerRequest>,
    replies: mpsc::UnboundedSender<WorkerReply>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if replies.send(WorkerReply::ready(worker_id)).is_err() {
            return;
        }

        while let Some(request) = requests.recv().await {
            let task_id = request.id;
            let kind = request.task.name();
            debug!("Worker {} running task {} ({})", worker_id, task_id, kind);

            let handler = Arc::clone(&handler);
            let task = request.task;
            let outcome = tokio::task::spawn_blocking(move || handler.handle(&task)).await;

            let (reply, faulted) = match outcome {
                Ok(Ok(data)) => (WorkerReply::success(worker_id, task_id, data), false),
                Ok(Err(message)) => (WorkerReply::error(worker_id, task_id, message), false),
                Err(join_error) => {
                    error!(
                        "Worker {} faulted on task {} ({}): {}",
                        worker_id, task_id, kind, join_error
                    );
                    let message = format!("{} task panicked", kind);
                    (WorkerReply::fault(worker_id, task_id, message), true)
                }
            };

            if replies.send(reply).is_err() || faulted {
                break;
            }
        }

        debug!("Worker {} stopped", worker_id);
    })
}
