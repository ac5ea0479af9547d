//! Worker Pool
//!
//! Fixed set of workers fed from a FIFO queue. Every dispatched task carries
//! its own timeout; a worker that misses it is retired and replaced.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures::future::join_all;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::config::PoolConfig;
use crate::error::TaskError;
use crate::pool::message::{ReplyKind, TaskId, WorkerId, WorkerReply, WorkerRequest};
use crate::pool::worker::spawn_worker;
use crate::pool::{BuiltinTasks, PoolStats, TaskHandler, TaskKind};

type Responder = oneshot::Sender<Result<Value, TaskError>>;

struct WorkerSlot {
    tx: mpsc::UnboundedSender<WorkerRequest>,
    handle: JoinHandle<()>,
    ready: bool,
    current: Option<TaskId>,
}

impl WorkerSlot {
    fn is_idle(&self) -> bool {
        self.ready && self.current.is_none()
    }
}

struct PendingTask {
    id: TaskId,
    task: TaskKind,
    responder: Responder,
    timeout: Duration,
    enqueued_at: Instant,
}

struct InFlight {
    worker_id: WorkerId,
    responder: Responder,
    timeout: Duration,
    timer: JoinHandle<()>,
}

#[derive(Default)]
struct PoolState {
    workers: BTreeMap<WorkerId, WorkerSlot>,
    queue: VecDeque<PendingTask>,
    in_flight: HashMap<TaskId, InFlight>,
    replies_tx: Option<mpsc::UnboundedSender<WorkerReply>>,
    reply_loop: Option<JoinHandle<()>>,
    next_worker_id: WorkerId,
    stats: PoolStats,
    initialized: bool,
    closed: bool,
}

struct PoolInner {
    config: PoolConfig,
    handler: Arc<dyn TaskHandler>,
    next_task_id: AtomicU64,
    state: Mutex<PoolState>,
}

// == Worker Pool ==
/// Clones share the same workers and queue.
#[derive(Clone)]
pub struct WorkerPool {
    inner: Arc<PoolInner>,
}

impl WorkerPool {
    /// Creates a pool running the built-in task kinds.
    pub fn new(config: PoolConfig) -> Self {
        Self::with_handler(config, Arc::new(BuiltinTasks))
    }

    pub fn with_handler(config: PoolConfig, handler: Arc<dyn TaskHandler>) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                config,
                handler,
                next_task_id: AtomicU64::new(1),
                state: Mutex::new(PoolState::default()),
            }),
        }
    }

    /// Number of workers the pool keeps alive.
    pub fn size(&self) -> usize {
        self.inner.config.size.max(1)
    }

    // == Lifecycle ==
    /// Spawns the workers. Also done lazily by the first task.
    pub fn init(&self) {
        let mut state = self.inner.state.lock();
        state.closed = false;
        self.inner.init_locked(&mut state);
    }

    /// Stops every worker and rejects queued and in-flight tasks with
    /// [`TaskError::Shutdown`]. Further tasks fail until `init()` is called.
    pub fn destroy(&self) {
        let (queued, in_flight) = {
            let mut state = self.inner.state.lock();
            state.closed = true;
            state.initialized = false;
            state.replies_tx = None;
            if let Some(handle) = state.reply_loop.take() {
                handle.abort();
            }
            for (_, worker) in std::mem::take(&mut state.workers) {
                worker.handle.abort();
            }
            let in_flight: Vec<InFlight> = state.in_flight.drain().map(|(_, f)| f).collect();
            (std::mem::take(&mut state.queue), in_flight)
        };

        info!(
            "Worker pool destroyed: rejecting {} queued and {} running tasks",
            queued.len(),
            in_flight.len()
        );
        for pending in queued {
            let _ = pending.responder.send(Err(TaskError::Shutdown));
        }
        for task in in_flight {
            task.timer.abort();
            let _ = task.responder.send(Err(TaskError::Shutdown));
        }
    }

    // == Execution ==
    /// Runs a task on the next idle worker. `timeout` defaults to the
    /// configured task timeout and counts from dispatch.
    pub async fn execute_task(
        &self,
        task: TaskKind,
        timeout: Option<Duration>,
    ) -> Result<Value, TaskError> {
        let inner = &self.inner;
        let (tx, rx) = oneshot::channel();
        {
            let mut state = inner.state.lock();
            if state.closed {
                return Err(TaskError::Shutdown);
            }
            inner.init_locked(&mut state);

            let id = inner.next_task_id.fetch_add(1, Ordering::SeqCst);
            debug!("Queued task {} ({})", id, task.name());
            state.queue.push_back(PendingTask {
                id,
                task,
                responder: tx,
                timeout: timeout.unwrap_or(inner.config.task_timeout),
                enqueued_at: Instant::now(),
            });
            state.stats.submitted += 1;
            inner.dispatch_pending(&mut state);
        }
        rx.await.unwrap_or(Err(TaskError::Shutdown))
    }

    /// Runs every task and returns their results in order. One failure does
    /// not affect the others.
    pub async fn execute_batch(
        &self,
        tasks: Vec<(TaskKind, Option<Duration>)>,
    ) -> Vec<Result<Value, TaskError>> {
        join_all(
            tasks
                .into_iter()
                .map(|(task, timeout)| self.execute_task(task, timeout)),
        )
        .await
    }

    // == Stats ==
    pub fn stats(&self) -> PoolStats {
        let state = self.inner.state.lock();
        let mut stats = state.stats.clone();
        stats.size = self.size();
        stats.workers = state.workers.len();
        stats.busy_workers = state.workers.values().filter(|w| w.current.is_some()).count();
        stats.queue_length = state.queue.len();
        stats
    }
}

impl PoolInner {
    fn init_locked(self: &Arc<Self>, state: &mut PoolState) {
        if state.initialized {
            return;
        }
        state.initialized = true;

        let (replies_tx, replies_rx) = mpsc::unbounded_channel();
        state.replies_tx = Some(replies_tx);
        state.reply_loop = Some(spawn_reply_loop(Arc::downgrade(self), replies_rx));

        let size = self.config.size.max(1);
        for _ in 0..size {
            self.spawn_worker_locked(state);
        }
        info!("Worker pool started with {} workers", size);
    }

    fn spawn_worker_locked(&self, state: &mut PoolState) {
        let Some(replies_tx) = state.replies_tx.clone() else {
            return;
        };
        let worker_id = state.next_worker_id;
        state.next_worker_id += 1;

        let (tx, rx) = mpsc::unbounded_channel();
        let handle = spawn_worker(worker_id, Arc::clone(&self.handler), rx, replies_tx);
        state.workers.insert(
            worker_id,
            WorkerSlot {
                tx,
                handle,
                ready: false,
                current: None,
            },
        );
    }

    /// Hands queued tasks to idle workers, lowest worker id first.
    fn dispatch_pending(self: &Arc<Self>, state: &mut PoolState) {
        while !state.queue.is_empty() {
            let Some(worker_id) = state
                .workers
                .iter()
                .find(|(_, worker)| worker.is_idle())
                .map(|(id, _)| *id)
            else {
                break;
            };
            let Some(pending) = state.queue.pop_front() else {
                break;
            };
            let Some(worker) = state.workers.get_mut(&worker_id) else {
                break;
            };

            let request = WorkerRequest {
                task: pending.task,
                id: pending.id,
            };
            if let Err(mpsc::error::SendError(request)) = worker.tx.send(request) {
                // Worker exited on its own; replace it and keep the task
                warn!("Worker {} is gone, replacing it", worker_id);
                state.workers.remove(&worker_id);
                state.queue.push_front(PendingTask {
                    task: request.task,
                    ..pending
                });
                state.stats.respawned += 1;
                self.spawn_worker_locked(state);
                continue;
            }

            worker.current = Some(pending.id);
            debug!(
                "Dispatched task {} to worker {} after {:?} in queue",
                pending.id,
                worker_id,
                pending.enqueued_at.elapsed()
            );
            let timer = self.spawn_timeout(pending.id, pending.timeout);
            state.in_flight.insert(
                pending.id,
                InFlight {
                    worker_id,
                    responder: pending.responder,
                    timeout: pending.timeout,
                    timer,
                },
            );
        }
    }

    fn spawn_timeout(self: &Arc<Self>, task_id: TaskId, timeout: Duration) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        tokio::spawn(async move {
            sleep(timeout).await;
            if let Some(inner) = weak.upgrade() {
                inner.on_timeout(task_id);
            }
        })
    }

    // == Replies ==
    fn on_reply(self: &Arc<Self>, reply: WorkerReply) {
        let mut state = self.state.lock();

        match reply.kind {
            ReplyKind::Ready => {
                if let Some(worker) = state.workers.get_mut(&reply.worker_id) {
                    worker.ready = true;
                }
            }
            ReplyKind::Success | ReplyKind::Error => {
                if let Some(worker) = state.workers.get_mut(&reply.worker_id) {
                    worker.ready = true;
                    if worker.current == reply.id {
                        worker.current = None;
                    }
                }
                self.settle(&mut state, reply);
            }
            ReplyKind::Fault => {
                warn!("Worker {} faulted: {}", reply.worker_id, reply.message());
                state.stats.faults += 1;
                if state.workers.remove(&reply.worker_id).is_some() {
                    state.stats.respawned += 1;
                    self.spawn_worker_locked(&mut state);
                }
                self.settle(&mut state, reply);
            }
        }

        self.dispatch_pending(&mut state);
    }

    /// Resolves the task a reply belongs to. Replies for tasks that already
    /// timed out are dropped.
    fn settle(&self, state: &mut PoolState, reply: WorkerReply) {
        let Some(task_id) = reply.id else {
            return;
        };
        let Some(in_flight) = state.in_flight.remove(&task_id) else {
            debug!("Dropping late reply for task {}", task_id);
            return;
        };
        in_flight.timer.abort();

        let result = match reply.kind {
            ReplyKind::Success => {
                state.stats.completed += 1;
                Ok(reply.data)
            }
            ReplyKind::Fault => {
                state.stats.failed += 1;
                Err(TaskError::WorkerFault {
                    worker_id: reply.worker_id,
                    message: reply.message(),
                })
            }
            ReplyKind::Error | ReplyKind::Ready => {
                state.stats.failed += 1;
                Err(TaskError::Failed(reply.message()))
            }
        };
        let _ = in_flight.responder.send(result);
    }

    fn on_timeout(self: &Arc<Self>, task_id: TaskId) {
        let mut state = self.state.lock();
        let Some(in_flight) = state.in_flight.remove(&task_id) else {
            return;
        };

        warn!(
            "Task {} timed out after {:?} on worker {}; replacing the worker",
            task_id, in_flight.timeout, in_flight.worker_id
        );
        state.stats.timed_out += 1;
        let _ = in_flight.responder.send(Err(TaskError::Timeout {
            task_id,
            after: in_flight.timeout,
        }));

        // Dropping the sender lets the worker exit once its job returns
        if state.workers.remove(&in_flight.worker_id).is_some() {
            state.stats.respawned += 1;
            self.spawn_worker_locked(&mut state);
        }
        self.dispatch_pending(&mut state);
    }
}

fn spawn_reply_loop(
    weak: Weak<PoolInner>,
    mut replies: mpsc::UnboundedReceiver<WorkerReply>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(reply) = replies.recv().await {
            let Some(inner) = weak.upgrade() else {
                break;
            };
            inner.on_reply(reply);
        }
    })
}
