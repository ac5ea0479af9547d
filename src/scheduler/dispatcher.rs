//! Request Scheduler
//!
//! Admission control for outbound calls: high priority runs inline, normal
//! and low priority wait for a batch cycle, and everything submitted while
//! offline is parked until connectivity returns.

use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use futures::future::join_all;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

use crate::config::SchedulerConfig;
use crate::error::RequestError;
use crate::scheduler::batch::{group_by_origin, BatchEnvelope};
use crate::scheduler::{
    ConnectionQuality, NetworkMonitor, NetworkStatus, PreparedRequest, Priority, RequestConfig,
    RetryPolicy, SchedulerStats, Transport,
};

type Responder = oneshot::Sender<Result<Value, RequestError>>;

/// A call waiting for the next batch cycle.
struct QueuedRequest {
    request: PreparedRequest,
    responder: Responder,
    enqueued_at: Instant,
}

/// A call waiting for connectivity.
struct ParkedRequest {
    request: PreparedRequest,
    responder: Responder,
}

#[derive(Default)]
struct SchedulerState {
    queue: Vec<QueuedRequest>,
    parked: Vec<ParkedRequest>,
    batch_timer: Option<JoinHandle<()>>,
    watcher: Option<JoinHandle<()>>,
    stats: SchedulerStats,
    initialized: bool,
    closed: bool,
}

struct SchedulerInner {
    config: SchedulerConfig,
    retry: RetryPolicy,
    transport: Arc<dyn Transport>,
    network: NetworkMonitor,
    next_id: AtomicU64,
    state: Mutex<SchedulerState>,
}

// == Request Scheduler ==
/// Long-lived request scheduler. Clones share the same queue.
#[derive(Clone)]
pub struct RequestScheduler {
    inner: Arc<SchedulerInner>,
}

impl RequestScheduler {
    pub fn new(
        config: SchedulerConfig,
        transport: Arc<dyn Transport>,
        network: NetworkMonitor,
    ) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                retry: RetryPolicy::from_config(&config),
                config,
                transport,
                network,
                next_id: AtomicU64::new(1),
                state: Mutex::new(SchedulerState::default()),
            }),
        }
    }

    // == Lifecycle ==
    /// Starts the connectivity watcher. Also done lazily by the first request.
    pub fn init(&self) {
        let mut state = self.inner.state.lock();
        state.closed = false;
        self.inner.init_locked(&mut state);
    }

    /// Stops all timers and rejects every queued and parked call with
    /// [`RequestError::Shutdown`]. Attempts already on the wire finish on
    /// their own. Further requests fail until `init()` is called again.
    pub fn destroy(&self) {
        let (queued, parked) = {
            let mut state = self.inner.state.lock();
            if let Some(handle) = state.watcher.take() {
                handle.abort();
            }
            if let Some(handle) = state.batch_timer.take() {
                handle.abort();
            }
            state.initialized = false;
            state.closed = true;
            (mem::take(&mut state.queue), mem::take(&mut state.parked))
        };

        info!(
            "Scheduler destroyed: rejecting {} queued and {} parked requests",
            queued.len(),
            parked.len()
        );
        for queued in queued {
            let _ = queued.responder.send(Err(RequestError::Shutdown));
        }
        for parked in parked {
            let _ = parked.responder.send(Err(RequestError::Shutdown));
        }
    }

    // == Request ==
    /// Submits a call and decodes its JSON response into `T`.
    pub async fn request<T: DeserializeOwned>(&self, config: RequestConfig) -> Result<T, RequestError> {
        let value = self.request_value(config).await?;
        serde_json::from_value(value).map_err(|e| RequestError::Decode(e.to_string()))
    }

    /// Submits a call and returns its raw JSON response.
    pub async fn request_value(&self, config: RequestConfig) -> Result<Value, RequestError> {
        let inner = &self.inner;
        let id = inner.next_id.fetch_add(1, Ordering::SeqCst);
        let request = PreparedRequest::resolve(
            id,
            config,
            inner.config.base_url.as_deref(),
            inner.config.max_retries,
            inner.config.request_timeout,
        )?;

        {
            let mut state = inner.state.lock();
            if state.closed {
                return Err(RequestError::Shutdown);
            }
            inner.init_locked(&mut state);
            state.stats.submitted += 1;
        }

        if !inner.network.is_online() {
            return inner.park(request).await;
        }

        if request.priority == Priority::High {
            inner.state.lock().stats.executed_inline += 1;
            return inner.execute_with_retry(&request).await;
        }

        inner.enqueue(request).await
    }

    /// Rejects every call waiting for a batch cycle with
    /// [`RequestError::Aborted`]. Returns how many were dropped.
    pub fn clear_queue(&self) -> usize {
        let queued = {
            let mut state = self.inner.state.lock();
            if let Some(handle) = state.batch_timer.take() {
                handle.abort();
            }
            mem::take(&mut state.queue)
        };
        let count = queued.len();
        for queued in queued {
            let _ = queued.responder.send(Err(RequestError::Aborted));
        }
        count
    }

    // == Connectivity ==
    pub fn network(&self) -> &NetworkMonitor {
        &self.inner.network
    }

    pub fn is_online(&self) -> bool {
        self.inner.network.is_online()
    }

    pub fn connection_quality(&self) -> ConnectionQuality {
        self.inner.network.quality()
    }

    /// Whether optional work such as preloading is worth doing: only on a
    /// fast, online connection.
    pub fn allows_optional_work(&self) -> bool {
        let status = self.inner.network.status();
        status.online && status.quality == ConnectionQuality::Fast
    }

    // == Stats ==
    pub fn stats(&self) -> SchedulerStats {
        let state = self.inner.state.lock();
        let mut stats = state.stats.clone();
        stats.queue_length = state.queue.len();
        stats.parked_length = state.parked.len();
        let status = self.inner.network.status();
        stats.online = status.online;
        stats.quality = status.quality;
        stats
    }
}

impl SchedulerInner {
    fn init_locked(self: &Arc<Self>, state: &mut SchedulerState) {
        if state.initialized {
            return;
        }
        state.initialized = true;
        state.watcher = Some(spawn_connectivity_watcher(
            Arc::downgrade(self),
            self.network.subscribe(),
        ));
        debug!("Scheduler initialized");
    }

    // == Execution ==
    /// Runs attempts until success, a permanent error, or retries run out.
    async fn execute_with_retry(&self, request: &PreparedRequest) -> Result<Value, RequestError> {
        self.retry_from(request, 0).await
    }

    /// Continues the retry loop at `attempt`, for calls whose earlier
    /// attempts already went out some other way.
    async fn retry_from(
        &self,
        request: &PreparedRequest,
        mut attempt: u32,
    ) -> Result<Value, RequestError> {
        loop {
            self.state.lock().stats.attempts += 1;

            let outcome = match timeout(request.timeout, self.transport.send(request)).await {
                Ok(result) => result,
                Err(_) => Err(RequestError::Timeout(request.timeout)),
            };

            match outcome {
                Ok(value) => {
                    self.state.lock().stats.succeeded += 1;
                    return Ok(value);
                }
                Err(err) if err.is_retryable() && attempt < request.max_retries => {
                    let delay = self.retry.delay_for(attempt);
                    debug!(
                        "{} {} failed on attempt {}: {}; retrying in {:?}",
                        request.method,
                        request.url,
                        attempt + 1,
                        err,
                        delay
                    );
                    self.state.lock().stats.retries += 1;
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    warn!(
                        "{} {} failed after {} attempts: {}",
                        request.method,
                        request.url,
                        attempt + 1,
                        err
                    );
                    self.state.lock().stats.failed += 1;
                    return Err(err);
                }
            }
        }
    }

    // == Batching ==
    async fn enqueue(self: &Arc<Self>, request: PreparedRequest) -> Result<Value, RequestError> {
        let (tx, rx) = oneshot::channel();
        {
            let mut state = self.state.lock();
            state.queue.push(QueuedRequest {
                request,
                responder: tx,
                enqueued_at: Instant::now(),
            });
            state.stats.queued += 1;
            if state.batch_timer.is_none() {
                state.batch_timer = Some(self.spawn_batch_timer());
            }
        }
        rx.await.unwrap_or(Err(RequestError::Shutdown))
    }

    fn spawn_batch_timer(self: &Arc<Self>) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        let delay = self.config.batch_delay;
        tokio::spawn(async move {
            sleep(delay).await;
            if let Some(inner) = weak.upgrade() {
                inner.run_batch_cycle().await;
            }
        })
    }

    /// Takes the best `batch_size` queued calls and executes them.
    async fn run_batch_cycle(self: &Arc<Self>) {
        let batch: Vec<QueuedRequest> = {
            let mut state = self.state.lock();
            state.batch_timer = None;

            state.queue.sort_by(|a, b| {
                b.request
                    .priority
                    .cmp(&a.request.priority)
                    .then(a.request.id.cmp(&b.request.id))
            });
            let take = state.queue.len().min(self.config.batch_size.max(1));
            let batch: Vec<QueuedRequest> = state.queue.drain(..take).collect();

            if !state.queue.is_empty() {
                state.batch_timer = Some(self.spawn_batch_timer());
            }
            if !batch.is_empty() {
                state.stats.batches += 1;
            }
            batch
        };

        if batch.is_empty() {
            return;
        }

        let oldest_wait = batch
            .iter()
            .map(|queued| queued.enqueued_at.elapsed())
            .max()
            .unwrap_or_default();
        debug!(
            "Executing batch of {} requests (oldest waited {:?})",
            batch.len(),
            oldest_wait
        );

        if self.config.batch_endpoint {
            let groups = group_by_origin(batch, |queued| queued.request.origin());
            join_all(
                groups
                    .into_iter()
                    .map(|(origin, members)| self.execute_group(origin, members)),
            )
            .await;
        } else {
            self.execute_individually(batch).await;
        }
    }

    /// Tries `{origin}/batch` for the group, falling back to individual calls.
    async fn execute_group(&self, origin: String, members: Vec<QueuedRequest>) {
        if members.len() < 2 {
            return self.execute_individually(members).await;
        }

        let envelope = BatchEnvelope::from_requests(members.iter().map(|queued| &queued.request));
        let window = members
            .iter()
            .map(|queued| queued.request.timeout)
            .max()
            .unwrap_or(self.config.request_timeout);

        let outcome = match timeout(window, self.transport.send_batch(&origin, &envelope)).await {
            Ok(Ok(reply)) if reply.results.len() == members.len() => Ok(reply),
            Ok(Ok(reply)) => Err(RequestError::Decode(format!(
                "batch returned {} results for {} requests",
                reply.results.len(),
                members.len()
            ))),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(RequestError::Timeout(window)),
        };

        match outcome {
            Ok(reply) => {
                let mut retry = Vec::new();
                {
                    let mut state = self.state.lock();
                    state.stats.batch_endpoint_hits += 1;
                    state.stats.attempts += members.len() as u64;
                    for (queued, result) in members.into_iter().zip(reply.results) {
                        match result.into_result() {
                            Err(err) if err.is_retryable() && queued.request.max_retries > 0 => {
                                state.stats.retries += 1;
                                retry.push((queued, err));
                            }
                            result => {
                                if result.is_ok() {
                                    state.stats.succeeded += 1;
                                } else {
                                    state.stats.failed += 1;
                                }
                                let _ = queued.responder.send(result);
                            }
                        }
                    }
                }
                if retry.is_empty() {
                    return;
                }

                // The batch round trip was attempt 0 for these members
                let delay = self.retry.delay_for(0);
                debug!(
                    "Batch at {} returned {} retryable failures; retrying individually in {:?}",
                    origin,
                    retry.len(),
                    delay
                );
                sleep(delay).await;
                join_all(retry.into_iter().map(|(queued, err)| async move {
                    debug!("Retrying batched request {} after: {}", queued.request.id, err);
                    let result = self.retry_from(&queued.request, 1).await;
                    let _ = queued.responder.send(result);
                }))
                .await;
            }
            Err(err) => {
                warn!(
                    "Batch endpoint at {} failed ({}), falling back to {} individual requests",
                    origin,
                    err,
                    members.len()
                );
                self.state.lock().stats.batch_fallbacks += 1;
                self.execute_individually(members).await;
            }
        }
    }

    /// Executes every member concurrently; one failure never affects the others.
    async fn execute_individually(&self, members: Vec<QueuedRequest>) {
        join_all(members.into_iter().map(|queued| async move {
            let result = self.execute_with_retry(&queued.request).await;
            let _ = queued.responder.send(result);
        }))
        .await;
    }

    // == Offline Handling ==
    async fn park(self: &Arc<Self>, request: PreparedRequest) -> Result<Value, RequestError> {
        let id = request.id;
        let (tx, mut rx) = oneshot::channel();
        {
            let mut state = self.state.lock();
            state.parked.push(ParkedRequest {
                request,
                responder: tx,
            });
            state.stats.parked += 1;
        }
        debug!("Offline: parked request {}", id);

        // Connectivity may have returned between the check and parking
        if self.network.is_online() {
            self.replay_parked();
        }

        let window = self.config.offline_timeout;
        match timeout(window, &mut rx).await {
            Ok(result) => result.unwrap_or(Err(RequestError::Shutdown)),
            Err(_) => {
                let still_parked = {
                    let mut state = self.state.lock();
                    match state.parked.iter().position(|p| p.request.id == id) {
                        Some(pos) => {
                            state.parked.remove(pos);
                            state.stats.offline_timeouts += 1;
                            state.stats.failed += 1;
                            true
                        }
                        None => false,
                    }
                };

                if still_parked {
                    warn!("Request {} gave up after {:?} offline", id, window);
                    Err(RequestError::Offline(window))
                } else {
                    // Replay already started, let it finish
                    rx.await.unwrap_or(Err(RequestError::Shutdown))
                }
            }
        }
    }

    /// Replays all parked calls in submission order.
    fn replay_parked(self: &Arc<Self>) {
        let parked = {
            let mut state = self.state.lock();
            let parked = mem::take(&mut state.parked);
            state.stats.replayed += parked.len() as u64;
            parked
        };
        if parked.is_empty() {
            return;
        }

        info!("Connectivity restored: replaying {} parked requests", parked.len());
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            let inner = &inner;
            join_all(parked.into_iter().map(|parked| async move {
                let result = inner.execute_with_retry(&parked.request).await;
                let _ = parked.responder.send(result);
            }))
            .await;
        });
    }
}

/// Replays parked calls whenever the network comes back online.
fn spawn_connectivity_watcher(
    weak: Weak<SchedulerInner>,
    mut rx: watch::Receiver<NetworkStatus>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let online = rx.borrow_and_update().online;
            let Some(inner) = weak.upgrade() else {
                break;
            };
            if online {
                inner.replay_parked();
            }
        }
    })
}
