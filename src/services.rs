//! Runtime Services
//!
//! Composition root: builds the cache, scheduler, worker pool and network
//! monitor from one [`Config`] and owns their lifecycle.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::BoundedCache;
use crate::config::Config;
use crate::error::RequestError;
use crate::pool::WorkerPool;
use crate::scheduler::{HttpTransport, NetworkMonitor, RequestConfig, RequestScheduler, Transport};
use crate::tasks::spawn_connectivity_probe;

pub struct RuntimeServices {
    config: Config,
    cache: BoundedCache<Value>,
    scheduler: RequestScheduler,
    pool: WorkerPool,
    network: NetworkMonitor,
    transport: Arc<dyn Transport>,
    probe: Mutex<Option<JoinHandle<()>>>,
}

impl RuntimeServices {
    /// Builds the services with an HTTP transport.
    pub fn from_config(config: Config) -> Self {
        Self::with_transport(config, Arc::new(HttpTransport::new()))
    }

    pub fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Self {
        let network = NetworkMonitor::default();
        let cache = BoundedCache::new(&config.cache);
        let scheduler =
            RequestScheduler::new(config.scheduler.clone(), Arc::clone(&transport), network.clone());
        let pool = WorkerPool::new(config.pool.clone());

        Self {
            config,
            cache,
            scheduler,
            pool,
            network,
            transport,
            probe: Mutex::new(None),
        }
    }

    // == Lifecycle ==
    /// Starts the cache sweep, the scheduler's connectivity watcher and the
    /// probe if one is configured. Workers still start on the first task.
    pub fn init(&self) {
        self.cache.init();
        self.scheduler.init();

        let scheduler = &self.config.scheduler;
        if let Some(url) = &scheduler.probe_url {
            let mut probe = self.probe.lock();
            if probe.is_none() {
                *probe = Some(spawn_connectivity_probe(
                    Arc::clone(&self.transport),
                    self.network.clone(),
                    url.clone(),
                    scheduler.probe_interval,
                    scheduler.slow_threshold,
                ));
            }
        }
        info!("Runtime services initialized");
    }

    /// Stops every background task and rejects all pending work.
    pub fn destroy(&self) {
        if let Some(handle) = self.probe.lock().take() {
            handle.abort();
        }
        self.scheduler.destroy();
        self.pool.destroy();
        self.cache.destroy();
        info!("Runtime services destroyed");
    }

    // == Composition ==
    /// Read-through fetch: answers from the cache when possible, otherwise
    /// schedules the request and caches the response under `key`.
    ///
    /// Returns the value and whether it came from the cache.
    pub async fn fetch_cached(
        &self,
        key: &str,
        request: RequestConfig,
        ttl: Option<Duration>,
    ) -> Result<(Value, bool), RequestError> {
        if let Some(value) = self.cache.get(key) {
            debug!("fetch_cached: hit for '{}'", key);
            return Ok((value, true));
        }

        let value = self.scheduler.request_value(request).await?;
        if !self.cache.set(key, value.clone(), ttl) {
            debug!("fetch_cached: response for '{}' too large to cache", key);
        }
        Ok((value, false))
    }

    // == Accessors ==
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cache(&self) -> &BoundedCache<Value> {
        &self.cache
    }

    pub fn scheduler(&self) -> &RequestScheduler {
        &self.scheduler
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub fn network(&self) -> &NetworkMonitor {
        &self.network
    }
}
