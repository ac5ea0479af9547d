//! Network Monitor
//!
//! Holds the environment's connectivity signal: online/offline plus a coarse
//! connection quality. Hosts feed it; the scheduler and callers observe it.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::info;

// == Connection Quality ==
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionQuality {
    #[default]
    Fast,
    Slow,
    Offline,
}

impl ConnectionQuality {
    /// Classifies a measured round trip.
    pub fn from_latency(latency: Duration, slow_threshold: Duration) -> Self {
        if latency > slow_threshold {
            ConnectionQuality::Slow
        } else {
            ConnectionQuality::Fast
        }
    }
}

// == Network Status ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkStatus {
    pub online: bool,
    pub quality: ConnectionQuality,
}

impl NetworkStatus {
    pub fn online() -> Self {
        Self {
            online: true,
            quality: ConnectionQuality::Fast,
        }
    }

    pub fn offline() -> Self {
        Self {
            online: false,
            quality: ConnectionQuality::Offline,
        }
    }
}

// == Network Monitor ==
/// Shared, observable connectivity state. Clones share the same signal.
#[derive(Debug, Clone)]
pub struct NetworkMonitor {
    tx: Arc<watch::Sender<NetworkStatus>>,
}

impl NetworkMonitor {
    pub fn new(initial: NetworkStatus) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    pub fn status(&self) -> NetworkStatus {
        *self.tx.borrow()
    }

    pub fn is_online(&self) -> bool {
        self.status().online
    }

    pub fn quality(&self) -> ConnectionQuality {
        self.status().quality
    }

    /// Receiver notified on every status change.
    pub fn subscribe(&self) -> watch::Receiver<NetworkStatus> {
        self.tx.subscribe()
    }

    /// Reports connectivity. Going online from `Offline` quality assumes `Fast`
    /// until a measurement says otherwise.
    pub fn set_online(&self, online: bool) {
        self.update(|status| {
            status.online = online;
            if !online {
                status.quality = ConnectionQuality::Offline;
            } else if status.quality == ConnectionQuality::Offline {
                status.quality = ConnectionQuality::Fast;
            }
        });
    }

    /// Reports connection quality. `Offline` also marks the network offline;
    /// any other quality marks it online.
    pub fn set_quality(&self, quality: ConnectionQuality) {
        self.update(|status| {
            status.quality = quality;
            status.online = quality != ConnectionQuality::Offline;
        });
    }

    fn update<F: FnOnce(&mut NetworkStatus)>(&self, apply: F) {
        let changed = self.tx.send_if_modified(|status| {
            let before = *status;
            apply(status);
            before != *status
        });
        if changed {
            let status = self.status();
            info!(
                "Network status changed: online={}, quality={:?}",
                status.online, status.quality
            );
        }
    }
}

impl Default for NetworkMonitor {
    fn default() -> Self {
        Self::new(NetworkStatus::online())
    }
}
