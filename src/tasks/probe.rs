//! Connectivity Probe Task
//!
//! Background task that feeds the network monitor from periodic GETs to a
//! probe URL.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::MIN_INTERVAL;
use crate::error::RequestError;
use crate::scheduler::{
    ConnectionQuality, NetworkMonitor, NetworkStatus, PreparedRequest, RequestConfig, Transport,
};

/// Spawns the probe loop. Each round trip is classified by
/// [`probe_once`] and reported to `network`.
///
/// # Arguments
/// * `transport` - Transport used for the probe requests
/// * `network` - Monitor that receives the measured status
/// * `url` - Absolute probe URL
/// * `interval` - Time between probes
/// * `slow_threshold` - Latency above which the connection counts as slow
pub fn spawn_connectivity_probe(
    transport: Arc<dyn Transport>,
    network: NetworkMonitor,
    url: String,
    interval: Duration,
    slow_threshold: Duration,
) -> JoinHandle<()> {
    let interval = interval.max(MIN_INTERVAL);
    tokio::spawn(async move {
        // A probe slower than twice the threshold counts as unreachable
        let timeout = slow_threshold.saturating_mul(2).max(Duration::from_millis(1));
        let request = match PreparedRequest::resolve(0, RequestConfig::get(&url), None, 0, timeout) {
            Ok(request) => request,
            Err(e) => {
                warn!("Connectivity probe disabled: {}", e);
                return;
            }
        };

        info!("Starting connectivity probe of {} every {:?}", url, interval);

        loop {
            let status = probe_once(transport.as_ref(), &request, slow_threshold).await;
            debug!("Connectivity probe: {:?}", status);
            match status.quality {
                ConnectionQuality::Offline => network.set_online(false),
                quality => network.set_quality(quality),
            }

            tokio::time::sleep(interval).await;
        }
    })
}

/// Sends one probe. Any answer from the server, error statuses included,
/// means the network is up; only timeouts and connection failures mean
/// offline.
pub async fn probe_once(
    transport: &dyn Transport,
    request: &PreparedRequest,
    slow_threshold: Duration,
) -> NetworkStatus {
    let started = Instant::now();
    let outcome = tokio::time::timeout(request.timeout, transport.send(request)).await;
    let latency = started.elapsed();

    match outcome {
        Ok(Ok(_)) | Ok(Err(RequestError::Status { .. })) => NetworkStatus {
            online: true,
            quality: ConnectionQuality::from_latency(latency, slow_threshold),
        },
        Ok(Err(_)) | Err(_) => NetworkStatus::offline(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::mock::ScriptedTransport;

    fn probe_request(timeout: Duration) -> PreparedRequest {
        PreparedRequest::resolve(0, RequestConfig::get("http://probe.test/ping"), None, 0, timeout)
            .unwrap()
    }

    #[tokio::test]
    async fn test_fast_answer_is_online() {
        let transport = ScriptedTransport::new();
        let status = probe_once(
            &transport,
            &probe_request(Duration::from_secs(1)),
            Duration::from_millis(500),
        )
        .await;
        assert_eq!(status, NetworkStatus::online());
    }

    #[tokio::test]
    async fn test_error_status_still_counts_as_online() {
        let transport = ScriptedTransport::new();
        transport.push_response(
            "/ping",
            Err(RequestError::Status {
                status: 503,
                body: String::new(),
            }),
        );
        let status = probe_once(
            &transport,
            &probe_request(Duration::from_secs(1)),
            Duration::from_millis(500),
        )
        .await;
        assert!(status.online);
    }

    #[tokio::test]
    async fn test_slow_answer_is_slow() {
        let transport = ScriptedTransport::new().with_delay(Duration::from_millis(30));
        let status = probe_once(
            &transport,
            &probe_request(Duration::from_secs(1)),
            Duration::from_millis(5),
        )
        .await;
        assert_eq!(status.quality, ConnectionQuality::Slow);
    }

    #[tokio::test]
    async fn test_connection_failure_is_offline() {
        let transport = ScriptedTransport::new();
        transport.push_response("/ping", Err(RequestError::Connection("refused".into())));
        let status = probe_once(
            &transport,
            &probe_request(Duration::from_secs(1)),
            Duration::from_millis(500),
        )
        .await;
        assert_eq!(status, NetworkStatus::offline());
    }

    #[tokio::test]
    async fn test_probe_task_reports_to_monitor() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_response("/ping", Err(RequestError::Connection("down".into())));
        let network = NetworkMonitor::default();

        let handle = spawn_connectivity_probe(
            transport,
            network.clone(),
            "http://probe.test/ping".to_string(),
            Duration::from_millis(20),
            Duration::from_millis(500),
        );

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!network.is_online());

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(network.is_online());

        handle.abort();
    }
}
