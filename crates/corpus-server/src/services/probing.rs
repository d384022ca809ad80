//! ProbeService - periodic capability health checks
//!
//! The engine only probes on demand; this service supplies the cadence.
//! One background task calls `probe_all` on a fixed interval until stopped.

use corpus_core::Engine;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Handle for the running probe task
struct ProbeHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
    interval: Duration,
}

/// ProbeService owns at most one probe loop
pub struct ProbeService {
    engine: Arc<Engine>,
    active: Mutex<Option<ProbeHandle>>,
}

impl ProbeService {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self {
            engine,
            active: Mutex::new(None),
        }
    }

    /// Start probing every `every`; replaces a running loop
    pub async fn start(&self, every: Duration) {
        let mut active = self.active.lock().await;
        if let Some(previous) = active.take() {
            Self::shutdown(previous).await;
        }

        info!(interval_secs = every.as_secs(), "Starting capability probing");

        let cancel = CancellationToken::new();
        let engine = Arc::clone(&self.engine);
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let summary = engine.probe_all().await;
                        if summary.online < summary.total {
                            warn!(
                                online = summary.online,
                                total = summary.total,
                                "Some capabilities are not online"
                            );
                        }
                    }
                }
            }
            debug!("Capability probing loop exited");
        });

        *active = Some(ProbeHandle {
            cancel,
            task,
            interval: every,
        });
    }

    /// Stop the probe loop, waiting for an in-flight sweep to finish
    pub async fn stop(&self) {
        if let Some(handle) = self.active.lock().await.take() {
            Self::shutdown(handle).await;
        }
    }

    pub async fn is_active(&self) -> bool {
        self.active.lock().await.is_some()
    }

    /// Interval of the running loop, if any
    pub async fn interval(&self) -> Option<Duration> {
        self.active.lock().await.as_ref().map(|h| h.interval)
    }

    async fn shutdown(handle: ProbeHandle) {
        handle.cancel.cancel();
        if let Err(e) = handle.task.await {
            warn!(error = %e, "Probe task ended abnormally");
        }
        info!("Stopped capability probing");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corpus_core::config::TimeoutConfig;
    use corpus_core::types::CapabilityHealth;
    use corpus_core::EngineConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn engine_with_status_server() -> (MockServer, Arc<Engine>) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let config = EngineConfig::with_capabilities([("speech", server.uri())]).with_timeouts(
            TimeoutConfig {
                probe_ms: 500,
                ..Default::default()
            },
        );
        (server, Arc::new(Engine::new(config).unwrap()))
    }

    #[tokio::test]
    async fn test_probe_loop_updates_health() {
        let (server, engine) = engine_with_status_server().await;
        let service = ProbeService::new(Arc::clone(&engine));

        service.start(Duration::from_millis(50)).await;
        assert!(service.is_active().await);
        assert_eq!(service.interval().await, Some(Duration::from_millis(50)));

        tokio::time::sleep(Duration::from_millis(180)).await;
        service.stop().await;
        assert!(!service.is_active().await);

        let probes = server.received_requests().await.unwrap().len();
        assert!(probes >= 2, "expected repeated probes, got {}", probes);
        assert_eq!(
            engine.system_status().await.capabilities["speech"].health,
            CapabilityHealth::Online
        );

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(server.received_requests().await.unwrap().len(), probes);
    }

    #[tokio::test]
    async fn test_restart_replaces_loop() {
        let (_server, engine) = engine_with_status_server().await;
        let service = ProbeService::new(engine);

        service.start(Duration::from_secs(60)).await;
        service.start(Duration::from_secs(30)).await;
        assert_eq!(service.interval().await, Some(Duration::from_secs(30)));

        service.stop().await;
        service.stop().await;
        assert!(service.interval().await.is_none());
    }
}
