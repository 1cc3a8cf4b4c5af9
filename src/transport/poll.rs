use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tokio::time::{self, MissedTickBehavior};
use tracing::{info, warn};

use super::Transport;
use crate::api::BackendClient;
use crate::config::TransportKind;
use crate::hitl::dispatch::HitlEvent;

/// Periodic `GET /api/pending_hitl_requests`.
///
/// Every returned request is reported as an observation; the registry
/// deduplicates. A request missing from a later poll is not treated as
/// resolved. Failed polls are logged and skipped.
pub struct PollTransport {
    backend: BackendClient,
    interval: Duration,
}

impl PollTransport {
    pub fn new(backend: BackendClient, interval: Duration) -> Self {
        Self { backend, interval }
    }
}

#[async_trait]
impl Transport for PollTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Poll
    }

    async fn run(&self, events: mpsc::Sender<HitlEvent>, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_ms = self.interval.as_millis() as u64,
            username = %self.backend.username(),
            "polling for hitl requests"
        );
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => break,
            }

            let requests = tokio::select! {
                r = self.backend.pending_requests() => r,
                _ = shutdown.changed() => break,
            };
            match requests {
                Ok(requests) => {
                    for request in requests {
                        if events.send(HitlEvent::RequestObserved(request)).await.is_err() {
                            return;
                        }
                    }
                }
                Err(e) => warn!(error = %e, transient = e.is_transient(), "hitl poll failed"),
            }
        }
        info!("hitl polling stopped");
    }
}
