use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use super::Transport;
use crate::config::TransportKind;
use crate::errors::ClientError;
use crate::hitl::dispatch::{HitlEvent, LinkStatus};
use crate::models::hitl::PushMessage;

/// Build `ws(s)://<host>/ws/hitl/<username>` from the backend origin.
pub fn hitl_ws_url(origin: &str, username: &str) -> Result<String, ClientError> {
    let base = origin.trim_end_matches('/');
    let ws_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else if base.starts_with("ws://") || base.starts_with("wss://") {
        base.to_string()
    } else {
        return Err(ClientError::InvalidConfig(format!(
            "base url '{}' must start with http://, https://, ws:// or wss://",
            origin
        )));
    };

    let url = format!("{}/ws/hitl/{}", ws_base, urlencoding::encode(username));
    url::Url::parse(&url)
        .map_err(|e| ClientError::InvalidConfig(format!("invalid push url '{}': {}", url, e)))?;
    Ok(url)
}

/// Persistent WebSocket subscription with fixed-delay reconnects.
pub struct PushTransport {
    url: String,
    reconnect_delay: Duration,
}

impl PushTransport {
    pub fn new(url: String, reconnect_delay: Duration) -> Self {
        Self {
            url,
            reconnect_delay,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// One connection lifetime. `Ok` means the server closed the channel
    /// cleanly (or the driver went away); `Err` is a connect or read error.
    async fn session(&self, events: &mpsc::Sender<HitlEvent>) -> Result<(), ClientError> {
        let (mut ws, _resp) = connect_async(self.url.as_str()).await?;
        info!(url = %self.url, "push channel connected");
        if events
            .send(HitlEvent::LinkStatus(LinkStatus::Connected))
            .await
            .is_err()
        {
            return Ok(());
        }

        while let Some(frame) = ws.next().await {
            let text = match frame? {
                Message::Text(text) => text,
                Message::Close(reason) => {
                    debug!(?reason, "push channel closed by server");
                    break;
                }
                _ => continue,
            };

            let event = match serde_json::from_str::<PushMessage>(&text) {
                Ok(PushMessage::HitlRequest(request)) => HitlEvent::RequestObserved(request),
                Ok(PushMessage::HitlTimeout { task_id }) => HitlEvent::ServerTimeout(task_id),
                Ok(PushMessage::Unknown) => {
                    debug!(payload = %text, "ignoring push message of unknown type");
                    continue;
                }
                Err(e) => {
                    warn!(error = %e, "malformed push message");
                    continue;
                }
            };
            if events.send(event).await.is_err() {
                return Ok(());
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for PushTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Push
    }

    async fn run(&self, events: mpsc::Sender<HitlEvent>, mut shutdown: watch::Receiver<bool>) {
        let mut attempt: u64 = 0;
        loop {
            attempt += 1;
            let ended = tokio::select! {
                r = self.session(&events) => r,
                _ = shutdown.changed() => break,
            };
            if events.is_closed() {
                break;
            }

            let status = match ended {
                Ok(()) => {
                    warn!(url = %self.url, "push channel disconnected");
                    LinkStatus::Disconnected
                }
                Err(e) => {
                    warn!(url = %self.url, attempt, error = %e, "push channel error");
                    LinkStatus::Error(e.to_string())
                }
            };
            if events.send(HitlEvent::LinkStatus(status)).await.is_err() {
                break;
            }

            debug!(
                delay_ms = self.reconnect_delay.as_millis() as u64,
                "reconnecting push channel"
            );
            tokio::select! {
                _ = tokio::time::sleep(self.reconnect_delay) => {}
                _ = shutdown.changed() => break,
            }
        }
        info!(url = %self.url, "push channel stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ws_url_from_http_origin() {
        assert_eq!(
            hitl_ws_url("http://127.0.0.1:8000/", "APPU").unwrap(),
            "ws://127.0.0.1:8000/ws/hitl/APPU"
        );
    }

    #[test]
    fn test_ws_url_from_https_origin_encodes_username() {
        assert_eq!(
            hitl_ws_url("https://calls.example.com", "ops team").unwrap(),
            "wss://calls.example.com/ws/hitl/ops%20team"
        );
    }

    #[test]
    fn test_ws_url_rejects_other_schemes() {
        assert!(matches!(
            hitl_ws_url("ftp://host", "APPU"),
            Err(ClientError::InvalidConfig(_))
        ));
    }
}
