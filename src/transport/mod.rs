//! Ways HITL requests reach the client.
//!
//! A transport only produces [`HitlEvent`]s (`RequestObserved`,
//! `ServerTimeout`, `LinkStatus`). It never touches request state; the
//! driver task owns that.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

use crate::api::BackendClient;
use crate::config::{Config, TransportKind};
use crate::errors::ClientError;
use crate::hitl::dispatch::{ExpiryNotice, HitlEvent};

pub mod poll;
pub mod push;

pub use poll::PollTransport;
pub use push::PushTransport;

#[async_trait]
pub trait Transport: Send + Sync {
    fn kind(&self) -> TransportKind;

    /// How a local countdown expiry should be announced with this
    /// transport. Only the push channel carries a server-side timeout.
    fn expiry_notice(&self) -> ExpiryNotice {
        match self.kind() {
            TransportKind::Push => ExpiryNotice::AwaitServer,
            TransportKind::Poll => ExpiryNotice::Immediate,
        }
    }

    /// Deliver events until `shutdown` flips or the receiver goes away.
    async fn run(&self, events: mpsc::Sender<HitlEvent>, shutdown: watch::Receiver<bool>);
}

/// Build the transport selected in `config`.
pub fn from_config(
    config: &Config,
    backend: BackendClient,
) -> Result<Arc<dyn Transport>, ClientError> {
    Ok(match config.transport {
        TransportKind::Poll => Arc::new(PollTransport::new(backend, config.poll_interval())),
        TransportKind::Push => Arc::new(PushTransport::new(
            push::hitl_ws_url(config.origin(), &config.username)?,
            config.reconnect_delay(),
        )),
    })
}
