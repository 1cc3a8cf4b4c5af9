//! The running HITL client: one driver task owning all request state.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::api::BackendClient;
use crate::config::Config;
use crate::errors::ClientError;
use crate::hitl::dispatch::{Effect, HitlEvent, HitlState};
use crate::hitl::submit;
use crate::models::hitl::{CallInfo, TaskId};
use crate::notification::banner::BannerBoard;
use crate::notification::Presenter;
use crate::transport::{self, Transport};

const EVENT_BUFFER: usize = 256;
const CLOSE_BUFFER: usize = 16;

/// Read-only view of one pending request, published after every event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSummary {
    pub task_id: TaskId,
    pub question: String,
    pub call_info: CallInfo,
    pub remaining: u64,
    pub modal: bool,
}

/// Cloneable entry point for operator actions on a running client.
#[derive(Clone)]
pub struct HitlHandle {
    events: mpsc::Sender<HitlEvent>,
    closes: mpsc::Sender<u64>,
    snapshot: watch::Receiver<Vec<PendingSummary>>,
}

impl HitlHandle {
    async fn send(&self, event: HitlEvent) -> Result<(), ClientError> {
        self.events
            .send(event)
            .await
            .map_err(|_| ClientError::Internal(anyhow::anyhow!("hitl client is not running")))
    }

    /// Queue an answer. Validation, the in-flight guard and the result
    /// banner are handled by the driver.
    pub async fn submit(&self, task_id: TaskId, text: impl Into<String>) -> Result<(), ClientError> {
        self.send(HitlEvent::SubmitRequested {
            task_id,
            text: text.into(),
        })
        .await
    }

    /// Answer whichever request is currently modal. Returns the task id
    /// answered, or `None` when nothing is pending.
    pub async fn answer_modal(&self, text: impl Into<String>) -> Result<Option<TaskId>, ClientError> {
        let Some(task_id) = self.modal() else {
            return Ok(None);
        };
        self.submit(task_id.clone(), text).await?;
        Ok(Some(task_id))
    }

    pub async fn dismiss(&self, task_id: TaskId) -> Result<(), ClientError> {
        self.send(HitlEvent::Dismissed(task_id)).await
    }

    /// Close a banner by id. Unknown or already removed ids are ignored.
    pub async fn close_banner(&self, banner_id: u64) -> Result<(), ClientError> {
        self.closes
            .send(banner_id)
            .await
            .map_err(|_| ClientError::Internal(anyhow::anyhow!("hitl client is not running")))
    }

    pub fn pending(&self) -> Vec<PendingSummary> {
        self.snapshot.borrow().clone()
    }

    pub fn modal(&self) -> Option<TaskId> {
        self.snapshot
            .borrow()
            .iter()
            .find(|p| p.modal)
            .map(|p| p.task_id.clone())
    }

    /// Resolves when the published pending set next changes.
    pub async fn changed(&mut self) -> Result<(), ClientError> {
        self.snapshot
            .changed()
            .await
            .map_err(|_| ClientError::Internal(anyhow::anyhow!("hitl client stopped")))
    }
}

struct Running {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
    handle: HitlHandle,
}

pub struct HitlClient {
    backend: BackendClient,
    transport: Arc<dyn Transport>,
    presenter: Arc<dyn Presenter>,
    banner_ttl: Duration,
    retention: Duration,
    running: Option<Running>,
}

impl HitlClient {
    pub fn new(
        config: &Config,
        backend: BackendClient,
        transport: Arc<dyn Transport>,
        presenter: Arc<dyn Presenter>,
    ) -> Self {
        Self {
            backend,
            transport,
            presenter,
            banner_ttl: config.banner_ttl(),
            retention: config.resolved_retention(),
            running: None,
        }
    }

    /// Wire up the backend client and the transport named in `config`.
    pub fn from_config(config: &Config, presenter: Arc<dyn Presenter>) -> Result<Self, ClientError> {
        let backend = BackendClient::new(config);
        let transport = transport::from_config(config, backend.clone())?;
        Ok(Self::new(config, backend, transport, presenter))
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Spawn the driver and the transport. Calling `start` on a running
    /// client returns the existing handle.
    pub fn start(&mut self) -> HitlHandle {
        if let Some(running) = &self.running {
            return running.handle.clone();
        }

        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        let (closes_tx, closes_rx) = mpsc::channel(CLOSE_BUFFER);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (snapshot_tx, snapshot_rx) = watch::channel(Vec::new());

        let driver = Driver {
            state: HitlState::new(self.transport.expiry_notice(), self.retention),
            banners: BannerBoard::new(self.banner_ttl),
            presenter: self.presenter.clone(),
            backend: self.backend.clone(),
            events_tx: events_tx.clone(),
            snapshot: snapshot_tx,
        };
        let driver_task = tokio::spawn(driver.run(events_rx, closes_rx, shutdown_rx.clone()));

        let transport = self.transport.clone();
        let transport_events = events_tx.clone();
        let transport_task = tokio::spawn(async move {
            transport.run(transport_events, shutdown_rx).await;
        });

        info!(
            transport = ?self.transport.kind(),
            username = %self.backend.username(),
            "hitl client started"
        );

        let handle = HitlHandle {
            events: events_tx,
            closes: closes_tx,
            snapshot: snapshot_rx,
        };
        self.running = Some(Running {
            shutdown: shutdown_tx,
            tasks: vec![driver_task, transport_task],
            handle: handle.clone(),
        });
        handle
    }

    /// Stop transport, ticker and driver, and wait for them to finish.
    /// All pending prompts are dropped with the driver's state.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };
        let _ = running.shutdown.send(true);
        for task in running.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "hitl client task ended abnormally");
            }
        }
        info!("hitl client stopped");
    }
}

struct Driver {
    state: HitlState,
    banners: BannerBoard,
    presenter: Arc<dyn Presenter>,
    backend: BackendClient,
    events_tx: mpsc::Sender<HitlEvent>,
    snapshot: watch::Sender<Vec<PendingSummary>>,
}

impl Driver {
    async fn run(
        mut self,
        mut events: mpsc::Receiver<HitlEvent>,
        mut closes: mpsc::Receiver<u64>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut ticker = time::interval(Duration::from_secs(1));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let event = tokio::select! {
                Some(event) = events.recv() => event,
                Some(id) = closes.recv() => {
                    if self.banners.dismiss(id) {
                        self.presenter.banner_removed(id);
                    }
                    continue;
                }
                _ = ticker.tick() => HitlEvent::TimeoutTick,
                _ = shutdown.changed() => break,
            };
            let now = Instant::now();

            if event == HitlEvent::TimeoutTick {
                for id in self.banners.expire(now) {
                    self.presenter.banner_removed(id);
                }
            }

            let effects = self.state.apply(event, now);
            self.execute(effects, now);
            self.publish(now);
        }

        let effects = self.state.reset();
        self.execute(effects, Instant::now());
        self.publish(Instant::now());
        debug!("hitl driver exited");
    }

    fn execute(&mut self, effects: Vec<Effect>, now: Instant) {
        for effect in effects {
            match effect {
                Effect::Notify(notice) => {
                    let banner = self.banners.post(notice, now);
                    self.presenter.banner_shown(&banner);
                }
                Effect::SendResponse { task_id, text } => {
                    let backend = self.backend.clone();
                    let events = self.events_tx.clone();
                    tokio::spawn(async move {
                        let outcome = submit::submit(&backend, &task_id, &text).await;
                        let _ = events
                            .send(HitlEvent::SubmitResult { task_id, outcome })
                            .await;
                    });
                }
                removal @ Effect::RemovePrompt { .. } => {
                    self.presenter.render(&removal);
                    if let Effect::RemovePrompt { task_id, .. } = &removal {
                        // The request's urgent banner goes with its prompt.
                        for id in self.banners.dismiss_about(task_id) {
                            self.presenter.banner_removed(id);
                        }
                    }
                }
                other => self.presenter.render(&other),
            }
        }
    }

    fn publish(&self, now: Instant) {
        let modal = self.state.modal().cloned();
        let pending: Vec<PendingSummary> = self
            .state
            .registry()
            .pending()
            .into_iter()
            .map(|t| PendingSummary {
                task_id: t.task_id().clone(),
                question: t.request.question.clone(),
                call_info: t.request.call_info.clone(),
                remaining: t.countdown.remaining_at(now),
                modal: modal.as_ref() == Some(t.task_id()),
            })
            .collect();
        self.snapshot.send_if_modified(|current| {
            if *current == pending {
                false
            } else {
                *current = pending;
                true
            }
        });
    }
}
