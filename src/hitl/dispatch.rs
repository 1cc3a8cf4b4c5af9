//! The HITL state machine.
//!
//! Every input the client reacts to (transport observations, the 1s tick,
//! server timeouts, operator actions, submission results) is a
//! [`HitlEvent`]. [`HitlState::apply`] folds one event into the registry
//! and returns the [`Effect`]s the driver must carry out. It performs no
//! I/O, which keeps the race policy in one place:
//!
//! - transitions are `pending → answered | timed_out | dismissed`;
//! - the first resolution wins; any later signal for the same task id is
//!   discarded and never re-shows a prompt.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::hitl::countdown::{Reading, Urgency};
use crate::hitl::registry::{HitlRegistry, Observation, Tracked};
use crate::models::hitl::{CallInfo, HitlRequest, HitlStatus, TaskId};
use crate::notification::banner::Notice;

pub const MSG_NEW_REQUEST: &str = "AI agent needs information during live call!";
pub const MSG_SERVER_TIMEOUT: &str = "HITL request timed out - call ended gracefully";
pub const MSG_LOCAL_TIMEOUT: &str = "HITL request timed out";
pub const MSG_ANSWERED: &str = "Response sent! Call continuing...";
pub const MSG_DISMISSED: &str = "Request dismissed - call will end and reschedule";
pub const MSG_EMPTY_RESPONSE: &str = "Please enter a response";
pub const MSG_SEND_FAILED: &str = "Failed to send response";
pub const MSG_ALREADY_SENDING: &str = "Response already being sent";
pub const MSG_NOT_PENDING: &str = "That request is no longer waiting for an answer";
pub const MSG_LINK_UP: &str = "Connected to real-time notifications";
pub const MSG_LINK_DOWN: &str = "Disconnected from real-time notifications";
pub const MSG_LINK_ERROR: &str = "Connection error - retrying...";

/// What the operator is told when a countdown runs out locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryNotice {
    /// Tear the prompt down silently; the server's `hitl_timeout` carries
    /// the notice. Used with the push transport.
    AwaitServer,
    /// No server signal will come; notify right away. Used with polling.
    Immediate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted,
    /// The backend answered `success: false` or a non-2xx status.
    Rejected(String),
    /// The request never got a usable answer.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkStatus {
    Connected,
    Disconnected,
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HitlEvent {
    RequestObserved(HitlRequest),
    TimeoutTick,
    ServerTimeout(TaskId),
    SubmitRequested { task_id: TaskId, text: String },
    SubmitResult { task_id: TaskId, outcome: SubmitOutcome },
    Dismissed(TaskId),
    LinkStatus(LinkStatus),
}

/// Everything the presenter needs to draw one prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptView {
    pub task_id: TaskId,
    pub question: String,
    pub call_info: CallInfo,
    pub remaining: u64,
    pub urgency: Urgency,
}

impl PromptView {
    fn of(tracked: &Tracked, reading: Reading) -> Self {
        Self {
            task_id: tracked.request.task_id.clone(),
            question: tracked.request.question.clone(),
            call_info: tracked.request.call_info.clone(),
            remaining: reading.remaining,
            urgency: reading.urgency,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    ShowPrompt(PromptView),
    RefreshPrompt(PromptView),
    Countdown { task_id: TaskId, reading: Reading },
    RemovePrompt { task_id: TaskId, status: HitlStatus },
    /// The request presented modally changed (first-observed pending one).
    ModalChanged(Option<TaskId>),
    /// The HITL surface should be shown (`true`) or hidden.
    SurfaceVisible(bool),
    FocusInput(TaskId),
    /// Send `text` to `POST /api/hitl_response`; the result comes back
    /// as [`HitlEvent::SubmitResult`].
    SendResponse { task_id: TaskId, text: String },
    Notify(Notice),
}

pub struct HitlState {
    registry: HitlRegistry,
    expiry: ExpiryNotice,
    modal: Option<TaskId>,
    surface_visible: bool,
}

impl HitlState {
    pub fn new(expiry: ExpiryNotice, retention: Duration) -> Self {
        Self {
            registry: HitlRegistry::new(retention),
            expiry,
            modal: None,
            surface_visible: false,
        }
    }

    pub fn registry(&self) -> &HitlRegistry {
        &self.registry
    }

    pub fn modal(&self) -> Option<&TaskId> {
        self.modal.as_ref()
    }

    pub fn apply(&mut self, event: HitlEvent, now: Instant) -> Vec<Effect> {
        let mut fx = Vec::new();
        match event {
            HitlEvent::RequestObserved(request) => self.on_observed(request, now, &mut fx),
            HitlEvent::TimeoutTick => self.on_tick(now, &mut fx),
            HitlEvent::ServerTimeout(task_id) => self.on_server_timeout(task_id, now, &mut fx),
            HitlEvent::SubmitRequested { task_id, text } => {
                self.on_submit_requested(task_id, text, &mut fx)
            }
            HitlEvent::SubmitResult { task_id, outcome } => {
                self.on_submit_result(task_id, outcome, now, &mut fx)
            }
            HitlEvent::Dismissed(task_id) => self.on_dismissed(task_id, now, &mut fx),
            HitlEvent::LinkStatus(status) => fx.push(Effect::Notify(match status {
                LinkStatus::Connected => Notice::success(MSG_LINK_UP),
                LinkStatus::Disconnected => Notice::warning(MSG_LINK_DOWN),
                LinkStatus::Error(_) => Notice::error(MSG_LINK_ERROR),
            })),
        }
        self.sync_surface(&mut fx);
        fx
    }

    fn on_observed(&mut self, request: HitlRequest, now: Instant, fx: &mut Vec<Effect>) {
        let task_id = request.task_id.clone();
        match self.registry.observe(request, now) {
            Observation::Inserted => {
                let Some(tracked) = self.registry.get_mut(&task_id) else {
                    return;
                };
                let reading = tracked.countdown.read(now);
                tracked.last_reading = Some(reading);
                info!(task_id = %task_id, timeout_secs = reading.remaining, "hitl request observed");
                fx.push(Effect::ShowPrompt(PromptView::of(tracked, reading)));
                fx.push(Effect::Notify(
                    Notice::urgent(MSG_NEW_REQUEST).about(task_id.clone()),
                ));
            }
            Observation::Refreshed { changed: true } => {
                if let Some(tracked) = self.registry.get(&task_id) {
                    let reading = tracked
                        .last_reading
                        .unwrap_or_else(|| tracked.countdown.clone().read(now));
                    fx.push(Effect::RefreshPrompt(PromptView::of(tracked, reading)));
                }
            }
            Observation::Refreshed { changed: false } => {}
            Observation::Stale(status) => {
                debug!(task_id = %task_id, ?status, "ignoring observation of resolved request");
            }
        }
    }

    fn on_tick(&mut self, now: Instant, fx: &mut Vec<Effect>) {
        let mut expired = Vec::new();
        for task_id in self.registry.pending_ids() {
            let Some(tracked) = self.registry.get_mut(&task_id) else {
                continue;
            };
            let reading = tracked.countdown.read(now);
            if tracked.last_reading != Some(reading) {
                tracked.last_reading = Some(reading);
                fx.push(Effect::Countdown {
                    task_id: task_id.clone(),
                    reading,
                });
            }
            if reading.expired() {
                expired.push(task_id);
            }
        }

        for task_id in expired {
            let notify_now = self.expiry == ExpiryNotice::Immediate;
            if self
                .registry
                .resolve(&task_id, HitlStatus::TimedOut, notify_now, now)
                .is_some()
            {
                info!(task_id = %task_id, "hitl request expired locally");
                fx.push(Effect::RemovePrompt {
                    task_id,
                    status: HitlStatus::TimedOut,
                });
                if notify_now {
                    fx.push(Effect::Notify(Notice::warning(MSG_LOCAL_TIMEOUT)));
                }
            }
        }

        self.registry.prune(now);
    }

    fn on_server_timeout(&mut self, task_id: TaskId, now: Instant, fx: &mut Vec<Effect>) {
        if self
            .registry
            .resolve(&task_id, HitlStatus::TimedOut, true, now)
            .is_some()
        {
            info!(task_id = %task_id, "hitl request timed out on the server");
            fx.push(Effect::RemovePrompt {
                task_id,
                status: HitlStatus::TimedOut,
            });
            fx.push(Effect::Notify(Notice::warning(MSG_SERVER_TIMEOUT)));
        } else if self.registry.claim_timeout_notice(&task_id) {
            info!(task_id = %task_id, "server confirmed local expiry");
            fx.push(Effect::Notify(Notice::warning(MSG_SERVER_TIMEOUT)));
        } else {
            debug!(
                task_id = %task_id,
                status = ?self.registry.status(&task_id),
                "ignoring server timeout for request that is not pending"
            );
        }
    }

    fn on_submit_requested(&mut self, task_id: TaskId, text: String, fx: &mut Vec<Effect>) {
        let Some(tracked) = self.registry.get_mut(&task_id) else {
            fx.push(Effect::Notify(Notice::warning(MSG_NOT_PENDING)));
            return;
        };
        let text = text.trim();
        if text.is_empty() {
            fx.push(Effect::Notify(Notice::error(MSG_EMPTY_RESPONSE)));
            fx.push(Effect::FocusInput(task_id));
            return;
        }
        if tracked.submitting {
            fx.push(Effect::Notify(Notice::warning(MSG_ALREADY_SENDING)));
            return;
        }
        tracked.submitting = true;
        fx.push(Effect::SendResponse {
            task_id,
            text: text.to_string(),
        });
    }

    fn on_submit_result(
        &mut self,
        task_id: TaskId,
        outcome: SubmitOutcome,
        now: Instant,
        fx: &mut Vec<Effect>,
    ) {
        if let Some(tracked) = self.registry.get_mut(&task_id) {
            tracked.submitting = false;
        } else {
            debug!(task_id = %task_id, ?outcome, "discarding submit result for resolved request");
            return;
        }

        match outcome {
            SubmitOutcome::Accepted => {
                if self
                    .registry
                    .resolve(&task_id, HitlStatus::Answered, true, now)
                    .is_some()
                {
                    info!(task_id = %task_id, "hitl request answered");
                    fx.push(Effect::RemovePrompt {
                        task_id,
                        status: HitlStatus::Answered,
                    });
                    fx.push(Effect::Notify(Notice::success(MSG_ANSWERED)));
                }
            }
            SubmitOutcome::Rejected(message) => {
                fx.push(Effect::Notify(Notice::error(format!("Error: {}", message))));
            }
            SubmitOutcome::Failed(_) => {
                fx.push(Effect::Notify(Notice::error(MSG_SEND_FAILED)));
            }
        }
    }

    fn on_dismissed(&mut self, task_id: TaskId, now: Instant, fx: &mut Vec<Effect>) {
        if self
            .registry
            .resolve(&task_id, HitlStatus::Dismissed, true, now)
            .is_some()
        {
            info!(task_id = %task_id, "hitl request dismissed by operator");
            fx.push(Effect::RemovePrompt {
                task_id,
                status: HitlStatus::Dismissed,
            });
            fx.push(Effect::Notify(Notice::info(MSG_DISMISSED)));
        }
    }

    /// Emit modal / visibility changes implied by the registry contents.
    fn sync_surface(&mut self, fx: &mut Vec<Effect>) {
        let modal = self.registry.modal().map(|t| t.task_id().clone());
        if modal != self.modal {
            self.modal = modal.clone();
            fx.push(Effect::ModalChanged(modal.clone()));
            if let Some(id) = modal {
                fx.push(Effect::FocusInput(id));
            }
        }

        let visible = !self.registry.is_empty();
        if visible != self.surface_visible {
            self.surface_visible = visible;
            fx.push(Effect::SurfaceVisible(visible));
        }
    }

    /// Forget all requests and hide the surface. Countdowns are plain
    /// data, so nothing keeps running afterwards.
    pub fn reset(&mut self) -> Vec<Effect> {
        let mut fx = Vec::new();
        self.registry.clear();
        self.sync_surface(&mut fx);
        fx
    }
}

/// Free-function form of [`HitlState::apply`].
pub fn apply(state: &mut HitlState, event: HitlEvent, now: Instant) -> Vec<Effect> {
    state.apply(event, now)
}
