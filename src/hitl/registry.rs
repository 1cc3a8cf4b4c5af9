//! Outstanding HITL requests, keyed by task id.
//!
//! The registry is the only place request state lives. It guarantees:
//! - at most one entry per task id (re-observation refreshes in place);
//! - resolution is idempotent (unknown ids are a no-op);
//! - a resolved id is remembered for a retention window so that a late
//!   poll result or push message cannot bring it back.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::hitl::countdown::{Countdown, Reading};
use crate::models::hitl::{HitlRequest, HitlStatus, TaskId};

/// A pending request plus its client-side bookkeeping.
#[derive(Debug, Clone)]
pub struct Tracked {
    pub request: HitlRequest,
    pub countdown: Countdown,
    /// Observation order; the lowest pending `seq` is presented modally.
    pub seq: u64,
    /// A response for this request is on the wire.
    pub submitting: bool,
    /// Last countdown value handed to the presenter.
    pub last_reading: Option<Reading>,
}

impl Tracked {
    pub fn task_id(&self) -> &TaskId {
        &self.request.task_id
    }
}

#[derive(Debug, Clone)]
struct Resolved {
    status: HitlStatus,
    at: Instant,
    /// Whether the operator has been told about the outcome. Only a local
    /// expiry that is waiting for the server's verdict leaves this false.
    notified: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// First sighting; a prompt should be shown.
    Inserted,
    /// Already pending. `changed` is true when question or call info moved.
    Refreshed { changed: bool },
    /// Already resolved within the retention window.
    Stale(HitlStatus),
}

pub struct HitlRegistry {
    entries: HashMap<TaskId, Tracked>,
    resolved: HashMap<TaskId, Resolved>,
    retention: Duration,
    next_seq: u64,
}

impl HitlRegistry {
    pub fn new(retention: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            resolved: HashMap::new(),
            retention,
            next_seq: 0,
        }
    }

    /// Register `request` if its task id is not already known.
    ///
    /// The countdown anchor is `now` (receipt time), not any server
    /// timestamp. A refresh never moves the anchor or the budget.
    pub fn observe(&mut self, request: HitlRequest, now: Instant) -> Observation {
        if let Some(existing) = self.entries.get_mut(&request.task_id) {
            let changed = existing.request.question != request.question
                || existing.request.call_info != request.call_info;
            if changed {
                existing.request.question = request.question;
                existing.request.call_info = request.call_info;
            }
            return Observation::Refreshed { changed };
        }

        if let Some(done) = self.resolved.get(&request.task_id) {
            if now.saturating_duration_since(done.at) < self.retention {
                return Observation::Stale(done.status);
            }
            self.resolved.remove(&request.task_id);
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        let countdown = Countdown::new(now, request.timeout_seconds);
        self.entries.insert(
            request.task_id.clone(),
            Tracked {
                request,
                countdown,
                seq,
                submitting: false,
                last_reading: None,
            },
        );
        Observation::Inserted
    }

    /// Remove a pending request, dropping its countdown with it.
    ///
    /// Returns `None` when the id is not pending, which callers treat as
    /// "someone else already resolved it".
    pub fn resolve(
        &mut self,
        task_id: &TaskId,
        status: HitlStatus,
        notified: bool,
        now: Instant,
    ) -> Option<Tracked> {
        debug_assert!(status.is_terminal());
        let tracked = self.entries.remove(task_id)?;
        self.resolved.insert(
            task_id.clone(),
            Resolved {
                status,
                at: now,
                notified,
            },
        );
        Some(tracked)
    }

    /// For a request that expired locally without telling the operator,
    /// claim the single deferred "timed out" notice. Returns `true` at most
    /// once per resolution.
    pub fn claim_timeout_notice(&mut self, task_id: &TaskId) -> bool {
        match self.resolved.get_mut(task_id) {
            Some(done) if done.status == HitlStatus::TimedOut && !done.notified => {
                done.notified = true;
                true
            }
            _ => false,
        }
    }

    pub fn status(&self, task_id: &TaskId) -> Option<HitlStatus> {
        if self.entries.contains_key(task_id) {
            return Some(HitlStatus::Pending);
        }
        self.resolved.get(task_id).map(|d| d.status)
    }

    pub fn get(&self, task_id: &TaskId) -> Option<&Tracked> {
        self.entries.get(task_id)
    }

    pub fn get_mut(&mut self, task_id: &TaskId) -> Option<&mut Tracked> {
        self.entries.get_mut(task_id)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Pending requests in the order they were first observed.
    pub fn pending(&self) -> Vec<&Tracked> {
        let mut all: Vec<&Tracked> = self.entries.values().collect();
        all.sort_by_key(|t| t.seq);
        all
    }

    pub fn pending_ids(&self) -> Vec<TaskId> {
        self.pending().into_iter().map(|t| t.task_id().clone()).collect()
    }

    /// The request presented modally: the earliest observed one.
    pub fn modal(&self) -> Option<&Tracked> {
        self.entries.values().min_by_key(|t| t.seq)
    }

    /// Forget resolved ids older than the retention window.
    pub fn prune(&mut self, now: Instant) -> usize {
        let retention = self.retention;
        let before = self.resolved.len();
        self.resolved
            .retain(|_, d| now.saturating_duration_since(d.at) < retention);
        before - self.resolved.len()
    }

    /// Drop everything; used when the client stops.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.resolved.clear();
    }
}
