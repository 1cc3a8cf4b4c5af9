//! Operator-facing banners.
//!
//! Independent of HITL semantics: anything that wants to tell the operator
//! something pushes a [`Banner`] into the [`BannerBoard`]. Ordinary banners
//! auto-expire after a fixed TTL (5s by default); `urgent` ones stay until
//! the operator closes them or the request they are about is resolved.

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::models::hitl::TaskId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
    Urgent,
}

impl Level {
    pub fn auto_expires(self) -> bool {
        self != Level::Urgent
    }
}

/// Something to show, before it has been placed on the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: Level,
    pub message: String,
    /// Request this notice is about, if any.
    pub about: Option<TaskId>,
}

impl Notice {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            about: None,
        }
    }

    pub fn about(mut self, task_id: TaskId) -> Self {
        self.about = Some(task_id);
        self
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Level::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(Level::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Level::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Level::Error, message)
    }

    pub fn urgent(message: impl Into<String>) -> Self {
        Self::new(Level::Urgent, message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub id: u64,
    pub level: Level,
    pub message: String,
    pub about: Option<TaskId>,
    pub shown_at: Instant,
}

pub struct BannerBoard {
    banners: Vec<Banner>,
    ttl: Duration,
    next_id: u64,
}

impl BannerBoard {
    pub fn new(ttl: Duration) -> Self {
        Self {
            banners: Vec::new(),
            ttl,
            next_id: 1,
        }
    }

    /// Place a notice on the board and return the banner that now shows it.
    pub fn post(&mut self, notice: Notice, now: Instant) -> Banner {
        let banner = Banner {
            id: self.next_id,
            level: notice.level,
            message: notice.message,
            about: notice.about,
            shown_at: now,
        };
        self.next_id += 1;
        self.banners.push(banner.clone());
        banner
    }

    /// Operator closed a banner. Unknown ids are ignored.
    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.banners.len();
        self.banners.retain(|b| b.id != id);
        before != self.banners.len()
    }

    /// Drop every banner tied to `task_id` and return their ids.
    pub fn dismiss_about(&mut self, task_id: &TaskId) -> Vec<u64> {
        let mut removed = Vec::new();
        self.banners.retain(|b| {
            let keep = b.about.as_ref() != Some(task_id);
            if !keep {
                removed.push(b.id);
            }
            keep
        });
        removed
    }

    /// Remove non-urgent banners older than the TTL and return their ids.
    pub fn expire(&mut self, now: Instant) -> Vec<u64> {
        let ttl = self.ttl;
        let mut expired = Vec::new();
        self.banners.retain(|b| {
            let keep = !b.level.auto_expires() || now.saturating_duration_since(b.shown_at) < ttl;
            if !keep {
                expired.push(b.id);
            }
            keep
        });
        expired
    }

    pub fn visible(&self) -> &[Banner] {
        &self.banners
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordinary_banner_expires_after_ttl() {
        let t0 = Instant::now();
        let mut board = BannerBoard::new(Duration::from_secs(5));
        let b = board.post(Notice::success("Response sent!"), t0);

        assert!(board.expire(t0 + Duration::from_secs(4)).is_empty());
        assert_eq!(board.expire(t0 + Duration::from_secs(5)), vec![b.id]);
        assert!(board.visible().is_empty());
    }

    #[test]
    fn test_urgent_banner_never_expires() {
        let t0 = Instant::now();
        let mut board = BannerBoard::new(Duration::from_secs(5));
        board.post(Notice::urgent("AI agent needs information"), t0);

        assert!(board.expire(t0 + Duration::from_secs(3600)).is_empty());
        assert_eq!(board.visible().len(), 1);
    }

    #[test]
    fn test_dismiss_removes_only_that_banner() {
        let t0 = Instant::now();
        let mut board = BannerBoard::new(Duration::from_secs(5));
        let a = board.post(Notice::info("a"), t0);
        let b = board.post(Notice::urgent("b"), t0);

        assert!(board.dismiss(b.id));
        assert!(!board.dismiss(b.id));
        assert_eq!(board.visible().len(), 1);
        assert_eq!(board.visible()[0].id, a.id);
    }

    #[test]
    fn test_urgent_banner_leaves_with_its_request() {
        let t0 = Instant::now();
        let mut board = BannerBoard::new(Duration::from_secs(5));
        let seven = board.post(Notice::urgent("needs info").about(TaskId::Num(7)), t0);
        let eight = board.post(Notice::urgent("needs info").about(TaskId::Num(8)), t0);
        board.post(Notice::info("unrelated"), t0);

        assert_eq!(board.dismiss_about(&TaskId::Num(7)), vec![seven.id]);
        assert!(board.dismiss_about(&TaskId::Num(7)).is_empty());
        assert_eq!(board.dismiss_about(&TaskId::Num(8)), vec![eight.id]);
        assert_eq!(board.expire(t0 + Duration::from_secs(86_400)).len(), 1);
        assert!(board.visible().is_empty());
    }
}
