//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::sync::Mutex;
use std::time::Duration;

use calldesk::hitl::dispatch::Effect;
use calldesk::models::hitl::HitlStatus;
use calldesk::notification::banner::Banner;
use calldesk::notification::Presenter;

/// Presenter that records everything it is asked to show.
#[derive(Default)]
pub struct RecordingPresenter {
    effects: Mutex<Vec<Effect>>,
    banners: Mutex<Vec<Banner>>,
    removed: Mutex<Vec<u64>>,
}

impl RecordingPresenter {
    pub fn effects(&self) -> Vec<Effect> {
        self.effects.lock().unwrap().clone()
    }

    pub fn banner_messages(&self) -> Vec<String> {
        self.banners
            .lock()
            .unwrap()
            .iter()
            .map(|b| b.message.clone())
            .collect()
    }

    /// Banners shown and not yet removed, as a board would hold them.
    pub fn banners_on_board(&self) -> Vec<Banner> {
        let removed = self.removed.lock().unwrap().clone();
        self.banners
            .lock()
            .unwrap()
            .iter()
            .filter(|b| !removed.contains(&b.id))
            .cloned()
            .collect()
    }

    pub fn shown_prompts(&self) -> usize {
        self.effects()
            .iter()
            .filter(|e| matches!(e, Effect::ShowPrompt(_)))
            .count()
    }

    pub fn removals(&self, status: HitlStatus) -> usize {
        self.effects()
            .iter()
            .filter(|e| matches!(e, Effect::RemovePrompt { status: s, .. } if *s == status))
            .count()
    }
}

impl Presenter for RecordingPresenter {
    fn render(&self, effect: &Effect) {
        self.effects.lock().unwrap().push(effect.clone());
    }

    fn banner_shown(&self, banner: &Banner) {
        self.banners.lock().unwrap().push(banner.clone());
    }

    fn banner_removed(&self, banner_id: u64) {
        self.removed.lock().unwrap().push(banner_id);
    }
}

/// Poll `cond` every 25ms for up to `timeout`.
pub async fn eventually(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if cond() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}

pub fn pending_body(task_id: i64, question: &str, timeout_seconds: u64) -> serde_json::Value {
    serde_json::json!({
        "success": true,
        "requests": [{
            "task_id": task_id,
            "question": question,
            "timeout_seconds": timeout_seconds,
            "call_info": {
                "person_name": "Dana Reyes",
                "phone_number": "+15550100",
                "business_name": "Reyes Dental"
            }
        }]
    })
}
