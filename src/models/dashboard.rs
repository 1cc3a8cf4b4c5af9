use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Rows per page on the task listing.
pub const TASK_PAGE_SIZE: u32 = 20;

/// Literal confirmation token the clear-database endpoint requires.
pub const CLEAR_DATABASE_CONFIRMATION: &str = "CONFIRM";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UsersResponse {
    pub success: bool,
    #[serde(default)]
    pub users: Vec<User>,
}

/// Timestamps come back from SQLite without an offset; both forms parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    Utc(DateTime<Utc>),
    Naive(NaiveDateTime),
}

impl Timestamp {
    pub fn as_utc(&self) -> DateTime<Utc> {
        match self {
            Timestamp::Utc(t) => *t,
            Timestamp::Naive(t) => t.and_utc(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    #[serde(default)]
    pub person_name: String,
    #[serde(default)]
    pub phone_number: String,
    pub status: String,
    #[serde(default)]
    pub user_task_description: String,
    #[serde(default)]
    pub current_attempt_count: u32,
    #[serde(default)]
    pub max_attempts: u32,
    #[serde(default)]
    pub next_action_time: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl Task {
    /// Share of the attempt budget already used, 0–100.
    pub fn attempts_percent(&self) -> u32 {
        if self.max_attempts == 0 {
            return 0;
        }
        (self.current_attempt_count.saturating_mul(100) / self.max_attempts).min(100)
    }

    /// `pending_user_info` → `pending user info`.
    pub fn status_label(&self) -> String {
        self.status.replace('_', " ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Pagination {
    pub page: u32,
    #[serde(default)]
    pub page_size: u32,
    pub total_count: u64,
    pub total_pages: u32,
}

impl Pagination {
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TasksResponse {
    pub success: bool,
    #[serde(default)]
    pub tasks: Vec<Task>,
    pub pagination: Option<Pagination>,
}

/// Filters for the task listing. Empty strings are treated as unset.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub user_id: i64,
    pub page: u32,
    pub status: Option<String>,
    pub phone: Option<String>,
    pub name: Option<String>,
}

impl TaskFilter {
    pub fn for_user(user_id: i64) -> Self {
        Self {
            user_id,
            page: 1,
            ..Default::default()
        }
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("user_id", self.user_id.to_string()),
            ("page", self.page.max(1).to_string()),
            ("page_size", TASK_PAGE_SIZE.to_string()),
        ];
        for (key, value) in [
            ("status", &self.status),
            ("phone", &self.phone),
            ("name", &self.name),
        ] {
            if let Some(v) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                pairs.push((key, v.to_string()));
            }
        }
        pairs
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallAttempt {
    pub attempt_number: u32,
    pub status: String,
    pub created_at: Timestamp,
    #[serde(default)]
    pub duration_seconds: Option<u64>,
    #[serde(default)]
    pub hangup_cause: Option<String>,
    #[serde(default)]
    pub call_conclusion: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallsResponse {
    pub success: bool,
    #[serde(default)]
    pub calls: Vec<CallAttempt>,
}

/// Generic `{ success, message? }` acknowledgement.
#[derive(Debug, Clone, Deserialize)]
pub struct Ack {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClearDatabaseResult {
    pub success: bool,
    #[serde(default)]
    pub backup_created: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn task(current: u32, max: u32) -> Task {
        serde_json::from_value(json!({
            "id": 1,
            "person_name": "Dana",
            "phone_number": "+15550100",
            "status": "pending_user_info",
            "current_attempt_count": current,
            "max_attempts": max,
            "created_at": "2025-05-01T10:00:00"
        }))
        .unwrap()
    }

    #[test]
    fn test_attempts_percent() {
        assert_eq!(task(4, 5).attempts_percent(), 80);
        assert_eq!(task(0, 0).attempts_percent(), 0);
        assert_eq!(task(9, 3).attempts_percent(), 100);
    }

    #[test]
    fn test_status_label() {
        assert_eq!(task(0, 1).status_label(), "pending user info");
    }

    #[test]
    fn test_naive_and_offset_timestamps_parse() {
        let naive: Timestamp = serde_json::from_value(json!("2025-05-01T10:00:00")).unwrap();
        let aware: Timestamp = serde_json::from_value(json!("2025-05-01T10:00:00Z")).unwrap();
        assert_eq!(naive.as_utc(), aware.as_utc());
    }

    #[test]
    fn test_filter_skips_blank_values() {
        let filter = TaskFilter {
            status: Some("completed".into()),
            phone: Some("  ".into()),
            ..TaskFilter::for_user(4)
        };
        let pairs = filter.query_pairs();
        assert!(pairs.contains(&("status", "completed".to_string())));
        assert!(pairs.contains(&("page_size", "20".to_string())));
        assert!(!pairs.iter().any(|(k, _)| *k == "phone"));
    }

    #[test]
    fn test_pagination_bounds() {
        let p = Pagination { page: 1, page_size: 20, total_count: 45, total_pages: 3 };
        assert!(!p.has_prev());
        assert!(p.has_next());
        let last = Pagination { page: 3, ..p };
        assert!(last.has_prev());
        assert!(!last.has_next());
    }
}
