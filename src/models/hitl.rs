use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of the task a HITL request belongs to.
///
/// The backend uses integer task ids, but some payloads carry them as
/// strings. Both forms are accepted and echoed back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskId {
    Num(i64),
    Text(String),
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskId::Num(n) => write!(f, "{}", n),
            TaskId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for TaskId {
    fn from(n: i64) -> Self {
        TaskId::Num(n)
    }
}

impl From<&str> for TaskId {
    /// Operator input: numeric text becomes a numeric id so that it
    /// matches what the backend sent.
    fn from(s: &str) -> Self {
        let s = s.trim();
        s.parse::<i64>()
            .map(TaskId::Num)
            .unwrap_or_else(|_| TaskId::Text(s.to_string()))
    }
}

/// Who the agent is on the phone with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallInfo {
    #[serde(default)]
    pub person_name: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub business_name: Option<String>,
}

/// A HITL request as delivered by the backend (poll or push).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitlRequest {
    pub task_id: TaskId,
    pub question: String,
    /// Missing or `null` in some payloads; treated as all-unknown.
    #[serde(default, deserialize_with = "null_as_default")]
    pub call_info: CallInfo,
    pub timeout_seconds: u64,
}

fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HitlStatus {
    Pending,
    Answered,
    TimedOut,
    Dismissed,
}

impl HitlStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, HitlStatus::Pending)
    }
}

/// `GET /api/pending_hitl_requests` response.
#[derive(Debug, Clone, Deserialize)]
pub struct PendingRequests {
    pub success: bool,
    #[serde(default)]
    pub requests: Vec<HitlRequest>,
    #[serde(default)]
    pub message: Option<String>,
}

/// `POST /api/hitl_response` body.
#[derive(Debug, Clone, Serialize)]
pub struct HitlResponseBody<'a> {
    pub task_id: &'a TaskId,
    pub response: &'a str,
    pub username: &'a str,
}

/// `POST /api/hitl_response` result.
#[derive(Debug, Clone, Deserialize)]
pub struct HitlAck {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// Messages on the `/ws/hitl/<username>` channel.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PushMessage {
    HitlRequest(HitlRequest),
    HitlTimeout { task_id: TaskId },
    #[serde(other)]
    Unknown,
}
