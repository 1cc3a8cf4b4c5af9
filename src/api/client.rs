use std::time::Duration;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::config::Config;
use crate::errors::{error_message, ClientError};
use crate::models::chat::{
    AssistantReply, ChatRequest, ChatTurn, ExecuteCampaignRequest, ExecuteCampaignResult,
};
use crate::models::dashboard::{
    Ack, CallAttempt, ClearDatabaseResult, TaskFilter, TasksResponse, User, UsersResponse,
    CallsResponse, CLEAR_DATABASE_CONFIRMATION,
};
use crate::models::hitl::{HitlAck, HitlRequest, HitlResponseBody, PendingRequests, TaskId};

/// Typed client for the backend's REST surface.
///
/// Cheap to clone; the underlying `reqwest::Client` is reference counted.
#[derive(Clone)]
pub struct BackendClient {
    http: Client,
    origin: String,
    username: String,
}

impl BackendClient {
    pub fn new(config: &Config) -> Self {
        Self::with_origin(config.origin(), &config.username, config.http_timeout())
    }

    pub fn with_origin(origin: &str, username: &str, timeout: Duration) -> Self {
        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .user_agent(concat!("calldesk/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("failed to build HTTP client");

        Self {
            http,
            origin: origin.trim_end_matches('/').to_string(),
            username: username.to_string(),
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.origin, path)
    }

    /// Non-2xx becomes `ClientError::Api` carrying the backend's message.
    async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T, ClientError> {
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(ClientError::Api {
                status,
                message: error_message(status, &body),
            });
        }
        Ok(serde_json::from_str(&body)?)
    }

    // ── HITL ──────────────────────────────────────────────────

    /// `GET /api/pending_hitl_requests?username=<name>`
    pub async fn pending_requests(&self) -> Result<Vec<HitlRequest>, ClientError> {
        let resp = self
            .http
            .get(self.url("/api/pending_hitl_requests"))
            .query(&[("username", self.username.as_str())])
            .send()
            .await?;
        let pending: PendingRequests = Self::read_json(resp).await?;
        if !pending.success {
            return Err(ClientError::Rejected(
                pending.message.unwrap_or_else(|| "Unknown error".into()),
            ));
        }
        debug!(count = pending.requests.len(), "fetched pending hitl requests");
        Ok(pending.requests)
    }

    /// `POST /api/hitl_response`
    ///
    /// Whitespace-only text never reaches the network. The text is sent
    /// trimmed. An application-level `success: false` is returned as
    /// `ClientError::Rejected`.
    pub async fn submit_response(&self, task_id: &TaskId, text: &str) -> Result<HitlAck, ClientError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ClientError::EmptyResponse);
        }

        let body = HitlResponseBody {
            task_id,
            response: text,
            username: &self.username,
        };
        let resp = self
            .http
            .post(self.url("/api/hitl_response"))
            .json(&body)
            .send()
            .await?;
        let ack: HitlAck = Self::read_json(resp).await?;
        if !ack.success {
            return Err(ClientError::Rejected(
                ack.message.unwrap_or_else(|| "Unknown error".into()),
            ));
        }
        Ok(ack)
    }

    // ── Dashboard ─────────────────────────────────────────────

    pub async fn users(&self) -> Result<Vec<User>, ClientError> {
        let resp = self.http.get(self.url("/api/users")).send().await?;
        let users: UsersResponse = Self::read_json(resp).await?;
        if !users.success {
            return Err(ClientError::Rejected("Failed to load users".into()));
        }
        Ok(users.users)
    }

    pub async fn tasks(&self, filter: &TaskFilter) -> Result<TasksResponse, ClientError> {
        let resp = self
            .http
            .get(self.url("/api/tasks"))
            .query(&filter.query_pairs())
            .send()
            .await?;
        let tasks: TasksResponse = Self::read_json(resp).await?;
        if !tasks.success {
            return Err(ClientError::Rejected("Failed to load tasks".into()));
        }
        Ok(tasks)
    }

    pub async fn task_calls(&self, task_id: i64) -> Result<Vec<CallAttempt>, ClientError> {
        let resp = self
            .http
            .get(self.url(&format!("/api/tasks/{}/calls", task_id)))
            .send()
            .await?;
        let calls: CallsResponse = Self::read_json(resp).await?;
        if !calls.success {
            return Err(ClientError::Rejected("Failed to load call history".into()));
        }
        Ok(calls.calls)
    }

    pub async fn delete_task(&self, task_id: i64) -> Result<(), ClientError> {
        let resp = self
            .http
            .delete(self.url(&format!("/api/tasks/{}", task_id)))
            .send()
            .await?;
        let ack: Ack = Self::read_json(resp).await?;
        if !ack.success {
            return Err(ClientError::Rejected(
                ack.message.unwrap_or_else(|| "Failed to delete task".into()),
            ));
        }
        Ok(())
    }

    /// Wipe every task on the backend. Refused locally unless `confirm`
    /// is exactly `CONFIRM`.
    pub async fn clear_database(&self, confirm: &str) -> Result<ClearDatabaseResult, ClientError> {
        if confirm != CLEAR_DATABASE_CONFIRMATION {
            return Err(ClientError::InvalidConfig(format!(
                "database clear requires the confirmation token {}",
                CLEAR_DATABASE_CONFIRMATION
            )));
        }
        let resp = self
            .http
            .delete(self.url("/api/clear-database"))
            .query(&[("confirm", confirm)])
            .send()
            .await?;
        let result: ClearDatabaseResult = Self::read_json(resp).await?;
        if !result.success {
            return Err(ClientError::Rejected(
                result.message.unwrap_or_else(|| "Failed to clear database".into()),
            ));
        }
        Ok(result)
    }

    // ── Campaign chat ─────────────────────────────────────────

    /// `POST /api/chat_interaction` with the whole conversation so far.
    pub async fn chat(&self, history: &[ChatTurn]) -> Result<AssistantReply, ClientError> {
        let body = ChatRequest {
            username: &self.username,
            chat_history: history,
        };
        let resp = self
            .http
            .post(self.url("/api/chat_interaction"))
            .json(&body)
            .send()
            .await?;
        Self::read_json(resp).await
    }

    pub async fn execute_campaign(&self, plan: &Value) -> Result<ExecuteCampaignResult, ClientError> {
        let body = ExecuteCampaignRequest {
            username: &self.username,
            campaign_plan: plan,
        };
        let resp = self
            .http
            .post(self.url("/api/execute_campaign"))
            .json(&body)
            .send()
            .await?;
        let result: ExecuteCampaignResult = Self::read_json(resp).await?;
        if !result.is_success() {
            let message = result
                .detail
                .or(result.message)
                .unwrap_or_else(|| "Failed to execute campaign".into());
            return Err(ClientError::Rejected(message));
        }
        Ok(result)
    }
}
