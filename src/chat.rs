//! Campaign-planning conversation with the backend assistant.

use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, info};

use crate::api::BackendClient;
use crate::errors::ClientError;
use crate::models::chat::{AssistantReply, ChatTurn, ExecuteCampaignResult, Question, Role};

pub struct ChatSession {
    backend: BackendClient,
    history: Vec<ChatTurn>,
    questions: Vec<Question>,
    plan: Option<Value>,
}

impl ChatSession {
    pub fn new(backend: BackendClient) -> Self {
        Self {
            backend,
            history: Vec::new(),
            questions: Vec::new(),
            plan: None,
        }
    }

    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    /// Follow-up questions from the last `needs_more_info` reply.
    pub fn open_questions(&self) -> &[Question] {
        &self.questions
    }

    /// The finalized plan, once the assistant produced one and no later
    /// reply superseded it.
    pub fn plan(&self) -> Option<&Value> {
        self.plan.as_ref()
    }

    /// Send one user message. Blank messages are dropped and yield `None`.
    ///
    /// The message stays in the history even when the request fails, so
    /// the next message carries it along.
    pub async fn send(&mut self, message: &str) -> Result<Option<AssistantReply>, ClientError> {
        if message.trim().is_empty() {
            return Ok(None);
        }
        self.history.push(ChatTurn {
            role: Role::User,
            content: message.to_string(),
        });

        let reply = self.backend.chat(&self.history).await?;
        self.absorb(&reply);
        Ok(Some(reply))
    }

    /// Answer the open questions, keyed by `field_name`, as one message.
    pub async fn answer_questions(
        &mut self,
        answers: &HashMap<String, String>,
    ) -> Result<Option<AssistantReply>, ClientError> {
        let message = answers_message(&self.questions, answers);
        self.questions.clear();
        self.send(&message).await
    }

    /// Schedule the stored plan. The plan is consumed only on success.
    pub async fn execute_plan(&mut self) -> Result<ExecuteCampaignResult, ClientError> {
        let Some(plan) = self.plan.as_ref() else {
            return Err(ClientError::Rejected("No campaign plan found to confirm.".into()));
        };
        let result = self.backend.execute_campaign(plan).await?;
        info!(username = %self.backend.username(), "campaign scheduled");
        self.plan = None;
        Ok(result)
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.questions.clear();
        self.plan = None;
    }

    fn absorb(&mut self, reply: &AssistantReply) {
        if let Some(text) = reply.history_text() {
            self.history.push(ChatTurn {
                role: Role::Assistant,
                content: text,
            });
        }
        match reply {
            AssistantReply::NeedsMoreInfo { questions } => {
                self.questions = questions.clone();
                self.plan = None;
            }
            AssistantReply::PlanComplete { campaign_plan } => {
                self.questions.clear();
                self.plan = Some(campaign_plan.clone());
            }
            AssistantReply::Clarifying { .. } | AssistantReply::ToolExecuted { .. } => {
                self.questions.clear();
                self.plan = None;
            }
            AssistantReply::Error { message } => debug!(%message, "assistant reported an error"),
            AssistantReply::Unexpected => debug!("assistant reply had an unknown status"),
        }
    }
}

/// Fold answers into the single message the assistant expects.
///
/// Questions are listed in the order they were asked; unanswered ones are
/// sent with an empty value.
pub fn answers_message(questions: &[Question], answers: &HashMap<String, String>) -> String {
    let mut out = String::from("Here are the answers to your questions:");
    for q in questions {
        let value = answers.get(&q.field_name).map(String::as_str).unwrap_or("");
        out.push_str(&format!("\n- {}: {}", q.question_text, value.trim()));
    }
    out
}
