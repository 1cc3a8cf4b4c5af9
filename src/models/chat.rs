use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

/// `POST /api/chat_interaction` body.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest<'a> {
    pub username: &'a str,
    pub chat_history: &'a [ChatTurn],
}

/// Reply from the campaign-planning assistant, keyed on `status`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AssistantReply {
    Clarifying {
        assistant_response: String,
    },
    NeedsMoreInfo {
        questions: Vec<Question>,
    },
    PlanComplete {
        campaign_plan: serde_json::Value,
    },
    ToolExecuted {
        #[serde(default)]
        tool_result: serde_json::Value,
        #[serde(default)]
        assistant_response: String,
    },
    Error {
        #[serde(default)]
        message: String,
    },
    #[serde(other)]
    Unexpected,
}

impl AssistantReply {
    /// The text that goes into the conversation history for this reply,
    /// or `None` when the reply is not part of the conversation.
    pub fn history_text(&self) -> Option<String> {
        match self {
            AssistantReply::Clarifying { assistant_response } => {
                Some(assistant_response.clone())
            }
            AssistantReply::NeedsMoreInfo { questions } => {
                serde_json::to_string(questions).ok()
            }
            AssistantReply::PlanComplete { campaign_plan } => Some(format!(
                "Here is the finalized campaign plan:\n{}",
                serde_json::to_string_pretty(campaign_plan).unwrap_or_default()
            )),
            AssistantReply::ToolExecuted {
                tool_result,
                assistant_response,
            } => Some(format!(
                "Tool execution result: {}\n\n{}",
                display_value(tool_result),
                assistant_response
            )),
            AssistantReply::Error { .. } | AssistantReply::Unexpected => None,
        }
    }

    /// The text shown to the operator.
    pub fn display_text(&self) -> String {
        match self {
            AssistantReply::NeedsMoreInfo { questions } => {
                let mut out = String::from("The assistant needs more information:");
                for (i, q) in questions.iter().enumerate() {
                    out.push_str(&format!("\n  {}. {}", i + 1, q.question_text));
                    if let Some(opts) = q.options.as_ref().filter(|_| q.response_type == ResponseType::Select) {
                        let labels: Vec<&str> = opts.iter().map(|o| o.label.as_str()).collect();
                        out.push_str(&format!(" [{}]", labels.join(" / ")));
                    }
                }
                out
            }
            AssistantReply::Error { message } => format!("Error: {}", message),
            AssistantReply::Unexpected => {
                "Received an unexpected response from the assistant.".to_string()
            }
            other => other.history_text().unwrap_or_default(),
        }
    }
}

fn display_value(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    #[default]
    Text,
    Textarea,
    Select,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

/// A follow-up question from a `needs_more_info` reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub question_text: String,
    pub field_name: String,
    #[serde(default)]
    pub response_type: ResponseType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<SelectOption>>,
}

/// `POST /api/execute_campaign` body.
#[derive(Debug, Clone, Serialize)]
pub struct ExecuteCampaignRequest<'a> {
    pub username: &'a str,
    pub campaign_plan: &'a serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteCampaignResult {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

impl ExecuteCampaignResult {
    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some("success")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_clarifying_reply() {
        let reply: AssistantReply = serde_json::from_value(json!({
            "status": "clarifying",
            "assistant_response": "Which city?"
        }))
        .unwrap();
        assert_eq!(reply.history_text().as_deref(), Some("Which city?"));
    }

    #[test]
    fn test_needs_more_info_reply_with_select() {
        let reply: AssistantReply = serde_json::from_value(json!({
            "status": "needs_more_info",
            "questions": [
                {"question_text": "Budget?", "field_name": "budget"},
                {"question_text": "Tone?", "field_name": "tone", "response_type": "select",
                 "options": [{"value": "f", "label": "Formal"}, {"value": "c", "label": "Casual"}]}
            ]
        }))
        .unwrap();
        let AssistantReply::NeedsMoreInfo { questions } = &reply else {
            panic!("wrong variant: {:?}", reply);
        };
        assert_eq!(questions[0].response_type, ResponseType::Text);
        assert_eq!(questions[1].response_type, ResponseType::Select);
        assert!(reply.display_text().contains("[Formal / Casual]"));
    }

    #[test]
    fn test_plan_complete_reply() {
        let reply: AssistantReply = serde_json::from_value(json!({
            "status": "plan_complete",
            "campaign_plan": {"contacts": 3}
        }))
        .unwrap();
        assert!(reply
            .history_text()
            .unwrap()
            .starts_with("Here is the finalized campaign plan:\n"));
    }

    #[test]
    fn test_tool_executed_reply() {
        let reply: AssistantReply = serde_json::from_value(json!({
            "status": "tool_executed",
            "tool_result": "3 rows",
            "assistant_response": "Done."
        }))
        .unwrap();
        assert_eq!(
            reply.history_text().as_deref(),
            Some("Tool execution result: 3 rows\n\nDone.")
        );
    }

    #[test]
    fn test_error_and_unknown_replies_stay_out_of_history() {
        let err: AssistantReply =
            serde_json::from_value(json!({"status": "error", "message": "boom"})).unwrap();
        let odd: AssistantReply =
            serde_json::from_value(json!({"status": "thinking"})).unwrap();
        assert_eq!(err.display_text(), "Error: boom");
        assert!(err.history_text().is_none());
        assert_eq!(odd, AssistantReply::Unexpected);
        assert!(odd.history_text().is_none());
    }

    #[test]
    fn test_campaign_result_success_flag() {
        let ok: ExecuteCampaignResult =
            serde_json::from_value(json!({"status": "success", "message": "queued"})).unwrap();
        let bad: ExecuteCampaignResult =
            serde_json::from_value(json!({"detail": "no contacts"})).unwrap();
        assert!(ok.is_success());
        assert!(!bad.is_success());
    }
}
