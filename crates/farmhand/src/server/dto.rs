use farmhand_core::conversation::{ConversationContext, HistoryMessage};
use farmhand_core::{ChatFinish, ChatOutcome, ToolCallRecord};
use serde::{Deserialize, Serialize};

/// Body of `POST /chat`.
#[derive(Clone, Debug, Deserialize)]
pub struct ChatRequest {
    /// The new user message.
    pub message: String,
    /// Prior messages, oldest first.
    #[serde(default)]
    pub history: Vec<HistoryMessage>,
    /// The record the user is looking at.
    #[serde(default)]
    pub context: Option<ContextPayload>,
}

/// A record the user is looking at, as sent by the web client.
#[derive(Clone, Debug, Deserialize)]
pub struct ContextPayload {
    /// Kind of the record, like `task` or `asset`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Identifier of the record.
    pub id: i64,
    /// A markdown rendering of the record.
    pub data: String,
}

impl From<ContextPayload> for ConversationContext {
    fn from(payload: ContextPayload) -> Self {
        Self {
            resource_type: payload.kind,
            resource_id: payload.id,
            snapshot: payload.data,
        }
    }
}

/// Body of a successful `POST /chat` response.
#[derive(Clone, Debug, Serialize)]
pub struct ChatResponse {
    /// The assistant's answer.
    pub message: String,
    /// The tools called to produce the answer, in call order.
    pub tool_calls: Vec<ToolCallRecord>,
    /// How the turn ended.
    pub finish: ChatFinish,
}

impl From<ChatOutcome> for ChatResponse {
    fn from(outcome: ChatOutcome) -> Self {
        Self {
            message: outcome.message,
            tool_calls: outcome.tool_calls,
            finish: outcome.finish,
        }
    }
}
