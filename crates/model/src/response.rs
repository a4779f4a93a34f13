use serde::{Deserialize, Serialize};

use crate::request::AssistantMessage;

/// A complete response from the model provider.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelResponse {
    /// The text content of the response, if any.
    pub content: Option<String>,
    /// Tool calls requested by the model, in order.
    pub tool_calls: Vec<ToolCallRequest>,
    /// The reason the model stopped generating.
    pub finish_reason: ModelFinishReason,
}

impl ModelResponse {
    /// Converts the response into a message that can be appended to the
    /// conversation.
    #[inline]
    pub fn to_message(&self) -> AssistantMessage {
        AssistantMessage {
            content: self.content.clone(),
            tool_calls: self.tool_calls.clone(),
        }
    }
}

/// The reason why a model response has finished.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelFinishReason {
    /// The model needs to call a tool.
    ToolCalls,
    /// The model has finished generating text.
    Stop,
    /// The output hit the token limit.
    Length,
    /// The output was withheld by a content filter.
    ContentFilter,
}

/// Describes a tool call request from the model.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// The unique identifier for the tool call request.
    pub id: String,
    /// The name of the tool to call.
    pub name: String,
    /// The encoded argument mapping, exactly as the model produced it.
    ///
    /// It may be malformed, decoding is left to the caller.
    pub arguments: String,
}
