use serde::Serialize;
use serde_json::Value;

/// How a conversation turn ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatFinish {
    /// The model produced a final answer.
    Completed,
    /// The model kept calling tools until the round budget ran out.
    RoundLimitExceeded,
}

/// One tool invocation made during a turn.
///
/// A record carries either a result or an error, never both.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolCallRecord {
    name: String,
    arguments: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ToolCallRecord {
    pub(crate) fn success(name: &str, arguments: Value, result: Value) -> Self {
        Self {
            name: name.to_owned(),
            arguments,
            result: Some(result),
            error: None,
        }
    }

    pub(crate) fn failure(name: &str, arguments: Value, error: String) -> Self {
        Self {
            name: name.to_owned(),
            arguments,
            result: None,
            error: Some(error),
        }
    }

    /// Returns the name of the called tool.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the decoded arguments.
    ///
    /// If the model sent arguments that couldn't be decoded, this is the
    /// raw text as a JSON string.
    #[inline]
    pub fn arguments(&self) -> &Value {
        &self.arguments
    }

    /// Returns the complete (untruncated) result of a successful call.
    #[inline]
    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    /// Returns the error message of a failed call.
    #[inline]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// The outcome of one conversation turn.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChatOutcome {
    /// The final assistant message, empty if the model sent no text.
    pub message: String,
    /// All tool calls made during the turn, in order.
    pub tool_calls: Vec<ToolCallRecord>,
    /// How the turn ended.
    pub finish: ChatFinish,
}
