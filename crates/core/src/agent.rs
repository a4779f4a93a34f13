mod builder;
mod outcome;
#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::time::Instant;

use farmhand_model::{
    ErrorKind, ModelFinishReason, ModelMessage, ModelRequest,
    ToolCallRequest, ToolCallResult,
};
use serde_json::{Value, json};
use tracing::Instrument;

use crate::conversation::{ChatInput, initial_messages};
use crate::model_client::ModelClient;
use crate::tool::{Executor, ToolRegistry};
use crate::truncate::truncate_result;
pub use builder::{AgentBuilder, DEFAULT_MAX_ROUNDS};
pub use outcome::{ChatFinish, ChatOutcome, ToolCallRecord};

/// Errors that abort a conversation turn.
///
/// Tool failures never abort a turn, they are reported to the model
/// instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The model request failed, after retries if the failure was
    /// retryable.
    #[error("model request failed: {message}")]
    Model {
        /// The kind reported by the provider.
        kind: ErrorKind,
        /// The provider's error message.
        message: String,
    },
}

/// An agent that answers user messages, calling tools as the model asks.
///
/// The agent holds no per-conversation state, each [`Agent::chat`] call
/// owns its transcript. It's cheap to clone and can serve concurrent turns.
#[derive(Clone)]
pub struct Agent {
    inner: Arc<AgentInner>,
}

struct AgentInner {
    model_client: ModelClient,
    executor: Executor,
    system_prompt: String,
    history_limit: usize,
    max_rounds: usize,
    max_result_length: usize,
}

impl Agent {
    /// Returns the tools the model may call.
    #[inline]
    pub fn tool_registry(&self) -> &Arc<ToolRegistry> {
        self.inner.executor.registry()
    }

    /// Runs one conversation turn to completion.
    ///
    /// The model is asked repeatedly until it answers without requesting
    /// tools, or until the round budget is spent. Requested tools run one
    /// at a time in the order the model listed them.
    pub async fn chat(&self, input: ChatInput) -> Result<ChatOutcome, Error> {
        let span = info_span!("chat turn", history = input.history.len());
        self.run_turn(input).instrument(span).await
    }

    async fn run_turn(&self, input: ChatInput) -> Result<ChatOutcome, Error> {
        let inner = &self.inner;
        let mut request = ModelRequest {
            messages: initial_messages(
                &inner.system_prompt,
                &input,
                inner.history_limit,
            ),
            tools: self.tool_registry().model_tools().to_vec(),
        };
        let mut records = vec![];
        let mut last_text = None;

        for round in 1..=inner.max_rounds {
            debug!(round, "requesting model");
            let resp = inner
                .model_client
                .send_request(&request)
                .await
                .map_err(|err| Error::Model {
                    kind: err.kind(),
                    message: err.to_string(),
                })?;

            if resp.tool_calls.is_empty()
                || resp.finish_reason == ModelFinishReason::Stop
            {
                info!(
                    rounds = round,
                    tool_calls = records.len(),
                    "turn completed"
                );
                return Ok(ChatOutcome {
                    message: resp.content.unwrap_or_default(),
                    tool_calls: records,
                    finish: ChatFinish::Completed,
                });
            }

            if let Some(text) =
                resp.content.as_deref().filter(|text| !text.is_empty())
            {
                last_text = Some(text.to_owned());
            }
            request
                .messages
                .push(ModelMessage::Assistant(resp.to_message()));

            for call in resp.tool_calls {
                let (record, content) = self.run_tool_call(&call).await;
                request.messages.push(ModelMessage::Tool(ToolCallResult {
                    id: call.id,
                    content,
                }));
                records.push(record);
            }
        }

        warn!(
            max_rounds = inner.max_rounds,
            tool_calls = records.len(),
            "round limit exceeded"
        );
        let message = last_text.unwrap_or_else(|| {
            format!(
                "I stopped after {} rounds of tool calls without reaching a \
                 final answer. Please try a narrower request.",
                inner.max_rounds
            )
        });
        Ok(ChatOutcome {
            message,
            tool_calls: records,
            finish: ChatFinish::RoundLimitExceeded,
        })
    }

    /// Runs a single tool call, returning its record and the content of the
    /// tool message sent back to the model.
    async fn run_tool_call(
        &self,
        call: &ToolCallRequest,
    ) -> (ToolCallRecord, String) {
        let arguments = match decode_arguments(&call.arguments) {
            Ok(arguments) => arguments,
            Err(err) => {
                let message = format!("Invalid tool arguments: {err}");
                warn!(tool = %call.name, "{message}");
                let content = error_content(&message);
                let raw = Value::String(call.arguments.clone());
                let record = ToolCallRecord::failure(&call.name, raw, message);
                return (record, content);
            }
        };

        let started = Instant::now();
        let result = self
            .inner
            .executor
            .execute(&call.name, arguments.clone())
            .await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(result) => {
                info!(tool = %call.name, elapsed_ms, "tool call succeeded");
                let content =
                    truncate_result(&result, self.inner.max_result_length);
                let record =
                    ToolCallRecord::success(&call.name, arguments, result);
                (record, content)
            }
            Err(err) => {
                let message = err.to_string();
                warn!(
                    tool = %call.name,
                    elapsed_ms,
                    "tool call failed: {message}"
                );
                let content = error_content(&message);
                let record =
                    ToolCallRecord::failure(&call.name, arguments, message);
                (record, content)
            }
        }
    }
}

fn decode_arguments(raw: &str) -> Result<Value, serde_json::Error> {
    // Some models send an empty string for tools without parameters.
    if raw.trim().is_empty() {
        return Ok(json!({}));
    }
    serde_json::from_str(raw)
}

fn error_content(message: &str) -> String {
    json!({ "error": message }).to_string()
}
