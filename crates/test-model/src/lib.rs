//! A local fake model for testing purpose.

mod preset;

use std::collections::VecDeque;
use std::error::Error as StdError;
use std::fmt::{self, Debug, Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use farmhand_model::{
    ErrorKind, ModelFinishReason, ModelProvider, ModelProviderError,
    ModelRequest, ModelResponse,
};
use tokio::time::sleep;

pub use preset::*;

#[derive(Debug)]
pub struct Error {
    message: &'static str,
    kind: ErrorKind,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.kind)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

#[derive(Default)]
struct ScriptState {
    script: VecDeque<PresetResponse>,
    // Failed attempts made against the head of the script.
    attempts: u64,
    requests: Vec<ModelRequest>,
}

/// A local fake model for testing purpose.
///
/// Before sending requests, you need to setup the conversation script, which
/// is how the model should respond to each request in order. Every request
/// is recorded, so tests can inspect what the model was shown. If there are
/// no enough steps in the script, an error will be returned.
///
/// Clones share the same script.
///
/// # Note
///
/// This type is not optimized for production use, there are heavy memory
/// copies involved. You should only use it for testing.
#[derive(Clone, Default)]
pub struct TestModelProvider {
    state: Arc<Mutex<ScriptState>>,
    delay: Option<Duration>,
}

impl TestModelProvider {
    /// Appends a response to the script.
    #[inline]
    pub fn add_response(&mut self, preset: PresetResponse) {
        self.lock().script.push_back(preset);
    }

    /// Delays every response by `duration`.
    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }

    /// Returns all requests received so far, including failed attempts.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.lock().requests.clone()
    }

    /// Returns the number of requests received so far.
    pub fn request_count(&self) -> usize {
        self.lock().requests.len()
    }

    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_response(&self, req: &ModelRequest) -> Result<ModelResponse, Error> {
        let mut state = self.lock();
        state.requests.push(req.clone());

        let Some(preset) = state.script.pop_front() else {
            return Err(Error {
                message: "no enough steps",
                kind: ErrorKind::Other,
            });
        };

        let failure = match preset.failures {
            Some(0) => Some(ErrorKind::Other),
            Some(failures) if state.attempts < failures => {
                state.attempts += 1;
                Some(ErrorKind::RateLimitExceeded)
            }
            _ => None,
        };
        if let Some(kind) = failure {
            state.script.push_front(preset);
            return Err(Error {
                message: "preset failure",
                kind,
            });
        }

        state.attempts = 0;
        Ok(make_response(preset))
    }
}

fn make_response(preset: PresetResponse) -> ModelResponse {
    let mut content: Option<String> = None;
    let mut tool_calls = vec![];
    for event in preset.events {
        match event {
            PresetEvent::MessageDelta(delta) => {
                content.get_or_insert_with(String::new).push_str(&delta);
            }
            PresetEvent::ToolCall(req) => tool_calls.push(req),
        }
    }
    let finish_reason = preset.finish_reason.unwrap_or(if tool_calls.is_empty() {
        ModelFinishReason::Stop
    } else {
        ModelFinishReason::ToolCalls
    });
    ModelResponse {
        content,
        tool_calls,
        finish_reason,
    }
}

impl ModelProvider for TestModelProvider {
    type Error = crate::Error;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<ModelResponse, Self::Error>> + Send + 'static
    {
        let result = self.next_response(req);
        let delay = self.delay.unwrap_or(Duration::from_millis(1));
        async move {
            sleep(delay).await;
            result
        }
    }
}

#[cfg(test)]
mod tests {
    use farmhand_model::{ModelMessage, ModelTool};
    use serde_json::json;

    use super::*;

    fn user_request(text: &str) -> ModelRequest {
        ModelRequest {
            messages: vec![ModelMessage::User(text.to_owned())],
            tools: vec![ModelTool {
                name: "list_locations".to_owned(),
                description: "List all locations.".to_owned(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "page": {
                            "type": "integer",
                            "description": "Page number"
                        }
                    },
                    "required": []
                }),
            }],
        }
    }

    #[tokio::test]
    async fn test_send_request() {
        let mut provider = TestModelProvider::default();
        provider.add_response(PresetResponse::with_events([
            PresetEvent::MessageDelta("Let me ".to_owned()),
            PresetEvent::MessageDelta("check.".to_owned()),
            tool_call("call_1", "list_locations", "{}"),
        ]));
        provider.add_response(PresetResponse::with_text("You have 2 fields."));

        let resp = provider
            .send_request(&user_request("Which fields?"))
            .await
            .unwrap();
        assert_eq!(resp.content.as_deref(), Some("Let me check."));
        assert_eq!(resp.finish_reason, ModelFinishReason::ToolCalls);
        assert_eq!(resp.tool_calls[0].name, "list_locations");

        let resp = provider
            .send_request(&user_request("Which fields?"))
            .await
            .unwrap();
        assert_eq!(resp.content.as_deref(), Some("You have 2 fields."));
        assert_eq!(resp.finish_reason, ModelFinishReason::Stop);
        assert!(resp.tool_calls.is_empty());

        assert_eq!(provider.request_count(), 2);
        assert_eq!(provider.requests()[0].tools[0].name, "list_locations");
    }

    #[tokio::test]
    async fn test_exhausted_script() {
        let provider = TestModelProvider::default();
        let err = provider
            .send_request(&user_request("Hi"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);
    }

    #[tokio::test]
    async fn test_failures() {
        let mut provider = TestModelProvider::default();
        provider.add_response(PresetResponse::with_text("ok").with_failures(2));

        for _ in 0..2 {
            let err = provider
                .send_request(&user_request("Hi"))
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::RateLimitExceeded);
        }
        let resp = provider.send_request(&user_request("Hi")).await.unwrap();
        assert_eq!(resp.content.as_deref(), Some("ok"));
        assert_eq!(provider.request_count(), 3);
    }

    #[tokio::test]
    async fn test_infinite_failures() {
        let mut provider = TestModelProvider::default();
        provider.add_response(PresetResponse::with_text("ok").with_failures(0));

        for _ in 0..3 {
            let err = provider
                .send_request(&user_request("Hi"))
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Other);
        }
    }
}
