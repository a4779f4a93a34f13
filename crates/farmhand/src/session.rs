use std::sync::Arc;

use farmhand_core::conversation::ChatInput;
use farmhand_core::tool::{RegistryError, ToolSpec};
use farmhand_core::{Agent, AgentBuilder, ChatOutcome, RetryPolicy};
use farmhand_model::ModelProvider;

use crate::api::{FarmApi, HttpFarmApi};
use crate::tools::farm_registry;

/// The farm API a session talks to when none is given.
pub const DEFAULT_FARM_API_URL: &str = "http://localhost:3005/api/v1";

/// Instructions for the farm assistant.
pub const DEFAULT_SYSTEM_PROMPT: &str = include_str!("./system_prompt.md");

/// Limits of a conversation turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AgentSettings {
    /// How many prior messages are admitted into a turn.
    pub history_limit: usize,
    /// How many model requests one turn may make.
    pub max_rounds: usize,
    /// The size budget of a tool result sent back to the model.
    pub max_result_length: usize,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            history_limit: farmhand_core::conversation::DEFAULT_HISTORY_LIMIT,
            max_rounds: farmhand_core::DEFAULT_MAX_ROUNDS,
            max_result_length: farmhand_core::truncate::DEFAULT_MAX_LENGTH,
        }
    }
}

/// A session builder.
///
/// See [`Session`].
pub struct SessionBuilder {
    agent_builder: AgentBuilder,
    farm_api: Option<Arc<dyn FarmApi>>,
    system_prompt: String,
    settings: AgentSettings,
}

impl SessionBuilder {
    /// Creates a session builder with a specified model provider.
    pub fn with_model_provider<M: ModelProvider + 'static>(
        provider: M,
    ) -> Self {
        Self {
            agent_builder: AgentBuilder::with_model_provider(provider),
            farm_api: None,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_owned(),
            settings: AgentSettings::default(),
        }
    }

    /// Sets the farm API the tools call. Defaults to an HTTP client of
    /// [`DEFAULT_FARM_API_URL`].
    #[inline]
    pub fn with_farm_api(mut self, api: Arc<dyn FarmApi>) -> Self {
        self.farm_api = Some(api);
        self
    }

    /// Sets the system prompt for the agent.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Sets the limits of each turn.
    #[inline]
    pub fn with_agent_settings(mut self, settings: AgentSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Sets how rate-limited model requests are retried.
    #[inline]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.agent_builder = self.agent_builder.with_retry_policy(policy);
        self
    }

    /// Builds a new session with every farm tool registered.
    pub fn build(self) -> Result<Session, RegistryError> {
        let farm_api: Arc<dyn FarmApi> = match self.farm_api {
            Some(api) => api,
            None => Arc::new(HttpFarmApi::new(DEFAULT_FARM_API_URL)),
        };
        let registry = farm_registry(farm_api)?;
        debug!(tools = registry.len(), "farm tools registered");

        let settings = self.settings;
        let agent = self
            .agent_builder
            .with_system_prompt(self.system_prompt)
            .with_tool_registry(Arc::new(registry))
            .with_history_limit(settings.history_limit)
            .with_max_rounds(settings.max_rounds)
            .with_max_result_length(settings.max_result_length)
            .build();

        Ok(Session { agent })
    }
}

/// A farm assistant, ready to chat.
///
/// The session is basically a wrapper around [`Agent`]. It keeps no
/// conversation state, callers pass the history with every message. Clones
/// share the same agent.
#[derive(Clone)]
pub struct Session {
    agent: Agent,
}

impl Session {
    /// Answers one user message, calling farm tools as needed.
    #[inline]
    pub async fn chat(
        &self,
        input: ChatInput,
    ) -> Result<ChatOutcome, farmhand_core::Error> {
        self.agent.chat(input).await
    }

    /// Returns the specs of the tools the assistant may call.
    #[inline]
    pub fn tool_specs(&self) -> &[ToolSpec] {
        self.agent.tool_registry().list_tool_specs()
    }
}

#[cfg(test)]
mod tests {
    use farmhand_core::ChatFinish;
    use farmhand_model::ModelMessage;
    use farmhand_test_model::{PresetResponse, TestModelProvider, tool_call};
    use serde_json::json;

    use super::*;
    use crate::api::ApiResponse;
    use crate::tools::TOOL_NAMES;
    use crate::tools::testing::RecordingApi;

    #[test]
    fn test_default_session_has_all_tools() {
        let session = SessionBuilder::with_model_provider(
            TestModelProvider::default(),
        )
        .build()
        .unwrap();
        let names: Vec<_> =
            session.tool_specs().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, TOOL_NAMES);
    }

    #[tokio::test]
    async fn test_chat_calls_farm_tools() {
        let mut provider = TestModelProvider::default();
        provider.add_response(PresetResponse::with_events([tool_call(
            "call_1",
            "list_locations",
            r#"{"per_page": 10}"#,
        )]));
        provider.add_response(PresetResponse::with_text(
            "You have one paddock.",
        ));
        let api = Arc::new(RecordingApi::with_responses([
            ApiResponse::success(
                200,
                json!({"data": [{"id": "1", "type": "location"}]}),
            ),
        ]));

        let session = SessionBuilder::with_model_provider(provider.clone())
            .with_farm_api(api.clone())
            .with_system_prompt("Be brief.")
            .build()
            .unwrap();
        let outcome = session
            .chat(ChatInput::new("What locations do I have?"))
            .await
            .unwrap();

        assert_eq!(outcome.message, "You have one paddock.");
        assert_eq!(outcome.finish, ChatFinish::Completed);
        assert_eq!(outcome.tool_calls.len(), 1);
        assert_eq!(outcome.tool_calls[0].name(), "list_locations");
        assert_eq!(api.requests()[0].endpoint, "locations");

        let requests = provider.requests();
        assert_eq!(
            requests[0].messages[0],
            ModelMessage::System("Be brief.".to_owned())
        );
    }

    #[tokio::test]
    async fn test_round_budget_is_applied() {
        let mut provider = TestModelProvider::default();
        for i in 0..3 {
            provider.add_response(PresetResponse::with_events([tool_call(
                &format!("call_{i}"),
                "get_schema",
                "{}",
            )]));
        }
        let session = SessionBuilder::with_model_provider(provider.clone())
            .with_farm_api(Arc::new(RecordingApi::default()))
            .with_agent_settings(AgentSettings {
                max_rounds: 2,
                ..Default::default()
            })
            .build()
            .unwrap();

        let outcome = session.chat(ChatInput::new("loop")).await.unwrap();
        assert_eq!(outcome.finish, ChatFinish::RoundLimitExceeded);
        assert_eq!(provider.request_count(), 2);
    }
}
