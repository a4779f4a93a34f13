use std::sync::Arc;

use farmhand_model::ModelProvider;

use super::{Agent, AgentInner};
use crate::conversation::DEFAULT_HISTORY_LIMIT;
use crate::model_client::{ModelClient, RetryPolicy};
use crate::tool::{Executor, ToolRegistry};
use crate::truncate::{DEFAULT_MAX_LENGTH, MIN_MAX_LENGTH};

/// The default number of model rounds in one turn.
pub const DEFAULT_MAX_ROUNDS: usize = 10;

/// [`Agent`] builder.
pub struct AgentBuilder {
    model_client: ModelClient,
    system_prompt: String,
    tool_registry: Option<Arc<ToolRegistry>>,
    history_limit: usize,
    max_rounds: usize,
    max_result_length: usize,
}

impl AgentBuilder {
    /// Creates a new builder with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self {
            model_client: ModelClient::new(provider),
            system_prompt: String::new(),
            tool_registry: None,
            history_limit: DEFAULT_HISTORY_LIMIT,
            max_rounds: DEFAULT_MAX_ROUNDS,
            max_result_length: DEFAULT_MAX_LENGTH,
        }
    }

    /// Sets the system prompt.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Sets the tools the model may call.
    #[inline]
    pub fn with_tool_registry(mut self, registry: Arc<ToolRegistry>) -> Self {
        self.tool_registry = Some(registry);
        self
    }

    /// Sets how many prior messages are admitted into a turn.
    #[inline]
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Sets the maximum number of model requests in one turn. At least one
    /// request is always made.
    #[inline]
    pub fn with_max_rounds(mut self, rounds: usize) -> Self {
        self.max_rounds = rounds.max(1);
        self
    }

    /// Sets the size budget of a tool result sent back to the model.
    /// Budgets below [`MIN_MAX_LENGTH`] are raised to it.
    #[inline]
    pub fn with_max_result_length(mut self, length: usize) -> Self {
        self.max_result_length = length.max(MIN_MAX_LENGTH);
        self
    }

    /// Sets how rate-limited model requests are retried.
    #[inline]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.model_client.set_retry_policy(policy);
        self
    }

    /// Builds the agent.
    pub fn build(self) -> Agent {
        let registry = self.tool_registry.unwrap_or_default();
        Agent {
            inner: Arc::new(AgentInner {
                model_client: self.model_client,
                executor: Executor::new(registry),
                system_prompt: self.system_prompt,
                history_limit: self.history_limit,
                max_rounds: self.max_rounds,
                max_result_length: self.max_result_length,
            }),
        }
    }
}
