//! Conversation-related types.

use farmhand_model::ModelMessage;
use serde::{Deserialize, Serialize};

/// The default number of prior messages admitted into a turn.
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

/// The author of a history message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user.
    User,
    /// The assistant.
    Assistant,
    /// Instructions.
    System,
}

/// A message from an earlier turn of the conversation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HistoryMessage {
    /// Who wrote the message.
    pub role: Role,
    /// The message text.
    pub content: String,
}

impl HistoryMessage {
    /// Creates a user message.
    #[inline]
    pub fn user<S: Into<String>>(content: S) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Creates an assistant message.
    #[inline]
    pub fn assistant<S: Into<String>>(content: S) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    fn to_model_message(&self) -> ModelMessage {
        match self.role {
            Role::User => ModelMessage::User(self.content.clone()),
            Role::Assistant => ModelMessage::assistant_text(&self.content),
            Role::System => ModelMessage::System(self.content.clone()),
        }
    }
}

/// A record the user is looking at while chatting.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ConversationContext {
    /// Kind of the record, like `task` or `asset`.
    pub resource_type: String,
    /// Identifier of the record.
    pub resource_id: i64,
    /// A markdown rendering of the record.
    pub snapshot: String,
}

impl ConversationContext {
    fn render(&self) -> String {
        format!(
            "\n\n## Current Context\n\
             The user is currently viewing {kind} #{id}. Its current state:\n\n\
             {snapshot}\n\n\
             Prefer this context when answering questions about this {kind}. \
             You may still use tools to look up related records or to make \
             changes.",
            kind = self.resource_type,
            id = self.resource_id,
            snapshot = self.snapshot.trim(),
        )
    }
}

/// The input of one conversation turn.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChatInput {
    /// The new user message.
    pub message: String,
    /// Prior messages, oldest first.
    pub history: Vec<HistoryMessage>,
    /// The record the user is looking at, if any.
    pub context: Option<ConversationContext>,
}

impl ChatInput {
    /// Creates an input with only a user message.
    #[inline]
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    /// Sets the prior messages.
    #[inline]
    pub fn with_history(mut self, history: Vec<HistoryMessage>) -> Self {
        self.history = history;
        self
    }

    /// Sets the context record.
    #[inline]
    pub fn with_context(mut self, context: ConversationContext) -> Self {
        self.context = Some(context);
        self
    }
}

/// Assembles the messages a turn starts with: the system prompt (plus the
/// context section), the most recent `history_limit` history messages and
/// the new user message.
pub(crate) fn initial_messages(
    system_prompt: &str,
    input: &ChatInput,
    history_limit: usize,
) -> Vec<ModelMessage> {
    let mut system = system_prompt.to_owned();
    if let Some(context) = &input.context {
        system.push_str(&context.render());
    }

    let skipped = input.history.len().saturating_sub(history_limit);
    if skipped > 0 {
        debug!("dropping {skipped} old history messages");
    }

    let mut messages = Vec::with_capacity(input.history.len() - skipped + 2);
    messages.push(ModelMessage::System(system));
    messages.extend(
        input.history[skipped..]
            .iter()
            .map(HistoryMessage::to_model_message),
    );
    messages.push(ModelMessage::User(input.message.clone()));
    messages
}
