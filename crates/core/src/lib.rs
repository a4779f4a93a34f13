//! Core logic of the assistant: the tool protocol, tool execution, result
//! truncation and the conversation loop that drives a model to completion.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod agent;
pub mod conversation;
mod model_client;
pub mod tool;
pub mod truncate;

pub use agent::{
    Agent, AgentBuilder, ChatFinish, ChatOutcome, DEFAULT_MAX_ROUNDS, Error,
    ToolCallRecord,
};
pub use model_client::RetryPolicy;
