//! A farm management assistant that answers questions by calling the farm
//! REST API through a language model.
//!
//! The crate ships a CLI tool with an HTTP server and a terminal chat. It
//! can also be used as a library to embed the assistant into other hosts.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

pub mod api;
pub mod config;
pub mod server;
mod session;
pub mod tools;

pub use session::{
    AgentSettings, DEFAULT_FARM_API_URL, DEFAULT_SYSTEM_PROMPT, Session,
    SessionBuilder,
};

/// Re-exports of [`farmhand_core`] crate.
pub mod core {
    pub use farmhand_core::*;
}
