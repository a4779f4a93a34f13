//! An abstraction layer for different LLMs.
//!
//! This crate establishes an unified protocol for the assistant to talk to
//! any supported chat-completion backend, so that the conversation driver
//! can switch between them without modifying the core codebase.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to.

#![deny(missing_docs)]

mod error;
mod provider;
mod request;
mod response;

pub use error::*;
pub use provider::*;
pub use request::*;
pub use response::*;
