//! Tool call supports.

mod error;
mod executor;
mod object;
mod registry;
mod schema;

use serde::de::DeserializeOwned;
use serde_json::Value;

pub use error::{Error, ErrorKind};
pub use executor::Executor;
pub use registry::{RegistryError, ToolRegistry, ToolRegistryBuilder};
pub use schema::{ParamSpec, ParamType, ToolSpec};

/// The result of a tool call.
///
/// A successful result can be any JSON value, it's serialized (and maybe
/// truncated) before being sent back to the model.
pub type ToolResult = Result<Value, Error>;

/// A tool that can be called by the model.
///
/// Implementations of this trait should be stateless, and may not maintain any
/// internal state.
///
/// The tool can be context-aware, meaning it can access shared services like
/// an API client. To do this, make the service an immutable state of the
/// tool, which can be set during initialization, and clone it into the
/// future when executing.
pub trait Tool: Send + Sync + 'static {
    /// The type of input that the tool accepts.
    ///
    /// The model's argument mapping is deserialized into this type, so
    /// missing required fields and wrongly typed values are rejected as
    /// [`ErrorKind::InvalidInput`] before the tool runs.
    type Input: DeserializeOwned;

    /// Returns the name of the tool.
    fn name(&self) -> &str;

    /// Returns the description of the tool.
    ///
    /// Only the first non-blank line is shown to the model.
    fn description(&self) -> &str;

    /// Returns the parameter schema of the tool.
    ///
    /// This is a JSON schema of an object, typically generated from
    /// `Self::Input` with `schemars`. Property types and the `required`
    /// list are normalized when building the registry.
    fn parameter_schema(&self) -> &Value;

    /// Executes the tool with the given input.
    ///
    /// This method must return a future that is fully independent of `self`,
    /// and the future should be cancellation safe.
    fn execute(
        &self,
        input: Self::Input,
    ) -> impl Future<Output = ToolResult> + Send + 'static;
}
