use std::sync::Arc;

use serde_json::{Map, Value};

use super::{Error, ToolRegistry, ToolResult};

/// An executor that runs tool calls requested by the model.
///
/// Each call is attempted exactly once. A tool that panics is reported as
/// an execution error instead of bringing the conversation down.
#[derive(Clone)]
pub struct Executor {
    registry: Arc<ToolRegistry>,
}

impl Executor {
    /// Creates an executor over the given registry.
    #[inline]
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    /// Returns the underlying registry.
    #[inline]
    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Executes the tool `name` with the argument mapping.
    ///
    /// `null` arguments are treated as an empty mapping.
    pub async fn execute(&self, name: &str, arguments: Value) -> ToolResult {
        if !self.registry.is_allowed(name) {
            warn!("model requested an unknown tool: {name}");
            return Err(Error::unknown_tool(name));
        }
        let Some(tool) = self.registry.get(name) else {
            return Err(Error::unknown_tool(name));
        };

        let arguments = match arguments {
            Value::Null => Value::Object(Map::new()),
            Value::Object(_) => arguments,
            other => {
                return Err(Error::invalid_input().with_reason(format!(
                    "expected an argument mapping, got `{other}`"
                )));
            }
        };

        trace!("executing {name} with args: {arguments}");
        let fut = Arc::clone(tool).execute(arguments);
        match tokio::spawn(fut).await {
            Ok(result) => result,
            Err(err) if err.is_panic() => {
                error!("tool {name} panicked");
                Err(Error::execution_error().with_reason("the tool panicked"))
            }
            Err(_) => Err(Error::execution_error()
                .with_reason("the tool was cancelled")),
        }
    }
}
