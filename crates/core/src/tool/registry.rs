use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use farmhand_model::ModelTool;
use thiserror::Error;

use super::object::{ToolObject, ToolObjectImpl};
use super::{Tool, ToolSpec};

/// Errors that prevent a registry from being built.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A name appears twice, either in the allow-list or among the tools.
    #[error("tool `{0}` is declared more than once")]
    Duplicate(String),
    /// The allow-list and the registered tools differ.
    #[error(
        "tools don't match the allow-list (missing: {missing:?}, unexpected: {unexpected:?})"
    )]
    Mismatch {
        /// Allowed names without an implementation.
        missing: Vec<String>,
        /// Implemented tools that are not allowed.
        unexpected: Vec<String>,
    },
}

/// [`ToolRegistry`] builder.
pub struct ToolRegistryBuilder {
    allow_list: Vec<String>,
    tools: Vec<Arc<dyn ToolObject>>,
}

impl ToolRegistryBuilder {
    /// Creates a builder with the ordered list of tool names the model may
    /// call.
    pub fn with_allow_list<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allow_list: names.into_iter().map(Into::into).collect(),
            tools: vec![],
        }
    }

    /// Registers a tool.
    #[inline]
    pub fn with_tool<T: Tool>(mut self, tool: T) -> Self {
        self.add_tool(tool);
        self
    }

    /// Registers a tool in place.
    #[inline]
    pub fn add_tool<T: Tool>(&mut self, tool: T) {
        self.tools.push(Arc::new(ToolObjectImpl(tool)));
    }

    /// Validates the tools against the allow-list and builds the registry.
    ///
    /// Tool specs are derived here once and cached for the lifetime of the
    /// registry.
    pub fn build(self) -> Result<ToolRegistry, RegistryError> {
        let mut allowed = HashSet::with_capacity(self.allow_list.len());
        for name in &self.allow_list {
            if !allowed.insert(name.clone()) {
                return Err(RegistryError::Duplicate(name.clone()));
            }
        }

        let mut tools = HashMap::with_capacity(self.tools.len());
        for tool in self.tools {
            let name = tool.name().to_owned();
            if tools.insert(name.clone(), tool).is_some() {
                return Err(RegistryError::Duplicate(name));
            }
        }

        let missing: Vec<_> = self
            .allow_list
            .iter()
            .filter(|name| !tools.contains_key(*name))
            .cloned()
            .collect();
        let mut unexpected: Vec<_> = tools
            .keys()
            .filter(|name| !allowed.contains(*name))
            .cloned()
            .collect();
        if !missing.is_empty() || !unexpected.is_empty() {
            unexpected.sort();
            return Err(RegistryError::Mismatch {
                missing,
                unexpected,
            });
        }

        let specs: Vec<_> = self
            .allow_list
            .iter()
            .filter_map(|name| tools.get(name))
            .map(|tool| {
                ToolSpec::from_schema(
                    tool.name(),
                    tool.description(),
                    tool.parameter_schema(),
                )
            })
            .collect();
        let model_tools = specs.iter().map(ToolSpec::to_model_tool).collect();
        debug!("built tool registry with {} tools", specs.len());

        Ok(ToolRegistry {
            allowed,
            tools,
            specs,
            model_tools,
        })
    }
}

/// The fixed set of tools the model may call.
///
/// The registry is immutable once built, and is meant to be shared by all
/// conversations of the process.
pub struct ToolRegistry {
    allowed: HashSet<String>,
    tools: HashMap<String, Arc<dyn ToolObject>>,
    specs: Vec<ToolSpec>,
    model_tools: Vec<ModelTool>,
}

impl Default for ToolRegistry {
    /// An empty registry, the model can't call any tool.
    fn default() -> Self {
        Self {
            allowed: HashSet::new(),
            tools: HashMap::new(),
            specs: vec![],
            model_tools: vec![],
        }
    }
}

impl ToolRegistry {
    /// Returns the specs of all tools, in allow-list order.
    #[inline]
    pub fn list_tool_specs(&self) -> &[ToolSpec] {
        &self.specs
    }

    /// Returns the tool definitions sent to the model.
    #[inline]
    pub fn model_tools(&self) -> &[ModelTool] {
        &self.model_tools
    }

    /// Returns `true` if the model is allowed to call `name`.
    #[inline]
    pub fn is_allowed(&self, name: &str) -> bool {
        self.allowed.contains(name)
    }

    /// Returns the number of registered tools.
    #[inline]
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Returns `true` if there are no tools.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    #[inline]
    pub(crate) fn get(&self, name: &str) -> Option<&Arc<dyn ToolObject>> {
        self.tools.get(name)
    }
}
