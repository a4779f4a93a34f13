//! Normalizes tool parameter schemas into the shape the model expects.

use std::fmt::{self, Display};

use farmhand_model::ModelTool;
use serde::Serialize;
use serde_json::{Map, Value, json};

/// The JSON type of a tool parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    /// A whole number.
    Integer,
    /// A floating point number.
    Number,
    /// `true` or `false`.
    Boolean,
    /// Text. Also used when the declared type is unknown.
    String,
    /// A list. Items are always described as objects.
    Array,
    /// A nested mapping.
    Object,
}

impl ParamType {
    fn from_json_type(ty: &str) -> Option<Self> {
        match ty {
            "integer" => Some(Self::Integer),
            "number" => Some(Self::Number),
            "boolean" => Some(Self::Boolean),
            "string" => Some(Self::String),
            "array" => Some(Self::Array),
            "object" => Some(Self::Object),
            _ => None,
        }
    }

    /// Returns the JSON schema name of this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::String => "string",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

impl Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single parameter of a tool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ParamSpec {
    /// Parameter name.
    pub name: String,
    /// Parameter type.
    #[serde(rename = "type")]
    pub ty: ParamType,
    /// Free-text description, empty if none.
    pub description: String,
    /// Whether the parameter has no default value.
    pub required: bool,
}

/// The declarative description of a tool, as shown to the model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ToolSpec {
    /// The tool name.
    pub name: String,
    /// One-line summary of the tool.
    pub description: String,
    /// Parameters in declaration order.
    pub parameters: Vec<ParamSpec>,
}

impl ToolSpec {
    /// Derives a spec from a tool's name, documentation and parameter
    /// schema.
    ///
    /// The parameter type is the first non-null type declared for the
    /// property, falling back to `string`. A parameter is required iff the
    /// schema lists it in `required`.
    pub fn from_schema(name: &str, documentation: &str, schema: &Value) -> Self {
        let description = documentation
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| format!("Execute {name}"));

        let required: Vec<&str> = schema
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let parameters = schema
            .get("properties")
            .and_then(Value::as_object)
            .map(|properties| {
                properties
                    .iter()
                    .map(|(param, property)| ParamSpec {
                        name: param.clone(),
                        ty: property_type(property),
                        description: property
                            .get("description")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_owned(),
                        required: required.contains(&param.as_str()),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            name: name.to_owned(),
            description,
            parameters,
        }
    }

    /// Renders the parameters as a JSON schema object.
    pub fn parameters_schema(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.parameters {
            let mut property = Map::new();
            property.insert("type".to_owned(), json!(param.ty.as_str()));
            property.insert("description".to_owned(), json!(param.description));
            if param.ty == ParamType::Array {
                property.insert("items".to_owned(), json!({ "type": "object" }));
            }
            properties.insert(param.name.clone(), Value::Object(property));
        }
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|param| param.required)
            .map(|param| param.name.as_str())
            .collect();
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Converts the spec into a tool definition for the model.
    pub fn to_model_tool(&self) -> ModelTool {
        ModelTool {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.parameters_schema(),
        }
    }
}

fn property_type(property: &Value) -> ParamType {
    let declared = match property.get("type") {
        Some(Value::String(ty)) => ParamType::from_json_type(ty),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .filter(|ty| *ty != "null")
            .find_map(ParamType::from_json_type),
        _ => None,
    };
    if let Some(ty) = declared {
        return ty;
    }

    // Nullable references come out as `anyOf: [{$ref}, {type: null}]`.
    let variants = property
        .get("anyOf")
        .or_else(|| property.get("oneOf"))
        .and_then(Value::as_array);
    if let Some(variants) = variants {
        let non_null = variants.iter().find(|variant| {
            variant.get("type").and_then(Value::as_str) != Some("null")
        });
        if let Some(variant) = non_null {
            return property_type(variant);
        }
    }
    if property.get("$ref").is_some() {
        return ParamType::Object;
    }
    ParamType::String
}
