use std::sync::Arc;

use farmhand_core::tool::ToolRegistryBuilder;

use super::{FarmTool, NoInput};
use crate::api::{ApiRequest, FarmApi};

pub(super) fn register(
    builder: &mut ToolRegistryBuilder,
    api: &Arc<dyn FarmApi>,
) {
    builder.add_tool(FarmTool::request(
        "get_api_info",
        r#"
Get information about the farmAPI including all available endpoints.
Use this first to understand what resources and operations are available."#,
        api,
        |_: NoInput| ApiRequest::get(""),
    ));
    builder.add_tool(FarmTool::request(
        "get_schema",
        "Fetch the farmAPI schema showing available resource types and their structure.",
        api,
        |_: NoInput| ApiRequest::get("schema"),
    ));
}
