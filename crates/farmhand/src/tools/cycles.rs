use std::sync::Arc;

use farmhand_core::tool::ToolRegistryBuilder;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;

use super::{FarmTool, NoInput, default_page, default_per_page};
use crate::api::{ApiRequest, Attributes, FarmApi, resource_document};

#[derive(Deserialize, JsonSchema)]
struct ListCyclesInput {
    #[schemars(description = "Show only the current cycle")]
    #[serde(default)]
    current: bool,
    #[schemars(description = "Show only past cycles")]
    #[serde(default)]
    past: bool,
    #[schemars(description = "Show only future cycles")]
    #[serde(default)]
    future: bool,
    #[schemars(description = "Page number")]
    #[serde(default = "default_page")]
    page: u32,
    #[schemars(description = "Items per page")]
    #[serde(default = "default_per_page")]
    per_page: u32,
}

#[derive(Deserialize, JsonSchema)]
struct CycleRef {
    #[schemars(description = "The cycle ID")]
    cycle_id: i64,
}

#[derive(Deserialize, JsonSchema)]
struct CreateCycleInput {
    #[schemars(description = "Cycle name (e.g., 'Week 1', 'January Sprint')")]
    name: String,
    #[schemars(
        description = "Cycle start date (ISO format, e.g., '2024-01-01')"
    )]
    start_date: String,
    #[schemars(description = "Cycle end date (ISO format, e.g., '2024-01-07')")]
    end_date: String,
}

#[derive(Deserialize, JsonSchema)]
struct GenerateCyclesInput {
    #[schemars(description = "Start date for first cycle (ISO format)")]
    start_date: String,
    #[schemars(description = "Number of cycles to generate")]
    count: u32,
    #[schemars(
        description = "Duration of each cycle in days (default: 7 for weekly)"
    )]
    #[serde(default = "default_duration_days")]
    duration_days: u32,
}

#[derive(Deserialize, JsonSchema)]
struct UpdateCycleInput {
    #[schemars(description = "The cycle ID to update")]
    cycle_id: i64,
    #[schemars(description = "New name")]
    name: Option<String>,
    #[schemars(description = "New start date (ISO format)")]
    start_date: Option<String>,
    #[schemars(description = "New end date (ISO format)")]
    end_date: Option<String>,
}

fn default_duration_days() -> u32 {
    7
}

pub(super) fn register(
    builder: &mut ToolRegistryBuilder,
    api: &Arc<dyn FarmApi>,
) {
    builder.add_tool(FarmTool::request(
        "list_cycles",
        "List cycles (time periods for task scheduling).",
        api,
        |input: ListCyclesInput| {
            ApiRequest::get("cycles")
                .param("page", input.page)
                .param("per_page", input.per_page)
                .flag("filter[current]", input.current)
                .flag("filter[past]", input.past)
                .flag("filter[future]", input.future)
        },
    ));
    builder.add_tool(FarmTool::request(
        "get_cycle",
        "Get a single cycle by ID with task counts and progress.",
        api,
        |input: CycleRef| {
            ApiRequest::get(format!("cycles/{}", input.cycle_id))
        },
    ));
    builder.add_tool(FarmTool::request(
        "get_current_cycle",
        r#"
Get the current active cycle based on today's date.
Returns the cycle where today falls between start_date and end_date."#,
        api,
        |_: NoInput| ApiRequest::get("cycles/current"),
    ));
    builder.add_tool(FarmTool::request(
        "create_cycle",
        "Create a new cycle.",
        api,
        |input: CreateCycleInput| {
            let attributes = Attributes::new()
                .set("name", input.name)
                .set("start_date", input.start_date)
                .set("end_date", input.end_date);
            ApiRequest::post("cycles")
                .json(resource_document("cycle", None, attributes))
        },
    ));
    builder.add_tool(FarmTool::request(
        "generate_cycles",
        "Generate multiple consecutive cycles (e.g., for sprint planning).",
        api,
        |input: GenerateCyclesInput| {
            // Not a JSON:API document.
            ApiRequest::post("cycles/generate").json(json!({
                "start_date": input.start_date,
                "count": input.count,
                "duration_days": input.duration_days,
            }))
        },
    ));
    builder.add_tool(FarmTool::request(
        "update_cycle",
        "Update an existing cycle.",
        api,
        |input: UpdateCycleInput| {
            let attributes = Attributes::new()
                .set_opt("name", input.name)
                .set_opt("start_date", input.start_date)
                .set_opt("end_date", input.end_date);
            ApiRequest::patch(format!("cycles/{}", input.cycle_id)).json(
                resource_document("cycle", Some(input.cycle_id), attributes),
            )
        },
    ));
    builder.add_tool(FarmTool::request(
        "delete_cycle",
        "Delete a cycle.",
        api,
        |input: CycleRef| {
            ApiRequest::delete(format!("cycles/{}", input.cycle_id))
        },
    ));
}
