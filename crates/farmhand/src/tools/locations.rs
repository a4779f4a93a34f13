use std::sync::Arc;

use farmhand_core::tool::ToolRegistryBuilder;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use super::{FarmTool, default_page, default_per_page};
use crate::api::{ApiRequest, Attributes, FarmApi, resource_document};

#[derive(Deserialize, JsonSchema)]
struct ListLocationsInput {
    #[schemars(description = "Page number")]
    #[serde(default = "default_page")]
    page: u32,
    #[schemars(description = "Items per page")]
    #[serde(default = "default_per_page")]
    per_page: u32,
}

#[derive(Deserialize, JsonSchema)]
struct LocationRef {
    #[schemars(description = "The location ID")]
    location_id: i64,
}

#[derive(Deserialize, JsonSchema)]
struct CreateLocationInput {
    #[schemars(
        description = "Name of the location (e.g., 'North Pasture', 'Barn')"
    )]
    name: String,
    #[schemars(description = "Type - 'polygon', 'point', 'line'")]
    #[serde(default = "default_location_type")]
    location_type: String,
    #[schemars(
        description = "List of coordinate dicts with 'latitude' and 'longitude'"
    )]
    geometry: Option<Vec<Value>>,
    #[schemars(description = "Additional notes")]
    notes: Option<String>,
    #[schemars(description = "Parent location ID for hierarchy")]
    parent_id: Option<i64>,
}

#[derive(Deserialize, JsonSchema)]
struct UpdateLocationInput {
    #[schemars(description = "The location ID to update")]
    location_id: i64,
    #[schemars(description = "New name (optional)")]
    name: Option<String>,
    #[schemars(description = "New geometry coordinates (optional)")]
    geometry: Option<Vec<Value>>,
    #[schemars(description = "New notes (optional)")]
    notes: Option<String>,
    #[schemars(description = "New parent location ID (optional)")]
    parent_id: Option<i64>,
}

fn default_location_type() -> String {
    "polygon".to_owned()
}

pub(super) fn register(
    builder: &mut ToolRegistryBuilder,
    api: &Arc<dyn FarmApi>,
) {
    builder.add_tool(FarmTool::request(
        "list_locations",
        "List all farm locations with their geometry, asset counts, and hierarchy.",
        api,
        |input: ListLocationsInput| {
            ApiRequest::get("locations")
                .param("page", input.page)
                .param("per_page", input.per_page)
        },
    ));
    builder.add_tool(FarmTool::request(
        "get_location",
        "Get a single location by ID with full details including assets and movements.",
        api,
        |input: LocationRef| {
            ApiRequest::get(format!("locations/{}", input.location_id))
        },
    ));
    builder.add_tool(FarmTool::request(
        "create_location",
        "Create a new farm location.",
        api,
        create_location,
    ));
    builder.add_tool(FarmTool::request(
        "update_location",
        "Update an existing location.",
        api,
        update_location,
    ));
}

fn create_location(input: CreateLocationInput) -> ApiRequest {
    let attributes = Attributes::new()
        .set("name", input.name)
        .set("location_type", input.location_type)
        .set_opt("geometry", input.geometry)
        .set_text("notes", input.notes)
        .set_opt("parent_id", input.parent_id);
    ApiRequest::post("locations")
        .json(resource_document("location", None, attributes))
}

fn update_location(input: UpdateLocationInput) -> ApiRequest {
    let attributes = Attributes::new()
        .set_opt("name", input.name)
        .set_opt("geometry", input.geometry)
        .set_opt("notes", input.notes)
        .set_opt("parent_id", input.parent_id);
    ApiRequest::patch(format!("locations/{}", input.location_id)).json(
        resource_document("location", Some(input.location_id), attributes),
    )
}
