use std::sync::Arc;

use farmhand_core::tool::ToolRegistryBuilder;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use super::{FarmTool, default_page, default_per_page};
use crate::api::{ApiRequest, Attributes, FarmApi, resource_document};

#[derive(Deserialize, JsonSchema)]
struct ListAssetsInput {
    #[schemars(
        description = "Type of assets - 'animal', 'plant', 'land', 'equipment', 'structure', 'material'"
    )]
    asset_type: String,
    #[schemars(description = "Filter by status ('active', 'archived')")]
    status: Option<String>,
    #[schemars(description = "Page number for pagination")]
    #[serde(default = "default_page")]
    page: u32,
    #[schemars(description = "Items per page (default 50)")]
    #[serde(default = "default_per_page")]
    per_page: u32,
}

#[derive(Deserialize, JsonSchema)]
struct AssetRef {
    #[schemars(
        description = "Type of asset - 'animal', 'plant', 'land', 'equipment', 'structure', 'material'"
    )]
    asset_type: String,
    #[schemars(description = "The asset ID")]
    asset_id: i64,
}

#[derive(Deserialize, JsonSchema)]
struct CreateAssetInput {
    #[schemars(
        description = "Type - 'animal', 'plant', 'land', 'equipment', 'structure', 'material'"
    )]
    asset_type: String,
    #[schemars(description = "Name of the asset")]
    name: String,
    #[schemars(description = "Status ('active' or 'archived')")]
    #[serde(default = "default_status")]
    status: String,
    #[schemars(description = "Additional notes")]
    notes: Option<String>,
    #[schemars(description = "Quantity/count (for herds, flocks, etc.)")]
    quantity: Option<i64>,
    #[schemars(description = "ID of the location where asset is located")]
    current_location_id: Option<i64>,
    #[schemars(description = "Parent asset ID (for hierarchies)")]
    parent_id: Option<i64>,
    #[schemars(description = "GeoJSON geometry coordinates")]
    geometry: Option<Vec<Value>>,
}

#[derive(Deserialize, JsonSchema)]
struct UpdateAssetInput {
    #[schemars(description = "Type of asset")]
    asset_type: String,
    #[schemars(description = "The asset ID to update")]
    asset_id: i64,
    #[schemars(description = "New name (optional)")]
    name: Option<String>,
    #[schemars(description = "New status (optional)")]
    status: Option<String>,
    #[schemars(description = "New notes (optional)")]
    notes: Option<String>,
    #[schemars(description = "New quantity (optional)")]
    quantity: Option<i64>,
    #[schemars(description = "New location ID (optional)")]
    current_location_id: Option<i64>,
}

fn default_status() -> String {
    "active".to_owned()
}

pub(super) fn register(
    builder: &mut ToolRegistryBuilder,
    api: &Arc<dyn FarmApi>,
) {
    builder.add_tool(FarmTool::request(
        "list_assets",
        "List assets of a specific type.",
        api,
        list_assets,
    ));
    builder.add_tool(FarmTool::request(
        "get_asset",
        "Get a single asset by ID.",
        api,
        |input: AssetRef| {
            ApiRequest::get(format!(
                "assets/{}/{}",
                input.asset_type, input.asset_id
            ))
        },
    ));
    builder.add_tool(FarmTool::request(
        "create_asset",
        "Create a new asset.",
        api,
        create_asset,
    ));
    builder.add_tool(FarmTool::request(
        "update_asset",
        "Update an existing asset.",
        api,
        update_asset,
    ));
    builder.add_tool(FarmTool::request(
        "delete_asset",
        "Delete an asset.",
        api,
        |input: AssetRef| {
            ApiRequest::delete(format!(
                "assets/{}/{}",
                input.asset_type, input.asset_id
            ))
        },
    ));
}

fn list_assets(input: ListAssetsInput) -> ApiRequest {
    ApiRequest::get(format!("assets/{}", input.asset_type))
        .param("page", input.page)
        .param("per_page", input.per_page)
        .param_opt("status", input.status)
}

fn create_asset(input: CreateAssetInput) -> ApiRequest {
    let attributes = Attributes::new()
        .set("name", input.name)
        .set("status", input.status)
        .set("asset_type", input.asset_type.clone())
        .set_text("notes", input.notes)
        .set_opt("quantity", input.quantity)
        .set_opt("current_location_id", input.current_location_id)
        .set_opt("parent_id", input.parent_id)
        .set_opt("geometry", input.geometry);
    ApiRequest::post(format!("assets/{}", input.asset_type))
        .json(resource_document("asset", None, attributes))
}

fn update_asset(input: UpdateAssetInput) -> ApiRequest {
    let attributes = Attributes::new()
        .set_opt("name", input.name)
        .set_opt("status", input.status)
        .set_opt("notes", input.notes)
        .set_opt("quantity", input.quantity)
        .set_opt("current_location_id", input.current_location_id);
    ApiRequest::patch(format!("assets/{}/{}", input.asset_type, input.asset_id))
        .json(resource_document("asset", Some(input.asset_id), attributes))
}
