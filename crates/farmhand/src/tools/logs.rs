use std::sync::Arc;

use farmhand_core::tool::ToolRegistryBuilder;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{
    FarmTool, default_page, default_per_page, now_timestamp, numeric_id,
};
use crate::api::{ApiRequest, Attributes, FarmApi, resource_document};

#[derive(Deserialize, JsonSchema)]
struct ListLogsInput {
    #[schemars(
        description = "Type of logs - 'activity', 'harvest', 'observation', 'input', 'maintenance'"
    )]
    log_type: String,
    #[schemars(description = "Filter by status ('pending', 'done')")]
    status: Option<String>,
    #[schemars(description = "Page number")]
    #[serde(default = "default_page")]
    page: u32,
    #[schemars(description = "Items per page")]
    #[serde(default = "default_per_page")]
    per_page: u32,
}

#[derive(Deserialize, JsonSchema)]
struct LogRef {
    #[schemars(description = "Type of log")]
    log_type: String,
    #[schemars(description = "The log ID")]
    log_id: i64,
}

#[derive(Deserialize, JsonSchema)]
pub(super) struct CreateLogInput {
    #[schemars(
        description = "Type - 'activity', 'harvest', 'observation', 'input', 'maintenance', 'movement'"
    )]
    pub log_type: String,
    #[schemars(description = "Name/description of the log")]
    pub name: String,
    #[schemars(description = "Status ('pending' or 'done')")]
    #[serde(default = "default_status")]
    pub status: String,
    #[schemars(description = "Additional notes")]
    pub notes: Option<String>,
    #[schemars(description = "ISO format timestamp (defaults to now)")]
    pub timestamp: Option<String>,
    #[schemars(description = "List of related asset IDs")]
    pub asset_ids: Option<Vec<i64>>,
    #[schemars(description = "Source location ID (for movement logs)")]
    pub from_location_id: Option<i64>,
    #[schemars(description = "Destination location ID (for movement logs)")]
    pub to_location_id: Option<i64>,
}

#[derive(Deserialize, JsonSchema)]
struct CreateHarvestLogInput {
    #[schemars(
        description = "Name of the harvest (e.g., 'Morning egg collection')"
    )]
    name: String,
    #[schemars(description = "Amount harvested")]
    quantity_value: f64,
    #[schemars(
        description = "Unit of measurement (e.g., 'egg', 'kg', 'lbs', 'bushels')"
    )]
    quantity_unit: String,
    #[schemars(description = "List of source asset IDs (e.g., flock ID)")]
    asset_ids: Option<Vec<i64>>,
    #[schemars(description = "Additional notes")]
    notes: Option<String>,
    #[schemars(description = "ISO timestamp (defaults to now)")]
    timestamp: Option<String>,
}

#[derive(Deserialize, JsonSchema)]
struct UpdateLogInput {
    #[schemars(description = "Type of log")]
    log_type: String,
    #[schemars(description = "The log ID to update")]
    log_id: i64,
    #[schemars(description = "New name (optional)")]
    name: Option<String>,
    #[schemars(description = "New status - 'pending' or 'done' (optional)")]
    status: Option<String>,
    #[schemars(description = "New notes (optional)")]
    notes: Option<String>,
}

fn default_status() -> String {
    "pending".to_owned()
}

pub(super) fn register(
    builder: &mut ToolRegistryBuilder,
    api: &Arc<dyn FarmApi>,
) {
    builder.add_tool(FarmTool::request(
        "list_logs",
        "List logs of a specific type.",
        api,
        |input: ListLogsInput| {
            ApiRequest::get(format!("logs/{}", input.log_type))
                .param("page", input.page)
                .param("per_page", input.per_page)
                .param_opt("status", input.status)
        },
    ));
    builder.add_tool(FarmTool::request(
        "get_log",
        "Get a single log by ID.",
        api,
        |input: LogRef| {
            ApiRequest::get(format!("logs/{}/{}", input.log_type, input.log_id))
        },
    ));
    builder.add_tool(FarmTool::request(
        "create_log",
        "Create a new log entry.",
        api,
        create_log,
    ));
    builder.add_tool(FarmTool::workflow(
        "create_harvest_log",
        "Create a harvest log with quantity tracking. This triggers fact emission for yields.",
        api,
        |api, input: CreateHarvestLogInput| {
            Box::pin(create_harvest_log(api, input))
        },
    ));
    builder.add_tool(FarmTool::request(
        "update_log",
        "Update an existing log.",
        api,
        update_log,
    ));
}

/// Builds the request creating a log. Related assets are sent as JSON:API
/// relationships.
pub(super) fn create_log(input: CreateLogInput) -> ApiRequest {
    let timestamp = input
        .timestamp
        .filter(|timestamp| !timestamp.is_empty())
        .unwrap_or_else(now_timestamp);
    let attributes = Attributes::new()
        .set("name", input.name)
        .set("status", input.status)
        .set("log_type", input.log_type.clone())
        .set("timestamp", timestamp)
        .set_text("notes", input.notes)
        .set_opt("from_location_id", input.from_location_id)
        .set_opt("to_location_id", input.to_location_id);

    let mut doc = resource_document("log", None, attributes);
    if let Some(asset_ids) = input.asset_ids.filter(|ids| !ids.is_empty()) {
        let assets: Vec<Value> = asset_ids
            .iter()
            .map(|id| json!({"type": "asset", "id": id.to_string()}))
            .collect();
        if let Some(data) =
            doc.get_mut("data").and_then(Value::as_object_mut)
        {
            data.insert(
                "relationships".to_owned(),
                json!({ "assets": { "data": assets } }),
            );
        }
    }
    ApiRequest::post(format!("logs/{}", input.log_type)).json(doc)
}

fn update_log(input: UpdateLogInput) -> ApiRequest {
    let attributes = Attributes::new()
        .set_opt("name", input.name)
        .set_opt("status", input.status)
        .set_opt("notes", input.notes);
    ApiRequest::patch(format!("logs/{}/{}", input.log_type, input.log_id))
        .json(resource_document("log", Some(input.log_id), attributes))
}

/// Creates a pending harvest log, attaches the harvested quantity, then
/// marks the log done so the backend emits yield facts.
async fn create_harvest_log(
    api: Arc<dyn FarmApi>,
    input: CreateHarvestLogInput,
) -> Value {
    let created = api
        .call(create_log(CreateLogInput {
            log_type: "harvest".to_owned(),
            name: input.name,
            status: "pending".to_owned(),
            notes: input.notes,
            timestamp: input.timestamp,
            asset_ids: input.asset_ids,
            from_location_id: None,
            to_location_id: None,
        }))
        .await;
    let Some(log_id) = created.resource_id().and_then(numeric_id) else {
        return created.into_value();
    };

    let quantity = Attributes::new()
        .set("value", input.quantity_value)
        .set("unit", input.quantity_unit)
        .set("quantity_type", "harvest")
        .set("log_id", log_id);
    let added = api
        .call(
            ApiRequest::post("quantities")
                .json(resource_document("quantity", None, quantity)),
        )
        .await;
    if !added.success {
        warn!(log_id, error = ?added.error, "failed to add harvest quantity");
    }

    let done = Attributes::new().set("status", "done");
    api.call(
        ApiRequest::patch(format!("logs/harvest/{log_id}"))
            .json(resource_document("log", Some(log_id), done)),
    )
    .await
    .into_value()
}
