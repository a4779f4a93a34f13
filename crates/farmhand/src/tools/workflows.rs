//! Convenience tools that combine several API calls.

use std::sync::Arc;

use farmhand_core::tool::ToolRegistryBuilder;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use super::knowledge::{CreateFactInput, create_fact};
use super::logs::{CreateLogInput, create_log};
use super::{FarmTool, NoInput, numeric_id};
use crate::api::{ApiRequest, Attributes, FarmApi, resource_document};

const SUMMARY_ASSET_TYPES: [&str; 4] =
    ["animal", "plant", "land", "equipment"];

#[derive(Deserialize, JsonSchema)]
struct MoveAssetInput {
    #[schemars(description = "The asset to move")]
    asset_id: i64,
    #[schemars(description = "Destination location ID")]
    to_location_id: i64,
    #[schemars(
        description = "Type of asset (animal, plant, equipment, etc.). Defaults to animal."
    )]
    #[serde(default = "default_asset_type")]
    asset_type: String,
    #[schemars(
        description = "Source location ID (optional, will be inferred from asset's current location)"
    )]
    from_location_id: Option<i64>,
    #[schemars(description = "Movement notes")]
    notes: Option<String>,
}

#[derive(Deserialize, JsonSchema)]
struct RecordObservationInput {
    #[schemars(description = "The asset being observed")]
    asset_id: i64,
    #[schemars(
        description = "What's being observed (e.g., 'weight', 'health_status', 'body_condition_score')"
    )]
    predicate_name: String,
    #[schemars(description = "The observed value")]
    value: f64,
    #[schemars(description = "Unit of measurement")]
    unit: Option<String>,
    #[schemars(description = "Observation notes")]
    notes: Option<String>,
}

fn default_asset_type() -> String {
    "animal".to_owned()
}

pub(super) fn register(
    builder: &mut ToolRegistryBuilder,
    api: &Arc<dyn FarmApi>,
) {
    builder.add_tool(FarmTool::workflow(
        "move_asset",
        "Move an asset to a new location by creating a movement log.",
        api,
        |api, input: MoveAssetInput| Box::pin(move_asset(api, input)),
    ));
    builder.add_tool(FarmTool::workflow(
        "record_observation",
        "Record an observation about an asset (creates both a log and a fact).",
        api,
        |api, input: RecordObservationInput| {
            Box::pin(record_observation(api, input))
        },
    ));
    builder.add_tool(FarmTool::workflow(
        "get_farm_summary",
        "Get a summary of the farm including counts of assets, locations, and recent activity.",
        api,
        |api, _: NoInput| Box::pin(get_farm_summary(api)),
    ));
}

/// Validates both ends, records a movement log, then points the asset at
/// its new location.
async fn move_asset(api: Arc<dyn FarmApi>, input: MoveAssetInput) -> Value {
    let to = input.to_location_id;
    let location = api.call(ApiRequest::get(format!("locations/{to}"))).await;
    if !location.success {
        return json!({
            "success": false,
            "error": format!(
                "Location {to} not found. Please use list_locations() to see available locations."
            ),
            "error_code": "LOCATION_NOT_FOUND",
            "available_action": "Call list_locations() to get valid location IDs",
        });
    }

    let asset_path = format!("assets/{}/{}", input.asset_type, input.asset_id);
    let asset = api.call(ApiRequest::get(asset_path.clone())).await;
    if !asset.success {
        return json!({
            "success": false,
            "error": format!(
                "Asset {} of type '{}' not found.",
                input.asset_id, input.asset_type
            ),
            "error_code": "ASSET_NOT_FOUND",
            "available_action": format!(
                "Call list_assets(asset_type='{}') to get valid asset IDs",
                input.asset_type
            ),
        });
    }

    let from_location_id = input.from_location_id.or_else(|| {
        asset
            .resource()
            .and_then(|data| data.pointer("/attributes/current_location_id"))
            .and_then(numeric_id)
    });
    let log = api
        .call(create_log(CreateLogInput {
            log_type: "movement".to_owned(),
            name: format!("Move asset {}", input.asset_id),
            status: "done".to_owned(),
            notes: input.notes,
            timestamp: None,
            asset_ids: Some(vec![input.asset_id]),
            from_location_id,
            to_location_id: Some(to),
        }))
        .await;
    if !log.success {
        return log.into_value();
    }

    let attributes = Attributes::new().set("current_location_id", to);
    let update = api
        .call(ApiRequest::patch(asset_path).json(resource_document(
            "asset",
            Some(input.asset_id),
            attributes,
        )))
        .await;
    info!(asset_id = input.asset_id, to, "asset moved");
    json!({
        "success": true,
        "log": log.into_value(),
        "asset_update": update.into_value(),
    })
}

async fn record_observation(
    api: Arc<dyn FarmApi>,
    input: RecordObservationInput,
) -> Value {
    let log = api
        .call(create_log(CreateLogInput {
            log_type: "observation".to_owned(),
            name: format!("Observation: {}", input.predicate_name),
            status: "done".to_owned(),
            notes: input.notes,
            timestamp: None,
            asset_ids: Some(vec![input.asset_id]),
            from_location_id: None,
            to_location_id: None,
        }))
        .await;
    let log_id = log.resource_id().and_then(numeric_id);

    let fact = api
        .call(create_fact(CreateFactInput {
            subject_id: input.asset_id,
            predicate_name: input.predicate_name,
            value_numeric: Some(input.value),
            unit: input.unit,
            object_id: None,
            observed_at: None,
            log_id,
        }))
        .await;
    json!({
        "success": true,
        "log": log.into_value(),
        "fact": fact.into_value(),
    })
}

async fn get_farm_summary(api: Arc<dyn FarmApi>) -> Value {
    let mut summary = Map::new();

    for asset_type in SUMMARY_ASSET_TYPES {
        let resp = api
            .call(ApiRequest::get(format!("assets/{asset_type}")))
            .await;
        let Some(doc) = resp.document() else {
            continue;
        };
        let assets: Vec<Value> = items(doc)
            .map(|asset| {
                json!({
                    "id": asset["id"],
                    "name": asset["attributes"]["name"],
                    "status": asset["attributes"]["status"],
                })
            })
            .collect();
        summary.insert(format!("{asset_type}_count"), total(doc));
        summary.insert(format!("{asset_type}s"), Value::Array(assets));
    }

    let resp = api.call(ApiRequest::get("locations")).await;
    if let Some(doc) = resp.document() {
        let locations: Vec<Value> = items(doc)
            .map(|location| {
                let attributes = &location["attributes"];
                let asset_count =
                    attributes.get("asset_count").cloned().unwrap_or(json!(0));
                json!({
                    "id": location["id"],
                    "name": attributes["name"],
                    "area_acres": attributes["area_in_acres"],
                    "asset_count": asset_count,
                })
            })
            .collect();
        summary.insert("location_count".to_owned(), json!(locations.len()));
        summary.insert("locations".to_owned(), Value::Array(locations));
    }

    let resp = api.call(ApiRequest::get("predicates")).await;
    if let Some(doc) = resp.document() {
        summary.insert("predicate_count".to_owned(), total(doc));
    }
    let resp = api.call(ApiRequest::get("facts")).await;
    if let Some(doc) = resp.document() {
        summary.insert("fact_count".to_owned(), total(doc));
    }

    json!({"success": true, "summary": summary})
}

fn items(doc: &Value) -> impl Iterator<Item = &Value> {
    doc.get("data")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

fn total(doc: &Value) -> Value {
    doc.pointer("/meta/total").cloned().unwrap_or(json!(0))
}
