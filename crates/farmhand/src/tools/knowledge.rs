//! Predicates, facts and quantities.

use std::sync::Arc;

use farmhand_core::tool::ToolRegistryBuilder;
use schemars::JsonSchema;
use serde::Deserialize;

use super::{
    FarmTool, NoInput, default_page, default_per_page, now_timestamp,
};
use crate::api::{ApiRequest, Attributes, FarmApi, resource_document};

#[derive(Deserialize, JsonSchema)]
struct PredicateRef {
    #[schemars(description = "The predicate UUID")]
    predicate_id: String,
}

#[derive(Deserialize, JsonSchema)]
struct ListFactsInput {
    #[schemars(description = "Filter by subject asset ID")]
    subject_id: Option<i64>,
    #[schemars(
        description = "Filter by predicate name (e.g., 'yield', 'grazes', 'weight')"
    )]
    predicate_name: Option<String>,
    #[schemars(description = "Page number")]
    #[serde(default = "default_page")]
    page: u32,
    #[schemars(description = "Items per page")]
    #[serde(default = "default_per_page")]
    per_page: u32,
}

#[derive(Deserialize, JsonSchema)]
struct FactRef {
    #[schemars(description = "The fact UUID")]
    fact_id: String,
}

#[derive(Deserialize, JsonSchema)]
pub(super) struct CreateFactInput {
    #[schemars(description = "The asset ID that is the subject of the fact")]
    pub subject_id: i64,
    #[schemars(
        description = "Name of the predicate (e.g., 'yield', 'weight', 'health_status')"
    )]
    pub predicate_name: String,
    #[schemars(description = "Numeric value for measurements")]
    pub value_numeric: Option<f64>,
    #[schemars(description = "Unit of measurement")]
    pub unit: Option<String>,
    #[schemars(description = "Object asset/location ID for relations")]
    pub object_id: Option<i64>,
    #[schemars(description = "ISO timestamp when observed (defaults to now)")]
    pub observed_at: Option<String>,
    #[schemars(description = "Associated log ID")]
    pub log_id: Option<i64>,
}

#[derive(Deserialize, JsonSchema)]
struct ListQuantitiesInput {
    #[schemars(description = "Filter by associated log ID")]
    log_id: Option<i64>,
}

#[derive(Deserialize, JsonSchema)]
struct CreateQuantityInput {
    #[schemars(description = "The log ID to associate with")]
    log_id: i64,
    #[schemars(description = "Numeric value")]
    value: f64,
    #[schemars(description = "Unit of measurement")]
    unit: String,
    #[schemars(description = "Type - 'count', 'weight', 'volume', 'harvest'")]
    #[serde(default = "default_quantity_type")]
    quantity_type: String,
    #[schemars(description = "Optional label")]
    label: Option<String>,
    #[schemars(description = "Measurement type")]
    measure: Option<String>,
}

fn default_quantity_type() -> String {
    "count".to_owned()
}

pub(super) fn register(
    builder: &mut ToolRegistryBuilder,
    api: &Arc<dyn FarmApi>,
) {
    builder.add_tool(FarmTool::request(
        "list_predicates",
        r#"
List all predicates (vocabulary terms) that define the types of facts that can be recorded.
Predicates include: yield, grazes, weight, milk_yield, health_status, body_condition_score, etc."#,
        api,
        |_: NoInput| ApiRequest::get("predicates"),
    ));
    builder.add_tool(FarmTool::request(
        "get_predicate",
        "Get details of a specific predicate.",
        api,
        |input: PredicateRef| {
            ApiRequest::get(format!("predicates/{}", input.predicate_id))
        },
    ));
    builder.add_tool(FarmTool::request(
        "list_facts",
        r#"
List facts from the semantic knowledge graph.
Facts record observations like 'Laying Hens yield 25 eggs'."#,
        api,
        |input: ListFactsInput| {
            ApiRequest::get("facts")
                .param("page", input.page)
                .param("per_page", input.per_page)
                .param_opt("subject_id", input.subject_id)
                .param_opt("predicate", input.predicate_name)
        },
    ));
    builder.add_tool(FarmTool::request(
        "get_fact",
        "Get a single fact by ID.",
        api,
        |input: FactRef| ApiRequest::get(format!("facts/{}", input.fact_id)),
    ));
    builder.add_tool(FarmTool::request(
        "create_fact",
        "Create a new fact in the knowledge graph.",
        api,
        create_fact,
    ));
    builder.add_tool(FarmTool::request(
        "list_quantities",
        "List quantities, optionally filtered by log.",
        api,
        |input: ListQuantitiesInput| {
            ApiRequest::get("quantities").param_opt("log_id", input.log_id)
        },
    ));
    builder.add_tool(FarmTool::request(
        "create_quantity",
        "Create a quantity record associated with a log.",
        api,
        create_quantity,
    ));
}

pub(super) fn create_fact(input: CreateFactInput) -> ApiRequest {
    let observed_at = input
        .observed_at
        .filter(|observed_at| !observed_at.is_empty())
        .unwrap_or_else(now_timestamp);
    let attributes = Attributes::new()
        .set("subject_id", input.subject_id)
        .set("predicate_name", input.predicate_name)
        .set("observed_at", observed_at)
        .set_opt("value_numeric", input.value_numeric)
        .set_text("unit", input.unit)
        .set_opt("object_id", input.object_id)
        .set_opt("log_id", input.log_id);
    ApiRequest::post("facts").json(resource_document("fact", None, attributes))
}

fn create_quantity(input: CreateQuantityInput) -> ApiRequest {
    let attributes = Attributes::new()
        .set("log_id", input.log_id)
        .set("value", input.value)
        .set("unit", input.unit)
        .set("quantity_type", input.quantity_type)
        .set_text("label", input.label)
        .set_text("measure", input.measure);
    ApiRequest::post("quantities")
        .json(resource_document("quantity", None, attributes))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::tools::testing::*;

    #[tokio::test]
    async fn test_list_facts_filters() {
        let req = single_request(
            "list_facts",
            json!({"subject_id": 3, "predicate_name": "yield"}),
        )
        .await;
        assert_eq!(req.endpoint, "facts");
        assert_eq!(
            params(&req),
            [
                ("page", "1"),
                ("per_page", "50"),
                ("subject_id", "3"),
                ("predicate", "yield")
            ]
        );
    }

    #[tokio::test]
    async fn test_get_predicate_by_uuid() {
        let req = single_request(
            "get_predicate",
            json!({"predicate_id": "0b7e6c2a-weight"}),
        )
        .await;
        assert_eq!(req.endpoint, "predicates/0b7e6c2a-weight");
    }

    #[tokio::test]
    async fn test_create_fact() {
        let req = single_request(
            "create_fact",
            json!({
                "subject_id": 4,
                "predicate_name": "weight",
                "value_numeric": 512.5,
                "unit": "kg",
                "observed_at": "2024-06-01T07:30:00"
            }),
        )
        .await;
        assert_eq!(req.endpoint, "facts");
        assert_eq!(
            req.body.unwrap()["data"]["attributes"],
            json!({
                "subject_id": 4,
                "predicate_name": "weight",
                "observed_at": "2024-06-01T07:30:00",
                "value_numeric": 512.5,
                "unit": "kg"
            })
        );
    }

    #[tokio::test]
    async fn test_quantities() {
        let req = single_request("list_quantities", json!({})).await;
        assert!(req.params.is_empty());

        let req = single_request(
            "create_quantity",
            json!({"log_id": 31, "value": 12, "unit": "egg"}),
        )
        .await;
        assert_eq!(
            req.body.unwrap()["data"]["attributes"],
            json!({
                "log_id": 31,
                "value": 12.0,
                "unit": "egg",
                "quantity_type": "count"
            })
        );
    }
}
