use std::sync::Arc;

use farmhand_core::tool::ToolRegistryBuilder;
use schemars::JsonSchema;
use serde::Deserialize;

use super::{FarmTool, default_page, default_per_page, nullable_id};
use crate::api::{ApiRequest, Attributes, FarmApi, resource_document};

#[derive(Deserialize, JsonSchema)]
struct ListPlansInput {
    #[schemars(
        description = "Filter by status - 'planned', 'active', 'completed', 'cancelled'"
    )]
    status: Option<String>,
    #[schemars(description = "Show only active plans")]
    #[serde(default)]
    in_progress: bool,
    #[schemars(description = "Show only root-level plans (no parent)")]
    #[serde(default)]
    root_only: bool,
    #[schemars(description = "Filter by parent plan ID (for child plans)")]
    parent_id: Option<i64>,
    #[schemars(description = "Page number")]
    #[serde(default = "default_page")]
    page: u32,
    #[schemars(description = "Items per page")]
    #[serde(default = "default_per_page")]
    per_page: u32,
}

#[derive(Deserialize, JsonSchema)]
struct PlanRef {
    #[schemars(description = "The plan ID")]
    plan_id: i64,
}

#[derive(Deserialize, JsonSchema)]
struct CreatePlanInput {
    #[schemars(description = "Plan name (required)")]
    name: String,
    #[schemars(description = "Plan description")]
    description: Option<String>,
    #[schemars(
        description = "Initial status - 'planned', 'active', 'completed', 'cancelled' (default: planned)"
    )]
    #[serde(default = "default_status")]
    status: String,
    #[schemars(description = "Plan start date (ISO format)")]
    start_date: Option<String>,
    #[schemars(description = "Target completion date (ISO format)")]
    target_date: Option<String>,
    #[schemars(description = "Parent plan ID (for nested plans)")]
    parent_id: Option<i64>,
}

#[derive(Deserialize, JsonSchema)]
struct UpdatePlanInput {
    #[schemars(description = "The plan ID to update")]
    plan_id: i64,
    #[schemars(description = "New name")]
    name: Option<String>,
    #[schemars(description = "New description")]
    description: Option<String>,
    #[schemars(
        description = "New status - 'planned', 'active', 'completed', 'cancelled'"
    )]
    status: Option<String>,
    #[schemars(description = "New start date (ISO format)")]
    start_date: Option<String>,
    #[schemars(description = "New target date (ISO format)")]
    target_date: Option<String>,
    #[schemars(description = "New parent plan ID (use -1 to make root plan)")]
    parent_id: Option<i64>,
}

fn default_status() -> String {
    "planned".to_owned()
}

pub(super) fn register(
    builder: &mut ToolRegistryBuilder,
    api: &Arc<dyn FarmApi>,
) {
    builder.add_tool(FarmTool::request(
        "list_plans",
        "List plans with optional filters. Plans are recursive - they can contain other plans.",
        api,
        |input: ListPlansInput| {
            ApiRequest::get("plans")
                .param("page", input.page)
                .param("per_page", input.per_page)
                .param_opt("filter[status]", input.status)
                .flag("filter[in_progress]", input.in_progress)
                .flag("filter[root_only]", input.root_only)
                .param_opt("filter[parent_id]", input.parent_id)
        },
    ));
    builder.add_tool(FarmTool::request(
        "get_plan",
        "Get a single plan by ID with task counts and progress.",
        api,
        |input: PlanRef| ApiRequest::get(format!("plans/{}", input.plan_id)),
    ));
    builder.add_tool(FarmTool::request(
        "get_plan_children",
        "Get all child plans of a specific plan.",
        api,
        |input: PlanRef| {
            ApiRequest::get("plans").param("filter[parent_id]", input.plan_id)
        },
    ));
    builder.add_tool(FarmTool::request(
        "create_plan",
        "Create a new plan. Plans can be nested within other plans.",
        api,
        create_plan,
    ));
    builder.add_tool(FarmTool::request(
        "update_plan",
        "Update an existing plan.",
        api,
        update_plan,
    ));
    builder.add_tool(FarmTool::request(
        "delete_plan",
        "Delete a plan.",
        api,
        |input: PlanRef| {
            ApiRequest::delete(format!("plans/{}", input.plan_id))
        },
    ));
}

fn create_plan(input: CreatePlanInput) -> ApiRequest {
    let attributes = Attributes::new()
        .set("name", input.name)
        .set("status", input.status)
        .set_text("description", input.description)
        .set_text("start_date", input.start_date)
        .set_text("target_date", input.target_date)
        .set_opt("parent_id", input.parent_id);
    ApiRequest::post("plans").json(resource_document("plan", None, attributes))
}

fn update_plan(input: UpdatePlanInput) -> ApiRequest {
    let attributes = Attributes::new()
        .set_opt("name", input.name)
        .set_opt("description", input.description)
        .set_opt("status", input.status)
        .set_opt("start_date", input.start_date)
        .set_opt("target_date", input.target_date)
        .set_opt("parent_id", input.parent_id.map(nullable_id));
    ApiRequest::patch(format!("plans/{}", input.plan_id))
        .json(resource_document("plan", Some(input.plan_id), attributes))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::api::ApiMethod;
    use crate::tools::testing::*;

    #[tokio::test]
    async fn test_list_plans() {
        let req = single_request(
            "list_plans",
            json!({"root_only": true, "status": "active"}),
        )
        .await;
        assert_eq!(
            params(&req),
            [
                ("page", "1"),
                ("per_page", "50"),
                ("filter[status]", "active"),
                ("filter[root_only]", "true")
            ]
        );

        let req = single_request("get_plan_children", json!({"plan_id": 3}))
            .await;
        assert_eq!(req.endpoint, "plans");
        assert_eq!(params(&req), [("filter[parent_id]", "3")]);
    }

    #[tokio::test]
    async fn test_create_plan() {
        let req = single_request(
            "create_plan",
            json!({"name": "Spring planting", "target_date": "2024-05-31"}),
        )
        .await;
        assert_eq!(req.method, ApiMethod::Post);
        assert_eq!(
            req.body.unwrap()["data"]["attributes"],
            json!({
                "name": "Spring planting",
                "status": "planned",
                "target_date": "2024-05-31"
            })
        );
    }

    #[tokio::test]
    async fn test_update_plan_to_root() {
        let req = single_request(
            "update_plan",
            json!({"plan_id": 5, "parent_id": -1}),
        )
        .await;
        assert_eq!(req.endpoint, "plans/5");
        assert_eq!(
            req.body.unwrap()["data"]["attributes"],
            json!({"parent_id": null})
        );
    }
}
