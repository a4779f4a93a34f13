//! Relations between tasks: blockers, related tasks and duplicates.

use std::sync::Arc;

use farmhand_core::tool::ToolRegistryBuilder;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Value, json};

use super::FarmTool;
use crate::api::{ApiRequest, Attributes, FarmApi, resource_document};

#[derive(Deserialize, JsonSchema)]
struct BlockerInput {
    #[schemars(description = "The task that is blocked")]
    task_id: i64,
    #[schemars(description = "The task that blocks completion")]
    blocked_by_task_id: i64,
}

#[derive(Deserialize, JsonSchema)]
struct TaskRef {
    #[schemars(description = "The task ID")]
    task_id: i64,
}

#[derive(Deserialize, JsonSchema)]
struct RelatedTaskInput {
    #[schemars(description = "First task")]
    task_id: i64,
    #[schemars(description = "Related task")]
    related_task_id: i64,
}

#[derive(Deserialize, JsonSchema)]
struct DuplicateInput {
    #[schemars(description = "The duplicate task")]
    task_id: i64,
    #[schemars(description = "The original task")]
    duplicate_of_task_id: i64,
}

pub(super) fn register(
    builder: &mut ToolRegistryBuilder,
    api: &Arc<dyn FarmApi>,
) {
    builder.add_tool(FarmTool::request(
        "add_task_blocker",
        r#"
Add a blocking relationship between tasks.
The blocked_by_task_id task will block task_id from being completed."#,
        api,
        |input: BlockerInput| {
            create_relation(input.blocked_by_task_id, input.task_id, "blocks")
        },
    ));
    builder.add_tool(FarmTool::workflow(
        "remove_task_blocker",
        "Remove a blocking relationship between tasks.",
        api,
        |api, input: BlockerInput| Box::pin(remove_task_blocker(api, input)),
    ));
    builder.add_tool(FarmTool::request(
        "get_task_blockers",
        "Get all tasks that block a specific task.",
        api,
        |input: TaskRef| {
            ApiRequest::get("task_relations")
                .param("filter[target_task_id]", input.task_id)
                .param("filter[relation_type]", "blocks")
        },
    ));
    builder.add_tool(FarmTool::request(
        "get_tasks_blocked_by",
        "Get all tasks that are blocked by a specific task.",
        api,
        |input: TaskRef| {
            ApiRequest::get("task_relations")
                .param("filter[source_task_id]", input.task_id)
                .param("filter[relation_type]", "blocks")
        },
    ));
    builder.add_tool(FarmTool::request(
        "add_related_task",
        "Add a 'related' relationship between two tasks.",
        api,
        |input: RelatedTaskInput| {
            create_relation(input.task_id, input.related_task_id, "related")
        },
    ));
    builder.add_tool(FarmTool::request(
        "mark_task_duplicate",
        "Mark a task as a duplicate of another task.",
        api,
        |input: DuplicateInput| {
            create_relation(
                input.task_id,
                input.duplicate_of_task_id,
                "duplicate",
            )
        },
    ));
}

fn create_relation(
    source: i64,
    target: i64,
    relation_type: &str,
) -> ApiRequest {
    let attributes = Attributes::new()
        .set("source_task_id", source)
        .set("target_task_id", target)
        .set("relation_type", relation_type);
    ApiRequest::post("task_relations")
        .json(resource_document("task_relation", None, attributes))
}

/// Looks the relation up by its ends, then deletes the first match.
async fn remove_task_blocker(
    api: Arc<dyn FarmApi>,
    input: BlockerInput,
) -> Value {
    let found = api
        .call(
            ApiRequest::get("task_relations")
                .param("filter[source_task_id]", input.blocked_by_task_id)
                .param("filter[target_task_id]", input.task_id)
                .param("filter[relation_type]", "blocks"),
        )
        .await;
    let relation_id = found
        .resource()
        .and_then(Value::as_array)
        .and_then(|relations| relations.first())
        .and_then(|relation| relation.get("id"))
        .filter(|id| !id.is_null())
        .map(|id| match id {
            Value::String(id) => id.clone(),
            id => id.to_string(),
        });

    match relation_id {
        Some(id) => api
            .call(ApiRequest::delete(format!("task_relations/{id}")))
            .await
            .into_value(),
        None => json!({
            "success": false,
            "error": "Blocking relationship not found",
        }),
    }
}
