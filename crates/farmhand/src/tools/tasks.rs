use std::sync::Arc;

use farmhand_core::tool::ToolRegistryBuilder;
use schemars::JsonSchema;
use serde::Deserialize;

use super::{FarmTool, NoInput, default_page, default_per_page, nullable_id};
use crate::api::{ApiRequest, Attributes, FarmApi, resource_document};

#[derive(Deserialize, JsonSchema)]
struct ListTasksInput {
    #[schemars(
        description = "Filter by state - 'backlog', 'todo', 'in_progress', 'done', 'cancelled'"
    )]
    state: Option<String>,
    #[schemars(description = "Filter by plan ID")]
    plan_id: Option<i64>,
    #[schemars(description = "Filter by cycle ID")]
    cycle_id: Option<i64>,
    #[schemars(description = "Filter by parent task ID (for subtasks)")]
    parent_id: Option<i64>,
    #[schemars(description = "Show only tasks without a cycle")]
    #[serde(default)]
    unscheduled: bool,
    #[schemars(description = "Show only active tasks (todo or in_progress)")]
    #[serde(default)]
    active: bool,
    #[schemars(description = "Show only completed tasks")]
    #[serde(default)]
    completed: bool,
    #[schemars(description = "Show only blocked tasks")]
    #[serde(default)]
    blocked: bool,
    #[schemars(description = "Show only overdue tasks")]
    #[serde(default)]
    overdue: bool,
    #[schemars(description = "Page number")]
    #[serde(default = "default_page")]
    page: u32,
    #[schemars(description = "Items per page")]
    #[serde(default = "default_per_page")]
    per_page: u32,
}

#[derive(Deserialize, JsonSchema)]
struct TaskRef {
    #[schemars(description = "The task ID")]
    task_id: i64,
}

#[derive(Deserialize, JsonSchema)]
struct CreateTaskInput {
    #[schemars(description = "Task title (required)")]
    title: String,
    #[schemars(description = "Plan ID to assign task to (required)")]
    plan_id: i64,
    #[schemars(description = "Task description")]
    description: Option<String>,
    #[schemars(
        description = "Initial state - 'backlog', 'todo', 'in_progress', 'done', 'cancelled' (default: backlog)"
    )]
    #[serde(default = "default_state")]
    state: String,
    #[schemars(description = "Time estimate in minutes")]
    estimate: Option<i64>,
    #[schemars(description = "Target completion date (ISO format)")]
    target_date: Option<String>,
    #[schemars(description = "Cycle to schedule task in")]
    cycle_id: Option<i64>,
    #[schemars(description = "Parent task ID (for subtasks)")]
    parent_id: Option<i64>,
    #[schemars(description = "List of related asset IDs")]
    asset_ids: Option<Vec<i64>>,
    #[schemars(description = "List of related location IDs")]
    location_ids: Option<Vec<i64>>,
}

#[derive(Default, Deserialize, JsonSchema)]
struct UpdateTaskInput {
    #[schemars(description = "The task ID to update")]
    task_id: i64,
    #[schemars(description = "New title")]
    title: Option<String>,
    #[schemars(description = "New description")]
    description: Option<String>,
    #[schemars(
        description = "New state - 'backlog', 'todo', 'in_progress', 'done', 'cancelled'"
    )]
    state: Option<String>,
    #[schemars(description = "New time estimate in minutes")]
    estimate: Option<i64>,
    #[schemars(description = "New target date (ISO format)")]
    target_date: Option<String>,
    #[schemars(
        description = "New plan ID (tasks must always belong to a plan)"
    )]
    plan_id: Option<i64>,
    #[schemars(description = "New cycle ID (use -1 to remove from cycle)")]
    cycle_id: Option<i64>,
    #[schemars(description = "New parent task ID (use -1 to make root task)")]
    parent_id: Option<i64>,
}

#[derive(Deserialize, JsonSchema)]
struct MyTasksInput {
    #[schemars(
        description = "Optional cycle ID to filter by (defaults to all active tasks)"
    )]
    cycle_id: Option<i64>,
}

#[derive(Deserialize, JsonSchema)]
struct MoveTaskToPlanInput {
    #[schemars(description = "The task ID")]
    task_id: i64,
    #[schemars(description = "The plan ID to move to")]
    plan_id: i64,
}

#[derive(Deserialize, JsonSchema)]
struct ScheduleTaskInput {
    #[schemars(description = "The task ID")]
    task_id: i64,
    #[schemars(
        description = "The cycle ID to schedule in (None to unschedule)"
    )]
    cycle_id: Option<i64>,
}

fn default_state() -> String {
    "backlog".to_owned()
}

pub(super) fn register(
    builder: &mut ToolRegistryBuilder,
    api: &Arc<dyn FarmApi>,
) {
    builder.add_tool(FarmTool::request(
        "list_tasks",
        "List tasks with various filters.",
        api,
        list_tasks,
    ));
    builder.add_tool(FarmTool::request(
        "get_task",
        "Get a single task by ID with full details.",
        api,
        |input: TaskRef| ApiRequest::get(format!("tasks/{}", input.task_id)),
    ));
    builder.add_tool(FarmTool::request(
        "create_task",
        "Create a new task. Every task must belong to a plan.",
        api,
        create_task,
    ));
    builder.add_tool(FarmTool::request(
        "update_task",
        "Update an existing task.",
        api,
        update_task,
    ));
    builder.add_tool(FarmTool::request(
        "delete_task",
        "Delete a task.",
        api,
        |input: TaskRef| {
            ApiRequest::delete(format!("tasks/{}", input.task_id))
        },
    ));
    builder.add_tool(FarmTool::request(
        "complete_task",
        "Mark a task as completed (convenience method).",
        api,
        |input: TaskRef| {
            update_task(UpdateTaskInput {
                task_id: input.task_id,
                state: Some("done".to_owned()),
                ..Default::default()
            })
        },
    ));
    builder.add_tool(FarmTool::request(
        "get_my_tasks",
        r#"
Get active tasks (todo or in_progress), optionally filtered by cycle.
Use this to see what tasks need attention."#,
        api,
        |input: MyTasksInput| {
            ApiRequest::get("tasks")
                .flag("filter[active]", true)
                .param_opt("filter[cycle_id]", input.cycle_id)
        },
    ));
    builder.add_tool(FarmTool::request(
        "get_overdue_tasks",
        "Get all tasks that are past their target date but not completed.",
        api,
        |_: NoInput| ApiRequest::get("tasks").flag("filter[overdue]", true),
    ));
    builder.add_tool(FarmTool::request(
        "get_blocked_tasks",
        "Get all tasks that are blocked by other incomplete tasks.",
        api,
        |_: NoInput| ApiRequest::get("tasks").flag("filter[blocked]", true),
    ));
    builder.add_tool(FarmTool::request(
        "move_task_to_plan",
        "Move a task to a different plan.",
        api,
        |input: MoveTaskToPlanInput| {
            update_task(UpdateTaskInput {
                task_id: input.task_id,
                plan_id: Some(input.plan_id),
                ..Default::default()
            })
        },
    ));
    builder.add_tool(FarmTool::request(
        "schedule_task_to_cycle",
        "Schedule a task to a cycle (or unschedule).",
        api,
        |input: ScheduleTaskInput| {
            update_task(UpdateTaskInput {
                task_id: input.task_id,
                cycle_id: Some(input.cycle_id.unwrap_or(-1)),
                ..Default::default()
            })
        },
    ));
}

fn list_tasks(input: ListTasksInput) -> ApiRequest {
    ApiRequest::get("tasks")
        .param("page", input.page)
        .param("per_page", input.per_page)
        .param_opt("filter[state]", input.state)
        .param_opt("filter[plan_id]", input.plan_id)
        .param_opt("filter[cycle_id]", input.cycle_id)
        .param_opt("filter[parent_id]", input.parent_id)
        .flag("filter[unscheduled]", input.unscheduled)
        .flag("filter[active]", input.active)
        .flag("filter[completed]", input.completed)
        .flag("filter[blocked]", input.blocked)
        .flag("filter[overdue]", input.overdue)
}

fn create_task(input: CreateTaskInput) -> ApiRequest {
    let attributes = Attributes::new()
        .set("title", input.title)
        .set("state", input.state)
        .set("plan_id", input.plan_id)
        .set_text("description", input.description)
        .set_opt("estimate", input.estimate)
        .set_text("target_date", input.target_date)
        .set_opt("cycle_id", input.cycle_id)
        .set_opt("parent_id", input.parent_id)
        .set_list("asset_ids", input.asset_ids)
        .set_list("location_ids", input.location_ids);
    ApiRequest::post("tasks").json(resource_document("task", None, attributes))
}

/// Builds a partial update. A cycle or parent of `-1` is sent as `null`,
/// which clears it.
fn update_task(input: UpdateTaskInput) -> ApiRequest {
    let attributes = Attributes::new()
        .set_opt("title", input.title)
        .set_opt("description", input.description)
        .set_opt("state", input.state)
        .set_opt("estimate", input.estimate)
        .set_opt("target_date", input.target_date)
        .set_opt("plan_id", input.plan_id)
        .set_opt("cycle_id", input.cycle_id.map(nullable_id))
        .set_opt("parent_id", input.parent_id.map(nullable_id));
    ApiRequest::patch(format!("tasks/{}", input.task_id))
        .json(resource_document("task", Some(input.task_id), attributes))
}
