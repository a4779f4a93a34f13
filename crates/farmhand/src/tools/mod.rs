//! The tools the model can use to read and change the farm.
//!
//! Almost every tool maps its input to exactly one API request. A few
//! convenience tools run short workflows of several requests.

mod assets;
mod cycles;
mod discovery;
mod knowledge;
mod locations;
mod logs;
mod plans;
mod relations;
mod tasks;
mod workflows;

use std::pin::Pin;
use std::sync::Arc;

use farmhand_core::tool::{
    RegistryError, Tool, ToolRegistry, ToolRegistryBuilder, ToolResult,
};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::api::{ApiRequest, FarmApi};

/// The tools the model may call, in the order they are presented.
pub const TOOL_NAMES: [&str; 56] = [
    // Discovery
    "get_api_info",
    "get_schema",
    // Assets
    "list_assets",
    "get_asset",
    "create_asset",
    "update_asset",
    "delete_asset",
    // Logs
    "list_logs",
    "get_log",
    "create_log",
    "create_harvest_log",
    "update_log",
    // Locations
    "list_locations",
    "get_location",
    "create_location",
    "update_location",
    // Vocabulary and knowledge graph
    "list_predicates",
    "get_predicate",
    "list_facts",
    "get_fact",
    "create_fact",
    "list_quantities",
    "create_quantity",
    // Workflows
    "move_asset",
    "record_observation",
    "get_farm_summary",
    // Tasks
    "list_tasks",
    "get_task",
    "create_task",
    "update_task",
    "delete_task",
    "complete_task",
    "get_my_tasks",
    "get_overdue_tasks",
    "get_blocked_tasks",
    "move_task_to_plan",
    "schedule_task_to_cycle",
    // Plans
    "list_plans",
    "get_plan",
    "get_plan_children",
    "create_plan",
    "update_plan",
    "delete_plan",
    // Cycles
    "list_cycles",
    "get_cycle",
    "get_current_cycle",
    "create_cycle",
    "generate_cycles",
    "update_cycle",
    "delete_cycle",
    // Task relations
    "add_task_blocker",
    "remove_task_blocker",
    "get_task_blockers",
    "get_tasks_blocked_by",
    "add_related_task",
    "mark_task_duplicate",
];

/// Builds the registry of all farm tools, backed by `api`.
pub fn farm_registry(
    api: Arc<dyn FarmApi>,
) -> Result<ToolRegistry, RegistryError> {
    let mut builder = ToolRegistryBuilder::with_allow_list(TOOL_NAMES);
    discovery::register(&mut builder, &api);
    assets::register(&mut builder, &api);
    logs::register(&mut builder, &api);
    locations::register(&mut builder, &api);
    knowledge::register(&mut builder, &api);
    workflows::register(&mut builder, &api);
    tasks::register(&mut builder, &api);
    plans::register(&mut builder, &api);
    cycles::register(&mut builder, &api);
    relations::register(&mut builder, &api);
    builder.build()
}

type BoxFuture = Pin<Box<dyn Future<Output = Value> + Send>>;

enum Action<I> {
    Request(fn(I) -> ApiRequest),
    Workflow(fn(Arc<dyn FarmApi>, I) -> BoxFuture),
}

/// A farm tool, with its input described by `I`.
struct FarmTool<I> {
    name: &'static str,
    description: &'static str,
    parameter_schema: Value,
    api: Arc<dyn FarmApi>,
    action: Action<I>,
}

impl<I: JsonSchema> FarmTool<I> {
    /// A tool that sends the request built from its input.
    fn request(
        name: &'static str,
        description: &'static str,
        api: &Arc<dyn FarmApi>,
        build: fn(I) -> ApiRequest,
    ) -> Self {
        Self::with_action(name, description, api, Action::Request(build))
    }

    /// A tool that runs a workflow against the API.
    fn workflow(
        name: &'static str,
        description: &'static str,
        api: &Arc<dyn FarmApi>,
        run: fn(Arc<dyn FarmApi>, I) -> BoxFuture,
    ) -> Self {
        Self::with_action(name, description, api, Action::Workflow(run))
    }

    fn with_action(
        name: &'static str,
        description: &'static str,
        api: &Arc<dyn FarmApi>,
        action: Action<I>,
    ) -> Self {
        Self {
            name,
            description,
            parameter_schema: schema_for!(I).to_value(),
            api: Arc::clone(api),
            action,
        }
    }
}

impl<I> Tool for FarmTool<I>
where
    I: DeserializeOwned + 'static,
{
    type Input = I;

    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: I,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let api = Arc::clone(&self.api);
        let fut: BoxFuture = match &self.action {
            Action::Request(build) => {
                let request = build(input);
                Box::pin(async move { api.call(request).await.into_value() })
            }
            Action::Workflow(run) => run(api, input),
        };
        async move { ToolResult::Ok(fut.await) }
    }
}

/// Input of tools that take no parameters.
#[derive(Deserialize, JsonSchema)]
struct NoInput {}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    50
}

/// Maps the `-1` sentinel to `null`, for clearing a reference.
fn nullable_id(id: i64) -> Value {
    if id == -1 { Value::Null } else { Value::from(id) }
}

/// Reads a resource id, which the API may send as a string or a number.
fn numeric_id(id: &Value) -> Option<i64> {
    match id {
        Value::Number(id) => id.as_i64(),
        Value::String(id) => id.parse().ok(),
        _ => None,
    }
}

/// The current time as an ISO 8601 timestamp, in UTC.
fn now_timestamp() -> String {
    chrono::Utc::now()
        .naive_utc()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use farmhand_core::tool::Executor;
    use serde_json::{Value, json};

    use super::*;
    use crate::api::ApiResponse;

    /// Records requests and answers them from a queue, falling back to an
    /// empty success.
    #[derive(Default)]
    pub(crate) struct RecordingApi {
        requests: Mutex<Vec<ApiRequest>>,
        responses: Mutex<VecDeque<ApiResponse>>,
    }

    impl RecordingApi {
        pub(crate) fn with_responses(
            responses: impl IntoIterator<Item = ApiResponse>,
        ) -> Self {
            Self {
                requests: Mutex::default(),
                responses: Mutex::new(responses.into_iter().collect()),
            }
        }

        pub(crate) fn requests(&self) -> Vec<ApiRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl FarmApi for RecordingApi {
        async fn call(&self, request: ApiRequest) -> ApiResponse {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| ApiResponse::success(200, json!({})))
        }
    }

    /// Runs one tool against `api`, returning its result.
    pub(crate) async fn run_tool(
        api: &Arc<RecordingApi>,
        name: &str,
        arguments: Value,
    ) -> Value {
        let registry = farm_registry(Arc::clone(api) as Arc<dyn FarmApi>)
            .unwrap();
        Executor::new(Arc::new(registry))
            .execute(name, arguments)
            .await
            .unwrap()
    }

    /// Runs one tool that sends exactly one request, returning it.
    pub(crate) async fn single_request(
        name: &str,
        arguments: Value,
    ) -> ApiRequest {
        let api = Arc::new(RecordingApi::default());
        run_tool(&api, name, arguments).await;
        let mut requests = api.requests();
        assert_eq!(requests.len(), 1, "{name} sent {requests:?}");
        requests.remove(0)
    }

    pub(crate) fn params(request: &ApiRequest) -> Vec<(&str, &str)> {
        request
            .params
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect()
    }
}
