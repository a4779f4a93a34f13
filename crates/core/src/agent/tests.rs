use std::future::ready;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use farmhand_model::{ErrorKind, ModelFinishReason, ModelMessage};
use farmhand_test_model::{
    PresetEvent, PresetResponse, TestModelProvider, tool_call,
};
use serde_json::{Value, json};

use crate::conversation::{ChatInput, ConversationContext, HistoryMessage};
use crate::tool::{Error as ToolError, Tool, ToolRegistryBuilder, ToolResult};
use crate::truncate::MIN_MAX_LENGTH;
use crate::{AgentBuilder, ChatFinish, Error, RetryPolicy};

type CallLog = Arc<Mutex<Vec<(String, Value)>>>;

static EMPTY_SCHEMA: &Value = &Value::Null;

/// Returns a canned value and records its arguments.
struct CannedTool {
    name: &'static str,
    result: ToolResult,
    calls: CallLog,
}

impl Tool for CannedTool {
    type Input = Value;

    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "A canned tool."
    }

    fn parameter_schema(&self) -> &Value {
        EMPTY_SCHEMA
    }

    fn execute(
        &self,
        input: Value,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        self.calls
            .lock()
            .unwrap()
            .push((self.name.to_owned(), input));
        ready(self.result.clone())
    }
}

fn many_logs(count: usize) -> Value {
    let logs: Vec<_> = (0..count)
        .map(|id| json!({ "id": id, "notes": "n".repeat(400) }))
        .collect();
    json!({ "success": true, "data": { "data": logs } })
}

struct Fixture {
    provider: TestModelProvider,
    calls: CallLog,
}

impl Fixture {
    fn new() -> Self {
        Self {
            provider: TestModelProvider::default(),
            calls: Default::default(),
        }
    }

    fn respond(&mut self, preset: PresetResponse) -> &mut Self {
        self.provider.add_response(preset);
        self
    }

    fn builder(&self) -> AgentBuilder {
        let tool = |name: &'static str, result: ToolResult| CannedTool {
            name,
            result,
            calls: Arc::clone(&self.calls),
        };
        let registry = ToolRegistryBuilder::with_allow_list([
            "get_farm_summary",
            "list_assets",
            "list_locations",
            "get_asset",
            "list_logs",
        ])
        .with_tool(tool(
            "get_farm_summary",
            Ok(json!({ "success": true, "summary": { "animal_count": 12 } })),
        ))
        .with_tool(tool(
            "list_assets",
            Ok(json!({ "success": true, "data": { "data": [{ "id": 1 }] } })),
        ))
        .with_tool(tool(
            "list_locations",
            Ok(json!({ "success": true, "data": { "data": [] } })),
        ))
        .with_tool(tool(
            "get_asset",
            Err(ToolError::execution_error().with_reason("backend unavailable")),
        ))
        .with_tool(tool("list_logs", Ok(many_logs(30))))
        .build()
        .unwrap();

        AgentBuilder::with_model_provider(self.provider.clone())
            .with_system_prompt("You are a farm assistant.")
            .with_tool_registry(Arc::new(registry))
            .with_retry_policy(RetryPolicy::no_retry())
    }

    fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }
}

#[tokio::test]
async fn test_simple_message() {
    let mut fixture = Fixture::new();
    fixture.respond(PresetResponse::with_text("Hello! How can I help?"));
    let agent = fixture.builder().build();

    let outcome = agent.chat(ChatInput::new("Hello")).await.unwrap();
    assert_eq!(outcome.message, "Hello! How can I help?");
    assert!(outcome.tool_calls.is_empty());
    assert_eq!(outcome.finish, ChatFinish::Completed);
    assert_eq!(fixture.provider.request_count(), 1);

    let request = &fixture.provider.requests()[0];
    assert_eq!(request.tools.len(), 5);
    assert_eq!(
        request.messages,
        vec![
            ModelMessage::System("You are a farm assistant.".to_owned()),
            ModelMessage::User("Hello".to_owned()),
        ]
    );
}

#[tokio::test]
async fn test_single_tool_round() {
    let mut fixture = Fixture::new();
    fixture
        .respond(PresetResponse::with_events([tool_call(
            "call_1",
            "get_farm_summary",
            "{}",
        )]))
        .respond(PresetResponse::with_text("You have 12 animals."));
    let agent = fixture.builder().build();

    let outcome = agent
        .chat(ChatInput::new("What's on my farm?"))
        .await
        .unwrap();
    assert_eq!(outcome.message, "You have 12 animals.");
    assert_eq!(outcome.tool_calls.len(), 1);
    assert_eq!(outcome.tool_calls[0].name(), "get_farm_summary");
    assert_eq!(outcome.tool_calls[0].arguments(), &json!({}));
    assert_eq!(
        outcome.tool_calls[0].result(),
        Some(&json!({ "success": true, "summary": { "animal_count": 12 } }))
    );
    assert_eq!(outcome.tool_calls[0].error(), None);
    assert_eq!(fixture.provider.request_count(), 2);

    let second = &fixture.provider.requests()[1];
    let ModelMessage::Assistant(assistant) = &second.messages[2] else {
        panic!("expected the assistant turn, got {:?}", second.messages[2]);
    };
    assert_eq!(assistant.tool_calls[0].id, "call_1");
    let ModelMessage::Tool(result) = &second.messages[3] else {
        panic!("expected a tool turn, got {:?}", second.messages[3]);
    };
    assert_eq!(result.id, "call_1");
    assert_eq!(
        result.content,
        r#"{"success":true,"summary":{"animal_count":12}}"#
    );
}

#[tokio::test]
async fn test_multiple_tools_in_order() {
    let mut fixture = Fixture::new();
    fixture
        .respond(PresetResponse::with_events([
            PresetEvent::MessageDelta("Checking.".to_owned()),
            tool_call("call_a", "list_assets", r#"{"asset_type":"animal"}"#),
            tool_call("call_b", "list_locations", "{}"),
        ]))
        .respond(PresetResponse::with_text("One animal, no locations."));
    let agent = fixture.builder().build();

    let outcome = agent.chat(ChatInput::new("Overview")).await.unwrap();
    let names: Vec<_> = outcome.tool_calls.iter().map(|r| r.name()).collect();
    assert_eq!(names, ["list_assets", "list_locations"]);
    assert_eq!(
        fixture.calls(),
        vec![
            ("list_assets".to_owned(), json!({ "asset_type": "animal" })),
            ("list_locations".to_owned(), json!({})),
        ]
    );

    let second = &fixture.provider.requests()[1];
    let tool_ids: Vec<_> = second
        .messages
        .iter()
        .filter_map(|msg| match msg {
            ModelMessage::Tool(result) => Some(result.id.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(tool_ids, ["call_a", "call_b"]);
    assert!(matches!(
        second.messages.last(),
        Some(ModelMessage::Tool(result)) if result.id == "call_b"
    ));
}

#[tokio::test]
async fn test_history_is_capped() {
    let mut fixture = Fixture::new();
    fixture.respond(PresetResponse::with_text("Sure."));
    let agent = fixture.builder().build();

    let history = (0..25)
        .map(|i| HistoryMessage::user(format!("message {i}")))
        .collect();
    agent
        .chat(ChatInput::new("And now?").with_history(history))
        .await
        .unwrap();

    let messages = &fixture.provider.requests()[0].messages;
    assert_eq!(messages.len(), 22);
    assert_eq!(messages[1], ModelMessage::User("message 5".to_owned()));
}

#[tokio::test]
async fn test_tool_failure_is_contained() {
    let mut fixture = Fixture::new();
    fixture
        .respond(PresetResponse::with_events([
            tool_call("call_1", "list_assets", r#"{"asset_type":"plant"}"#),
            tool_call("call_2", "get_asset", r#"{"asset_type":"plant","asset_id":7}"#),
        ]))
        .respond(PresetResponse::with_text("I couldn't load plant 7."));
    let agent = fixture.builder().build();

    let outcome = agent.chat(ChatInput::new("Show plant 7")).await.unwrap();
    assert_eq!(outcome.finish, ChatFinish::Completed);
    assert_eq!(outcome.message, "I couldn't load plant 7.");

    let ok = &outcome.tool_calls[0];
    assert!(ok.result().is_some());
    assert!(ok.error().is_none());
    let failed = &outcome.tool_calls[1];
    assert!(failed.result().is_none());
    assert_eq!(failed.error(), Some("Execution error: backend unavailable"));

    let encoded = serde_json::to_value(failed).unwrap();
    assert!(encoded.get("result").is_none());

    let second = &fixture.provider.requests()[1];
    let Some(ModelMessage::Tool(result)) = second.messages.last() else {
        panic!("expected a tool turn");
    };
    assert_eq!(
        result.content,
        r#"{"error":"Execution error: backend unavailable"}"#
    );
}

#[tokio::test]
async fn test_unknown_tool() {
    let mut fixture = Fixture::new();
    fixture
        .respond(PresetResponse::with_events([tool_call(
            "call_1",
            "draw_polygon",
            "{}",
        )]))
        .respond(PresetResponse::with_text("I can't draw."));
    let agent = fixture.builder().build();

    let outcome = agent.chat(ChatInput::new("Draw a field")).await.unwrap();
    assert_eq!(outcome.message, "I can't draw.");
    assert_eq!(
        outcome.tool_calls[0].error(),
        Some("Unknown tool: draw_polygon")
    );
    assert!(fixture.calls().is_empty());
}

#[tokio::test]
async fn test_malformed_arguments() {
    let mut fixture = Fixture::new();
    fixture
        .respond(PresetResponse::with_events([tool_call(
            "call_1",
            "list_assets",
            r#"{"asset_type": "#,
        )]))
        .respond(PresetResponse::with_text("Sorry, let me retry."));
    let agent = fixture.builder().build();

    let outcome = agent.chat(ChatInput::new("List")).await.unwrap();
    let record = &outcome.tool_calls[0];
    assert_eq!(record.arguments(), &json!(r#"{"asset_type": "#));
    assert!(record.error().unwrap().starts_with("Invalid tool arguments"));
    assert!(fixture.calls().is_empty());
}

#[tokio::test]
async fn test_empty_arguments() {
    let mut fixture = Fixture::new();
    fixture
        .respond(PresetResponse::with_events([tool_call(
            "call_1",
            "get_farm_summary",
            "",
        )]))
        .respond(PresetResponse::with_text("Done."));
    let agent = fixture.builder().build();

    let outcome = agent.chat(ChatInput::new("Summary")).await.unwrap();
    assert!(outcome.tool_calls[0].result().is_some());
    assert_eq!(fixture.calls(), vec![("get_farm_summary".to_owned(), json!({}))]);
}

#[tokio::test]
async fn test_round_limit() {
    let mut fixture = Fixture::new();
    for i in 0..3 {
        fixture.respond(PresetResponse::with_events([
            PresetEvent::MessageDelta(format!("Looking again ({i})")),
            tool_call(&format!("call_{i}"), "list_locations", "{}"),
        ]));
    }
    let agent = fixture.builder().with_max_rounds(3).build();

    let outcome = agent.chat(ChatInput::new("Loop")).await.unwrap();
    assert_eq!(outcome.finish, ChatFinish::RoundLimitExceeded);
    assert_eq!(outcome.tool_calls.len(), 3);
    assert_eq!(outcome.message, "Looking again (2)");
    assert_eq!(fixture.provider.request_count(), 3);
}

#[tokio::test]
async fn test_stop_wins_over_tool_calls() {
    let mut fixture = Fixture::new();
    fixture.respond(
        PresetResponse::with_events([
            PresetEvent::MessageDelta("All done.".to_owned()),
            tool_call("call_1", "list_locations", "{}"),
        ])
        .with_finish_reason(ModelFinishReason::Stop),
    );
    let agent = fixture.builder().build();

    let outcome = agent.chat(ChatInput::new("Hi")).await.unwrap();
    assert_eq!(outcome.message, "All done.");
    assert!(outcome.tool_calls.is_empty());
    assert!(fixture.calls().is_empty());
}

#[tokio::test]
async fn test_context_injection() {
    let mut fixture = Fixture::new();
    fixture.respond(PresetResponse::with_text("It is due Friday."));
    let agent = fixture.builder().build();

    let input = ChatInput::new("When is it due?").with_context(
        ConversationContext {
            resource_type: "task".to_owned(),
            resource_id: 9,
            snapshot: "# Mend fence\nTarget date: Friday".to_owned(),
        },
    );
    agent.chat(input).await.unwrap();

    let request = &fixture.provider.requests()[0];
    let ModelMessage::System(system) = &request.messages[0] else {
        panic!("expected a system message");
    };
    assert!(system.starts_with("You are a farm assistant."));
    assert!(system.contains("task #9"));
    assert!(system.contains("Target date: Friday"));
    assert_eq!(request.tools.len(), 5);
}

#[tokio::test]
async fn test_model_failure_aborts_turn() {
    let mut fixture = Fixture::new();
    fixture.respond(PresetResponse::with_text("never").with_failures(0));
    let agent = fixture.builder().build();

    let err = agent.chat(ChatInput::new("Hi")).await.unwrap_err();
    let Error::Model { kind, .. } = err;
    assert_eq!(kind, ErrorKind::Other);
}

#[tokio::test]
async fn test_rate_limit_is_retried() {
    let mut fixture = Fixture::new();
    fixture.respond(PresetResponse::with_text("Here.").with_failures(1));
    let agent = fixture
        .builder()
        .with_retry_policy(RetryPolicy {
            initial_interval: Duration::from_millis(1),
            max_interval: Duration::from_millis(2),
            max_elapsed_time: Duration::from_secs(5),
        })
        .build();

    let outcome = agent.chat(ChatInput::new("Hi")).await.unwrap();
    assert_eq!(outcome.message, "Here.");
    assert_eq!(fixture.provider.request_count(), 2);
}

#[tokio::test]
async fn test_large_results_are_truncated() {
    let mut fixture = Fixture::new();
    fixture
        .respond(PresetResponse::with_events([tool_call(
            "call_1",
            "list_logs",
            r#"{"log_type":"activity"}"#,
        )]))
        .respond(PresetResponse::with_text("Many logs."));
    let agent = fixture.builder().build();

    let outcome = agent.chat(ChatInput::new("Logs?")).await.unwrap();
    // The record keeps the full result.
    assert_eq!(outcome.tool_calls[0].result(), Some(&many_logs(30)));

    let second = &fixture.provider.requests()[1];
    let Some(ModelMessage::Tool(result)) = second.messages.last() else {
        panic!("expected a tool turn");
    };
    let sent: Value = serde_json::from_str(&result.content).unwrap();
    assert_eq!(sent["data"]["data"].as_array().unwrap().len(), 5);
    assert!(sent["_truncated"].as_str().unwrap().contains("5 of 30"));
}

#[tokio::test]
async fn test_tiny_result_budget_is_raised() {
    let mut fixture = Fixture::new();
    fixture
        .respond(PresetResponse::with_events([tool_call(
            "call_1",
            "list_logs",
            r#"{"log_type":"activity"}"#,
        )]))
        .respond(PresetResponse::with_text("Many logs."));
    let agent = fixture.builder().with_max_result_length(0).build();

    agent.chat(ChatInput::new("Logs?")).await.unwrap();
    let second = &fixture.provider.requests()[1];
    let Some(ModelMessage::Tool(result)) = second.messages.last() else {
        panic!("expected a tool turn");
    };
    assert!(result.content.len() <= MIN_MAX_LENGTH);
    serde_json::from_str::<Value>(&result.content).unwrap();
}

#[tokio::test]
async fn test_agent_is_shareable() {
    fn assert_send_sync<T: Send + Sync + Clone>(_: &T) {}

    let mut fixture = Fixture::new();
    fixture.respond(PresetResponse::with_text("Hi there."));
    let agent = fixture.builder().build();
    assert_send_sync(&agent);

    let handle = tokio::spawn({
        let agent = agent.clone();
        async move { agent.chat(ChatInput::new("Hi")).await }
    });
    let outcome = handle.await.unwrap().unwrap();
    assert_eq!(outcome.message, "Hi there.");
}
