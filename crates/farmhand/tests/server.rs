//! Tests of the HTTP interface, driven through the router without a
//! listening socket.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use farmhand::api::{ApiRequest, ApiResponse, FarmApi};
use farmhand::server::router;
use farmhand::{SessionBuilder, tools::TOOL_NAMES};
use farmhand_model::ModelMessage;
use farmhand_test_model::{PresetResponse, TestModelProvider, tool_call};
use serde_json::{Value, json};
use tower::ServiceExt;

/// A farm API that answers every call with the same document.
#[derive(Default)]
struct FakeFarmApi {
    requests: Mutex<Vec<ApiRequest>>,
}

#[async_trait]
impl FarmApi for FakeFarmApi {
    async fn call(&self, request: ApiRequest) -> ApiResponse {
        let id = request.endpoint.rsplit('/').next().unwrap_or_default();
        let data = json!({
            "data": {
                "id": id,
                "type": "animal",
                "attributes": {"name": "Daisy"}
            }
        });
        self.requests.lock().unwrap().push(request);
        ApiResponse::success(200, data)
    }
}

fn app(provider: &TestModelProvider, farm_api: Arc<FakeFarmApi>) -> Router {
    app_with_origins(provider, farm_api, &[])
}

fn app_with_origins(
    provider: &TestModelProvider,
    farm_api: Arc<FakeFarmApi>,
    origins: &[String],
) -> Router {
    let session = SessionBuilder::with_model_provider(provider.clone())
        .with_farm_api(farm_api)
        .build()
        .unwrap();
    router(session, origins)
}

async fn json_request(
    app: Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let req = match method {
        "GET" => Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
        "POST" => Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.unwrap_or(json!({})).to_string()))
            .unwrap(),
        _ => panic!("unsupported method"),
    };

    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(json!({}));
    (status, body)
}

#[tokio::test]
async fn test_health() {
    let app = app(&TestModelProvider::default(), Arc::default());
    let (status, body) = json_request(app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "healthy"}));
}

#[tokio::test]
async fn test_list_tools() {
    let app = app(&TestModelProvider::default(), Arc::default());
    let (status, body) = json_request(app, "GET", "/tools", None).await;
    assert_eq!(status, StatusCode::OK);

    let tools = body.as_array().unwrap();
    assert_eq!(tools.len(), TOOL_NAMES.len());
    assert_eq!(tools[0]["name"], "get_api_info");
    assert_eq!(tools[2]["name"], "list_assets");
    assert_eq!(tools[2]["parameters"][0]["name"], "asset_type");
    assert_eq!(tools[2]["parameters"][0]["type"], "string");
    assert_eq!(tools[2]["parameters"][0]["required"], true);
}

#[tokio::test]
async fn test_chat_answers_without_tools() {
    let mut provider = TestModelProvider::default();
    provider.add_response(PresetResponse::with_text("Hello, farmer!"));

    let app = app(&provider, Arc::default());
    let (status, body) = json_request(
        app,
        "POST",
        "/chat",
        Some(json!({"message": "hi"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "message": "Hello, farmer!",
            "tool_calls": [],
            "finish": "completed"
        })
    );
}

#[tokio::test]
async fn test_chat_with_tool_call() {
    let mut provider = TestModelProvider::default();
    provider.add_response(PresetResponse::with_events([tool_call(
        "call_1",
        "get_asset",
        r#"{"asset_type": "animal", "asset_id": 42}"#,
    )]));
    provider.add_response(PresetResponse::with_text("Asset 42 is Daisy."));
    let farm_api = Arc::new(FakeFarmApi::default());

    let app = app(&provider, farm_api.clone());
    let (status, body) = json_request(
        app,
        "POST",
        "/chat",
        Some(json!({"message": "Who is asset 42?"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Asset 42 is Daisy.");
    let call = &body["tool_calls"][0];
    assert_eq!(call["name"], "get_asset");
    assert_eq!(
        call["arguments"],
        json!({"asset_type": "animal", "asset_id": 42})
    );
    assert_eq!(call["result"]["success"], true);
    assert_eq!(
        call["result"]["data"]["data"]["attributes"]["name"],
        "Daisy"
    );
    assert!(call.get("error").is_none());

    let requests = farm_api.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].endpoint, "assets/animal/42");
}

#[tokio::test]
async fn test_chat_reports_unknown_tool() {
    let mut provider = TestModelProvider::default();
    provider.add_response(PresetResponse::with_events([tool_call(
        "call_1",
        "draw_map",
        "{}",
    )]));
    provider.add_response(PresetResponse::with_text("I can't draw maps."));

    let app = app(&provider, Arc::default());
    let (status, body) = json_request(
        app,
        "POST",
        "/chat",
        Some(json!({"message": "draw my farm"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tool_calls"][0]["error"], "Unknown tool: draw_map");
    assert!(body["tool_calls"][0].get("result").is_none());
}

#[tokio::test]
async fn test_chat_passes_history_and_context() {
    let mut provider = TestModelProvider::default();
    provider.add_response(PresetResponse::with_text("It's due Friday."));

    let app = app(&provider, Arc::default());
    let (status, _) = json_request(
        app,
        "POST",
        "/chat",
        Some(json!({
            "message": "When is it due?",
            "history": [
                {"role": "user", "content": "Show me task 7"},
                {"role": "assistant", "content": "Task 7 is fencing."}
            ],
            "context": {"type": "task", "id": 7, "data": "# Fix fence"}
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let messages = &provider.requests()[0].messages;
    assert_eq!(messages.len(), 4);
    let ModelMessage::System(system) = &messages[0] else {
        panic!("expected a system message, got {:?}", messages[0]);
    };
    assert!(system.contains("task #7"));
    assert!(system.contains("# Fix fence"));
    assert_eq!(messages[1], ModelMessage::User("Show me task 7".to_owned()));
    assert_eq!(
        messages[3],
        ModelMessage::User("When is it due?".to_owned())
    );
}

#[tokio::test]
async fn test_chat_rejects_empty_message() {
    let provider = TestModelProvider::default();
    let app = app(&provider, Arc::default());
    let (status, body) = json_request(
        app,
        "POST",
        "/chat",
        Some(json!({"message": "   "})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "message must not be empty");
    assert_eq!(provider.request_count(), 0);
}

#[tokio::test]
async fn test_chat_requires_message() {
    let app = app(&TestModelProvider::default(), Arc::default());
    let (status, _) =
        json_request(app, "POST", "/chat", Some(json!({"history": []}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_chat_model_failure() {
    let mut provider = TestModelProvider::default();
    provider
        .add_response(PresetResponse::with_text("unused").with_failures(0));

    let app = app(&provider, Arc::default());
    let (status, body) = json_request(
        app,
        "POST",
        "/chat",
        Some(json!({"message": "hi"})),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(
        body["error"]
            .as_str()
            .unwrap()
            .starts_with("model request failed")
    );
}

#[tokio::test]
async fn test_cors_allows_any_origin_by_default() {
    let app = app(&TestModelProvider::default(), Arc::default());
    let req = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "http://localhost:5173")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}

#[tokio::test]
async fn test_cors_restricted_origins() {
    let origins = ["http://localhost:3000".to_owned()];
    let app = app_with_origins(
        &TestModelProvider::default(),
        Arc::default(),
        &origins,
    );

    let req = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:3000"
    );

    let req = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "http://evil.example")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert!(
        !response
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN)
    );
}
