use axum::Json;
use axum::extract::State;
use farmhand_core::conversation::ChatInput;
use farmhand_core::tool::ToolSpec;
use serde_json::{Value, json};

use super::{ApiError, ChatRequest, ChatResponse};
use crate::Session;

pub(super) async fn chat(
    State(session): State<Session>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if req.message.trim().is_empty() {
        return Err(ApiError::BadRequest("message must not be empty".into()));
    }

    let mut input = ChatInput::new(req.message).with_history(req.history);
    if let Some(context) = req.context {
        input = input.with_context(context.into());
    }
    let outcome = session.chat(input).await?;
    info!(
        tool_calls = outcome.tool_calls.len(),
        finish = ?outcome.finish,
        "chat turn finished"
    );
    Ok(Json(outcome.into()))
}

pub(super) async fn health() -> Json<Value> {
    Json(json!({"status": "healthy"}))
}

pub(super) async fn tools(
    State(session): State<Session>,
) -> Json<Vec<ToolSpec>> {
    Json(session.tool_specs().to_vec())
}
