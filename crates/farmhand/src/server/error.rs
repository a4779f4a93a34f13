use std::io;
use std::net::SocketAddr;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// Errors that stop the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listener couldn't be bound.
    #[error("failed to bind HTTP listener on {addr}: {source}")]
    Bind {
        /// The address to listen on.
        addr: SocketAddr,
        /// The underlying error.
        #[source]
        source: io::Error,
    },
    /// The server failed while running.
    #[error("HTTP server error: {0}")]
    Serve(#[from] io::Error),
}

/// Errors answered to HTTP clients.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request is well-formed but not acceptable.
    #[error("{0}")]
    BadRequest(String),
    /// The conversation turn failed.
    #[error(transparent)]
    Chat(#[from] farmhand_core::Error),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(message) => {
                warn!(error = %message, "rejected chat request");
                StatusCode::BAD_REQUEST
            }
            ApiError::Chat(err) => {
                error!(error = %err, "chat turn failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = Json(ErrorResponse {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}
