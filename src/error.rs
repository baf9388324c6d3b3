// src/error.rs
//! Error taxonomy shared by the store, the text sender, the gate and the HTTP layer.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Backing store unreachable or rejecting an operation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store read failed: {0}")]
    Read(String),

    #[error("store write failed: {0}")]
    Write(String),
}

/// Outbound message provider failure.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("text request failed: {0}")]
    Request(String),

    #[error("text provider rejected message (status {status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Missing or invalid startup configuration. Always fatal.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: '{value}' ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Anything that aborts a single gate tick.
#[derive(Debug, Error)]
pub enum GateError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Send(#[from] SendError),
}

/// HTTP-facing error. Backend failures surface as a generic 500.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("epochMillis {0} is outside the representable time range")]
    InvalidPunch(i64),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("reset failed: {0}")]
    Reset(StoreError),
}

impl ApiError {
    fn public_message(&self) -> &'static str {
        match self {
            ApiError::Store(StoreError::Read(_)) => "Error retrieving punches",
            ApiError::Store(StoreError::Write(_)) => "Error storing punch",
            ApiError::Reset(_) => "Error resetting",
            ApiError::InvalidPunch(_) => "Invalid punch time",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidPunch(_) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }
        let body = Json(json!({ "error": self.public_message() }));
        (status, body).into_response()
    }
}
