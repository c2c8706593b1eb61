use axum::extract::rejection::BytesRejection;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::models::token::ValidationFailure;
use crate::tokens::TokenError;

/// Message used when failure reasons are withheld from callers.
pub const UNIFORM_AUTH_FAILURE: &str = "Invalid token";

#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or missing request fields. Message goes back to the caller.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("token rejected: {reason}")]
    AuthFailure {
        reason: ValidationFailure,
        disclose: bool,
    },

    #[error("not authenticated")]
    Unauthenticated,

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("route not found")]
    NotFound,

    #[error("request body too large")]
    PayloadTooLarge,

    #[error("storage error: {0}")]
    Storage(anyhow::Error),

    /// Store failure whose message is safe to echo verbatim.
    #[error("store error: {0}")]
    Passthrough(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn from_token_error(err: TokenError, disclose: bool) -> Self {
        match err {
            TokenError::Invalid(reason) => AppError::AuthFailure { reason, disclose },
            TokenError::Unauthenticated => AppError::Unauthenticated,
            TokenError::Storage(e) => AppError::Storage(e),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::AuthFailure { .. } | AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Storage(_) | AppError::Passthrough(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// The `error` string placed in the response body.
    pub fn public_message(&self) -> String {
        match self {
            AppError::InvalidInput(msg) => msg.clone(),
            AppError::AuthFailure {
                reason,
                disclose: true,
            } => reason.to_string(),
            AppError::AuthFailure {
                disclose: false, ..
            } => UNIFORM_AUTH_FAILURE.to_string(),
            AppError::Unauthenticated => "Not authenticated".to_string(),
            AppError::MethodNotAllowed => "Method not allowed".to_string(),
            AppError::NotFound => "Not found".to_string(),
            AppError::PayloadTooLarge => "Request body too large".to_string(),
            AppError::Passthrough(msg) => msg.clone(),
            AppError::Storage(_) | AppError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

/// Body buffering failures. Over-limit bodies are 413, anything else is the
/// caller's request being unreadable.
impl From<BytesRejection> for AppError {
    fn from(rejection: BytesRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge
        } else {
            AppError::InvalidInput(rejection.body_text())
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Storage(e) => tracing::error!("Storage error: {:#}", e),
            AppError::Internal(e) => tracing::error!("Internal error: {:#}", e),
            AppError::Passthrough(msg) => tracing::error!("Store error: {}", msg),
            AppError::AuthFailure { reason, .. } => {
                tracing::info!(reason = reason.code(), "extension token rejected")
            }
            _ => {}
        }

        let body = Json(json!({
            "success": false,
            "error": self.public_message(),
        }));

        let mut response = (self.status(), body).into_response();

        if matches!(self, AppError::MethodNotAllowed) {
            response
                .headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static("POST"));
        }

        response
    }
}
