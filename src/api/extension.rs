use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use serde::Serialize;
use serde_json::Value;

use crate::errors::AppError;
use crate::models::token::TokenInfo;
use crate::models::user::User;
use crate::AppState;

// ── Response DTOs ────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateResponse {
    pub success: bool,
    pub user: User,
    pub token_info: TokenInfo,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueResponse {
    pub success: bool,
    pub token: String,
    pub token_info: TokenInfo,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

// ── Handlers ─────────────────────────────────────────────────

/// POST /api/extension/validate — exchange a token for its user
pub async fn validate_token(
    State(state): State<Arc<AppState>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<ValidateResponse>, AppError> {
    let token = token_from_body(&body?)?;

    let validated = state
        .tokens
        .validate(&token)
        .await
        .map_err(|e| AppError::from_token_error(e, state.config.disclose_failure_reasons))?;

    Ok(Json(ValidateResponse {
        success: true,
        user: validated.user,
        token_info: validated.token_info,
    }))
}

/// POST /api/extension/token — pair an extension with the caller's web session
pub async fn issue_token(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<IssueResponse>), AppError> {
    let session_token = bearer(&headers).ok_or(AppError::Unauthenticated)?;

    let issued = state
        .tokens
        .issue_for_session(session_token)
        .await
        .map_err(|e| AppError::from_token_error(e, state.config.disclose_failure_reasons))?;

    Ok((
        StatusCode::CREATED,
        Json(IssueResponse {
            success: true,
            token: issued.token,
            token_info: issued.info,
        }),
    ))
}

/// POST /api/extension/revoke — revoke a token; holding it is the authority
pub async fn revoke_token(
    State(state): State<Arc<AppState>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<SuccessResponse>, AppError> {
    let token = token_from_body(&body?)?;

    state
        .tokens
        .revoke(&token)
        .await
        .map_err(|e| AppError::from_token_error(e, state.config.disclose_failure_reasons))?;

    Ok(Json(SuccessResponse { success: true }))
}

/// Pull the `token` field out of a JSON body.
///
/// An empty body or a missing, non-string or blank `token` is the caller's
/// mistake (400). A body that is not JSON at all is treated as an unexpected
/// failure (500) and only logged.
fn token_from_body(body: &[u8]) -> Result<String, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(AppError::InvalidInput("Token is required".to_string()));
    }

    let payload: Value = serde_json::from_slice(body)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("malformed token request body: {}", e)))?;

    match payload.get("token").and_then(Value::as_str).map(str::trim) {
        Some(token) if !token.is_empty() => Ok(token.to_string()),
        _ => Err(AppError::InvalidInput("Token is required".to_string())),
    }
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
