use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    Json,
};
use serde::Deserialize;

use super::extension::SuccessResponse;
use crate::errors::AppError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct UnsubscribeRequest {
    pub subscription: Option<SubscriptionRef>,
}

#[derive(Debug, Deserialize)]
pub struct SubscriptionRef {
    pub endpoint: Option<String>,
}

/// POST /api/push/unsubscribe — drop a push subscription by endpoint.
///
/// Unknown endpoints still answer 200. Store errors are echoed verbatim.
pub async fn unsubscribe(
    State(state): State<Arc<AppState>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<SuccessResponse>, AppError> {
    let endpoint = endpoint_from_body(&body?)?;

    let removed = state
        .subscriptions
        .delete_subscription(&endpoint)
        .await
        .map_err(|e| AppError::Passthrough(e.to_string()))?;

    tracing::info!(removed, "push subscription unsubscribe");

    Ok(Json(SuccessResponse { success: true }))
}

fn endpoint_from_body(body: &[u8]) -> Result<String, AppError> {
    let payload: UnsubscribeRequest =
        serde_json::from_slice(body).map_err(|e| AppError::InvalidInput(e.to_string()))?;

    let subscription = payload
        .subscription
        .ok_or_else(|| AppError::InvalidInput("Missing subscription".to_string()))?;

    match subscription.endpoint {
        Some(endpoint) if !endpoint.trim().is_empty() => Ok(endpoint),
        _ => Err(AppError::InvalidInput(
            "Missing subscription endpoint".to_string(),
        )),
    }
}
