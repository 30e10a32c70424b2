//! `/api/users` handlers: token login, sends and forced disconnects.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::info;
use wshub_core::Risk;

use super::errors::ApiError;
use crate::server::AppState;

/// `POST /login` body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Account to issue the token for.
    pub account: String,
    /// Accepted but not verified.
    #[serde(default)]
    pub password: Option<String>,
}

/// `POST /login` response.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Bearer token for `GET /ws?token=...`.
    pub token: String,
}

/// `POST /send/{user_id}` and `POST /send-all` body.
#[derive(Debug, Deserialize)]
pub struct SendRequest {
    /// Defaults to `Low`.
    #[serde(default)]
    pub risk: Risk,
    /// Message body.
    pub message: String,
}

/// `POST /api/users/login`
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(req) = body?;
    let token = state.tokens.generate(&req.account)?;
    info!(account = %req.account, "token issued");
    Ok(Json(LoginResponse { token }))
}

/// `POST /api/users/send/{user_id}`
pub async fn send_to_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    body: Result<Json<SendRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(req) = body?;
    let _ = state
        .manager
        .send_to_user(&user_id, req.risk, &req.message)
        .await;
    Ok(StatusCode::OK)
}

/// `POST /api/users/send-all`
pub async fn send_to_all(
    State(state): State<AppState>,
    body: Result<Json<SendRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(req) = body?;
    let _ = state.manager.send_to_all(req.risk, &req.message).await;
    Ok(StatusCode::OK)
}

/// `DELETE /api/users/force-disconnect/{user_id}`
pub async fn force_disconnect(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> StatusCode {
    let _ = state.manager.disconnect_user(&user_id).await;
    StatusCode::OK
}

/// `DELETE /api/users/force-disconnect-all`
pub async fn force_disconnect_all(State(state): State<AppState>) -> StatusCode {
    let _ = state.manager.disconnect_all().await;
    StatusCode::OK
}
