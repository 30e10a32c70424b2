//! `GET /ws` upgrade endpoint.

use std::sync::Arc;

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::{debug, warn};

use super::axum_adapter;
use super::manager::ConnectionManager;
use super::receive;
use crate::metrics::WS_HANDSHAKE_REJECTIONS_TOTAL;
use crate::server::AppState;

/// Why an upgrade request was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum HandshakeRejection {
    /// Not a WebSocket upgrade request.
    #[error("upgrade required")]
    NotUpgrade,
    /// No `token` query parameter, or an empty one.
    #[error("missing token")]
    MissingToken,
    /// The token did not authenticate a user.
    #[error("invalid token")]
    Unauthorized,
}

impl HandshakeRejection {
    /// HTTP status returned to the client.
    pub fn status(self) -> StatusCode {
        match self {
            Self::NotUpgrade => StatusCode::UPGRADE_REQUIRED,
            Self::MissingToken => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }

    /// Metric label.
    pub fn reason(self) -> &'static str {
        match self {
            Self::NotUpgrade => "not_upgrade",
            Self::MissingToken => "missing_token",
            Self::Unauthorized => "unauthorized",
        }
    }
}

impl IntoResponse for HandshakeRejection {
    fn into_response(self) -> Response {
        metrics::counter!(WS_HANDSHAKE_REJECTIONS_TOTAL, "reason" => self.reason()).increment(1);
        (self.status(), self.to_string()).into_response()
    }
}

/// Query string of the upgrade request.
#[derive(Debug, Default, Deserialize)]
pub struct UpgradeQuery {
    /// Bearer credential.
    #[serde(default)]
    pub token: Option<String>,
}

/// `GET /ws?token=...`
///
/// Mounted for every method. Checks run in order: upgrade request (426),
/// token presence (400), token validity (401). Only then is the connection
/// upgraded and handed to the receive loop. A query string that does not
/// parse counts as a missing token.
pub async fn ws_handler(
    State(state): State<AppState>,
    query: Result<Query<UpgradeQuery>, QueryRejection>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let ws = match upgrade {
        Ok(ws) => ws,
        Err(e) => {
            debug!(error = %e, "rejecting non-upgrade request");
            return HandshakeRejection::NotUpgrade.into_response();
        }
    };

    let token = match &query {
        Ok(Query(query)) => query.token.as_deref(),
        Err(e) => {
            debug!(error = %e, "unreadable upgrade query");
            None
        }
    };
    let user_id = match state.manager.authorize(token) {
        Ok(user_id) => user_id,
        Err(rejection) => return rejection.into_response(),
    };

    let manager: Arc<ConnectionManager> = Arc::clone(&state.manager);
    ws.max_message_size(state.config.max_message_size)
        .on_failed_upgrade(|e| warn!(error = %e, "websocket upgrade failed"))
        .on_upgrade(move |socket| async move {
            let (handle, frames) = axum_adapter::split(socket);
            let _ = receive::serve_socket(manager, user_id, handle, frames).await;
        })
}
