//! Administrative HTTP surface under `/api/users`.

pub mod errors;
pub mod users;

use axum::Router;
use axum::routing::{delete, post};

use crate::server::AppState;

pub use errors::ApiError;

/// Routes relative to `/api/users`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(users::login))
        .route("/send/{user_id}", post(users::send_to_user))
        .route("/send-all", post(users::send_to_all))
        .route("/force-disconnect/{user_id}", delete(users::force_disconnect))
        .route("/force-disconnect-all", delete(users::force_disconnect_all))
}
