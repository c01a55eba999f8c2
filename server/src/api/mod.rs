pub mod actions;
pub mod panel;
pub mod pull;

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

use crate::state::AppState;
use crate::views;
use lemonade_manager_core::Error;

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(panel::index))
        .route("/favicon.ico", get(favicon))
        .route("/load", post(actions::load_custom))
        .route("/defaults/load", post(actions::load_defaults))
        .route("/defaults/set", post(actions::save_defaults))
        .route("/unload", post(actions::unload_all))
        .route("/unload/model", post(actions::unload_one))
        .route("/delete_model", post(actions::delete_model))
        .route("/disable", post(actions::disable))
        .route("/pull/stream", post(pull::pull_stream))
        .with_state(state)
}

async fn favicon() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// Response wrapper for core errors. Every failure is scoped to the
/// request that triggered it; nothing here ends the process.
pub struct AppError(pub Error);

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::UpstreamUnavailable(_) | Error::UpstreamRejected { .. } => {
                StatusCode::BAD_GATEWAY
            }
            Error::StorageWrite { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::error!("request failed: {}", self.0);
        (status, Html(views::error_page(&self.0))).into_response()
    }
}
