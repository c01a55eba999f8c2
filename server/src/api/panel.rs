use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use std::sync::Arc;

use crate::state::AppState;
use crate::views;

/// Render the panel from live upstream state plus the two documents.
///
/// Models and health are required; if either call fails the operator
/// gets the full-page connection view with a retry link. Stats are
/// optional and already collapse to `None` inside the gateway.
pub async fn index(State(state): State<Arc<AppState>>) -> Response {
    let models = state.client.models().await;
    let health = state.client.health().await;

    let (models, health) = match (models, health) {
        (Ok(models), Ok(health)) => (models, health),
        (Err(err), _) | (_, Err(err)) => {
            tracing::warn!("lemonade server unreachable: {}", err);
            let page = views::connection_error(&state.config.upstream.base_url, &err);
            return (StatusCode::BAD_GATEWAY, Html(page)).into_response();
        }
    };

    let stats = state.client.stats().await;
    let saved = state.options.all();
    let disabled = state.prefs.disabled();

    let page = views::index(&state.config, &models, &health, stats.as_ref(), &saved, &disabled);
    Html(page).into_response()
}
