use axum::body::Body;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Form;
use futures_util::StreamExt;
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;

use crate::state::AppState;
use lemonade_manager_core::PullRequest;

#[derive(Debug, Deserialize)]
pub struct PullForm {
    pub model_name: String,
    pub checkpoint: String,
    pub recipe: String,

    #[serde(default)]
    pub mmproj: Option<String>,
}

/// Proxy the pull to lemonade-server with stream=true and hand the event
/// stream straight through to the browser for the progress log.
///
/// The gateway stream never fails (upstream errors arrive as a terminal
/// error event), so the body stream is infallible. When the browser goes
/// away axum drops the body, which drops the upstream call with it.
pub async fn pull_stream(
    State(state): State<Arc<AppState>>,
    Form(form): Form<PullForm>,
) -> Response {
    let request = PullRequest {
        model_name: form.model_name,
        checkpoint: form.checkpoint,
        recipe: form.recipe,
        mmproj: form
            .mmproj
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string),
    };

    tracing::info!("pulling {} ({})", request.model_name, request.checkpoint);

    let stream = state.client.pull(request).map(Ok::<_, Infallible>);

    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(stream),
    )
        .into_response()
}
