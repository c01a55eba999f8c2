use anyhow::Result;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::state::AppState;
use lemonade_manager_core::Config;

pub async fn run_server(config: Config) -> Result<()> {
    let addr = config.bind.addr()?;
    let state = Arc::new(AppState::new(config));

    let app = api::routes(state).layer(TraceLayer::new_for_http());

    tracing::info!("Starting manager on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
