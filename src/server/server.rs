use anyhow::Result;
use axum::Router;
use tracing::info;
use crate::config::settings::SettingsConfig;
use crate::observability::metrics::{get_metrics, Metrics};
use crate::observability::routes::MetricsState;

#[derive(Clone)]
pub struct AppState {
    pub metrics_state: MetricsState,
}

impl AppState {
    pub fn new(metrics: &Metrics) -> Self {
        Self {
            metrics_state: MetricsState::new(metrics.registry.clone()),
        }
    }
}

pub fn router(settings_config: &SettingsConfig, state: AppState) -> Router {
    Router::new()
        .merge(state.metrics_state.router(&settings_config.metrics))
        .with_state(state)
}

/// Start the observability server; returns immediately when no route is enabled.
pub async fn start(settings_config: &SettingsConfig) -> Result<()> {
    let metrics = get_metrics().await;
    metrics.up.set(1);
    if !settings_config.metrics.is_enabled {
        info!("metrics disabled, observability server not started");
        return Ok(());
    }

    let app = router(settings_config, AppState::new(metrics));
    let bind_addr = &settings_config.server.host;
    let port = &settings_config.server.port;
    let listener = tokio::net::TcpListener::bind(format!("{}:{}", bind_addr, port)).await?;
    info!("observability server listening on {}:{}", bind_addr, port);
    axum::serve(listener, app).await?;

    Ok(())
}
