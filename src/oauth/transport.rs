use std::time::Duration;

use anyhow::Result;
use reqwest::Client;
use tracing::debug;

use crate::config::settings::HttpConfig;

/// Builds the process-scoped HTTP client every exchange goes through.
///
/// Connections are pooled per host; `pool_max_idle_per_host` caps the idle
/// sockets kept for a single host so one provider cannot hold the whole pool.
/// `connect_timeout` covers tcp connect and the tls handshake, `timeout` bounds
/// the complete exchange including the body read.
pub fn build_client(cfg: &HttpConfig) -> Result<Client> {
    debug!(
        "building http client: request_timeout_ms={}, connect_timeout_ms={}, pool_max_idle_per_host={}",
        cfg.request_timeout_ms, cfg.connect_timeout_ms, cfg.pool_max_idle_per_host
    );
    let client = Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_millis(cfg.request_timeout_ms))
        .connect_timeout(Duration::from_millis(cfg.connect_timeout_ms))
        .pool_max_idle_per_host(cfg.pool_max_idle_per_host)
        .pool_idle_timeout(Duration::from_millis(cfg.pool_idle_timeout_ms))
        .build()?;
    Ok(client)
}
