//! Configuration validation with aggregated errors.
//! - Aggregates all issues into Vec<String>
//! - Validates transport bounds, renewal trigger, provider endpoints,
//!   logging level and server address

use tracing::{error, info};
use url::Url;

use crate::config::provider::{ProviderConfig, StorageConfig};
use crate::config::settings::{HttpConfig, LoggingConfig, RenewalConfig, ServerConfig, SettingsConfig};
use crate::config::types::ServiceConfig;
use crate::observability::metrics::get_metrics;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Public entrypoint: returns Ok(()) or Err(Vec<String>) containing all issues.
pub async fn validate_service_config(cfg: &ServiceConfig) -> Result<(), Vec<String>> {
    let mut errors: Vec<String> = Vec::new();

    validate_settings(&cfg.settings, &mut errors);
    validate_provider(&cfg.provider, &mut errors);
    validate_storage(&cfg.storage, &mut errors);

    if errors.is_empty() {
        info!("config validation passed");
        return Ok(());
    }

    let metrics = get_metrics().await;
    for e in &errors {
        error!("config: {}", e);
        metrics.config_validation_errors.inc();
    }
    Err(errors)
}

fn validate_settings(settings: &SettingsConfig, errors: &mut Vec<String>) {
    validate_http(&settings.http, errors);
    validate_renewal(&settings.renewal, errors);
    validate_server(&settings.server, errors);
    if let Some(logging) = &settings.logging {
        validate_logging(logging, errors);
    }
    if settings.metrics.is_enabled && !settings.metrics.path.starts_with('/') {
        errors.push(format!(
            "settings.metrics.path '{}' must start with '/'",
            settings.metrics.path
        ));
    }
}

fn validate_http(http: &HttpConfig, errors: &mut Vec<String>) {
    if http.request_timeout_ms == 0 {
        errors.push("settings.http.request_timeout_ms must be > 0".to_string());
    }
    if http.connect_timeout_ms == 0 {
        errors.push("settings.http.connect_timeout_ms must be > 0".to_string());
    }
    if http.pool_max_idle_per_host == 0 {
        errors.push("settings.http.pool_max_idle_per_host must be > 0".to_string());
    }
}

fn validate_renewal(renewal: &RenewalConfig, errors: &mut Vec<String>) {
    if renewal.interval_seconds == 0 {
        errors.push("settings.renewal.interval_seconds must be > 0".to_string());
    }
}

fn validate_server(server: &ServerConfig, errors: &mut Vec<String>) {
    if server.host.trim().is_empty() {
        errors.push("settings.server.host must not be empty".to_string());
    }
    if server.port.parse::<u16>().is_err() {
        errors.push(format!("settings.server.port '{}' is not a valid port", server.port));
    }
}

fn validate_logging(logging: &LoggingConfig, errors: &mut Vec<String>) {
    if !LOG_LEVELS.contains(&logging.level.to_lowercase().as_str()) {
        errors.push(format!(
            "settings.logging.level '{}' must be one of {:?}",
            logging.level, LOG_LEVELS
        ));
    }
}

fn validate_provider(provider: &ProviderConfig, errors: &mut Vec<String>) {
    for (name, value) in [
        ("provider.authority_url", &provider.authority_url),
        ("provider.api_url", &provider.api_url),
        ("provider.redirect_uri", &provider.redirect_uri),
    ] {
        if Url::parse(value).is_err() {
            errors.push(format!("{} '{}' is not an absolute URL", name, value));
        }
    }
    for (name, value) in [
        ("provider.token_path", &provider.token_path),
        ("provider.authorize_path", &provider.authorize_path),
        ("provider.profile_path", &provider.profile_path),
        ("provider.probe_path", &provider.probe_path),
    ] {
        if value.trim().is_empty() {
            errors.push(format!("{} must not be empty", name));
        }
    }
    if provider.scope.trim().is_empty() {
        errors.push("provider.scope must not be empty".to_string());
    }
    if provider.client_id.is_some() != provider.client_secret.is_some() {
        errors.push("provider.client_id and provider.client_secret must be set together".to_string());
    }
}

fn validate_storage(storage: &StorageConfig, errors: &mut Vec<String>) {
    if storage.path.trim().is_empty() {
        errors.push("storage.path must not be empty".to_string());
    }
}
