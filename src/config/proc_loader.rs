use std::{fs, path::Path};
use crate::config::proc_validator;
use crate::config::settings::LoggingConfig;
use crate::config::types::ServiceConfig;
use crate::observability::metrics::get_metrics;
use anyhow::{anyhow, Result};
use regex::Regex;
use tracing::{debug, error};

/// Load and validate config from YAML file
pub async fn file_to_config(path: &Path) -> Result<ServiceConfig> {
    let content = fs::read_to_string(path)?;

    let expanded = expand_env_vars(&content)?;
    parse_config(expanded).await
}

pub async fn parse_config(content: String) -> Result<ServiceConfig> {
    let metrics = get_metrics().await;
    let mut service_config: ServiceConfig = serde_yaml::from_str(&content)
        .inspect_err(|e| {
            error!("parse config error: {}", e);
            metrics.config_validation_errors.inc();
        })?;

    // Apply defaults
    if service_config.settings.logging.is_none() {
        service_config.settings.logging = Some(LoggingConfig::default());
    }

    debug!("validation config ...");
    proc_validator::validate_service_config(&service_config)
        .await
        .map_err(|errors| anyhow!("config validation failed: {}", errors.join("; ")))?;

    Ok(service_config)
}

fn expand_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{(\w+)(?::([^\}]+))?\}")?;
    let expanded = re
        .replace_all(input, |caps: &regex::Captures| {
            let var = &caps[1];
            let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            std::env::var(var).unwrap_or_else(|_| default.to_string())
        })
        .to_string();
    Ok(expanded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::LogFormat;
    use serial_test::serial;

    #[tokio::test]
    async fn empty_document_gets_defaults() -> Result<()> {
        let cfg = parse_config("{}".to_owned()).await?;
        assert_eq!(cfg.settings.http.request_timeout_ms, 10_000);
        assert_eq!(cfg.settings.http.pool_max_idle_per_host, 50);
        assert_eq!(cfg.settings.renewal.interval_seconds, 3600);
        assert!(!cfg.settings.renewal.keep_rotated_on_probe_failure);
        assert_eq!(cfg.provider.scope, "openid offline_access mail.read user.read");
        assert_eq!(cfg.settings.logging.unwrap().format, LogFormat::Compact);
        Ok(())
    }

    #[tokio::test]
    async fn invalid_values_are_reported_together() {
        let yaml = r#"
settings:
  http:
    request_timeout_ms: 0
  renewal:
    interval_seconds: 0
provider:
  authority_url: "not a url"
"#;
        let err = parse_config(yaml.to_owned()).await.unwrap_err().to_string();
        assert!(err.contains("request_timeout_ms"), "{err}");
        assert!(err.contains("interval_seconds"), "{err}");
        assert!(err.contains("authority_url"), "{err}");
    }

    #[test]
    #[serial]
    fn env_vars_are_expanded_with_defaults() -> Result<()> {
        std::env::set_var("TOKEN_KEEPER_TEST_SECRET", "s3cret");
        std::env::remove_var("TOKEN_KEEPER_TEST_MISSING");
        let out = expand_env_vars("a: ${TOKEN_KEEPER_TEST_SECRET}\nb: ${TOKEN_KEEPER_TEST_MISSING:fallback}")?;
        assert_eq!(out, "a: s3cret\nb: fallback");
        std::env::remove_var("TOKEN_KEEPER_TEST_SECRET");
        Ok(())
    }
}
