#[cfg(test)]
mod tests {
    use std::path::Path;

    use anyhow::Result;
    use serial_test::serial;

    use crate::config::proc_loader::file_to_config;
    use crate::config::settings::LogFormat;

    #[tokio::test]
    #[serial]
    async fn shipped_sample_config_is_valid() -> Result<()> {
        std::env::remove_var("RENEWAL_INTERVAL_SECONDS");
        std::env::set_var("STORE_PATH", "/tmp/token-keeper-test.json");

        let cfg = file_to_config(Path::new("token-keeper.yaml")).await?;
        assert_eq!(cfg.settings.renewal.interval_seconds, 3600);
        assert!(cfg.settings.metrics.is_enabled);
        assert_eq!(cfg.settings.logging.as_ref().map(|l| l.format.clone()), Some(LogFormat::Compact));
        assert_eq!(cfg.provider.token_url(), "https://login.microsoftonline.com/common/oauth2/v2.0/token");
        assert_eq!(cfg.storage.path, "/tmp/token-keeper-test.json");
        assert!(cfg.provider.client_id.is_none());

        std::env::remove_var("STORE_PATH");
        Ok(())
    }
}
