use serde::Deserialize;

use crate::utils::constants::*;

/// ================================
/// OAuth provider endpoints
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ProviderConfig {
    #[serde(default = "default_authority_url")]
    pub authority_url: String,
    #[serde(default = "default_token_path")]
    pub token_path: String,
    #[serde(default = "default_authorize_path")]
    pub authorize_path: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_profile_path")]
    pub profile_path: String,
    #[serde(default = "default_probe_path")]
    pub probe_path: String,
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
    #[serde(default = "default_scope")]
    pub scope: String,
    /// default application credentials for `bind` when none are passed explicitly
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

impl ProviderConfig {
    pub fn token_url(&self) -> String {
        join_url(&self.authority_url, &self.token_path)
    }

    pub fn authorize_url(&self) -> String {
        join_url(&self.authority_url, &self.authorize_path)
    }

    pub fn resource_url(&self, resource_path: &str) -> String {
        join_url(&self.api_url, resource_path)
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            authority_url: default_authority_url(),
            token_path: default_token_path(),
            authorize_path: default_authorize_path(),
            api_url: default_api_url(),
            profile_path: default_profile_path(),
            probe_path: default_probe_path(),
            redirect_uri: default_redirect_uri(),
            scope: default_scope(),
            client_id: None,
            client_secret: None,
        }
    }
}

/// ================================
/// Credential store
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_store_path")]
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { path: default_store_path() }
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

fn default_authority_url() -> String {
    DEFAULT_AUTHORITY_URL.to_owned()
}

fn default_token_path() -> String {
    DEFAULT_TOKEN_PATH.to_owned()
}

fn default_authorize_path() -> String {
    DEFAULT_AUTHORIZE_PATH.to_owned()
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_owned()
}

fn default_profile_path() -> String {
    DEFAULT_PROFILE_PATH.to_owned()
}

fn default_probe_path() -> String {
    DEFAULT_PROBE_PATH.to_owned()
}

fn default_redirect_uri() -> String {
    DEFAULT_REDIRECT_URI.to_owned()
}

fn default_scope() -> String {
    DEFAULT_SCOPE.to_owned()
}

fn default_store_path() -> String {
    DEFAULT_STORE_PATH.to_owned()
}
