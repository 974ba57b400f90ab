//! Shared constants and invariants

pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 20_000;
pub const DEFAULT_POOL_MAX_IDLE_PER_HOST: usize = 50;
pub const DEFAULT_POOL_IDLE_TIMEOUT_MS: u64 = 20_000;
pub const DEFAULT_RENEWAL_INTERVAL_SECS: u64 = 3600;

// Provider defaults (Microsoft identity platform + Graph)
pub const DEFAULT_AUTHORITY_URL: &str = "https://login.microsoftonline.com";
pub const DEFAULT_TOKEN_PATH: &str = "/common/oauth2/v2.0/token";
pub const DEFAULT_AUTHORIZE_PATH: &str = "/common/oauth2/v2.0/authorize";
pub const DEFAULT_API_URL: &str = "https://graph.microsoft.com";
pub const DEFAULT_PROFILE_PATH: &str = "/v1.0/me";
pub const DEFAULT_PROBE_PATH: &str = "/v1.0/me/messages";
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost/e5sub";
pub const DEFAULT_SCOPE: &str = "openid offline_access mail.read user.read";

pub const DEFAULT_STORE_PATH: &str = "token-keeper.store.json";

// Grant flavors sent to the token endpoint
pub const GRANT_AUTHORIZATION_CODE: &str = "authorization_code";
pub const GRANT_REFRESH_TOKEN: &str = "refresh_token";

pub const BEARER_TOKEN_TYPE: &str = "Bearer";
