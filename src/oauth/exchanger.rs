use std::sync::Arc;

use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::provider::ProviderConfig;
use crate::helpers::time::get_instant;
use crate::oauth::error::ExchangeError;
use crate::observability::metrics::get_metrics;
use crate::utils::constants::{BEARER_TOKEN_TYPE, GRANT_AUTHORIZATION_CODE, GRANT_REFRESH_TOKEN};

static CODE_MSG: &str = "code";
static REFRESH_MSG: &str = "refresh";
static RESOURCE_MSG: &str = "resource";

/// Access + refresh token pair returned by the token endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    /// empty when the provider did not rotate the refresh token
    pub refresh_token: String,
}

#[derive(Debug, Default, Deserialize)]
struct TokenResponse {
    token_type: Option<String>,
    access_token: Option<String>,
    refresh_token: Option<String>,
    error: Option<String>,
}

impl TokenResponse {
    fn parse(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }

    fn is_bearer(&self) -> bool {
        self.token_type
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case(BEARER_TOKEN_TYPE))
    }

    fn into_pair(self) -> TokenPair {
        TokenPair {
            access_token: self.access_token.unwrap_or_default(),
            refresh_token: self.refresh_token.unwrap_or_default(),
        }
    }
}

/// Performs the three provider exchanges over a shared, pooled client.
///
/// Stateless apart from the transport and the endpoint configuration; nothing
/// here retries, a failed exchange is handed back to the caller as is.
#[derive(Debug, Clone)]
pub struct TokenExchanger {
    client: Client,
    provider: Arc<ProviderConfig>,
}

impl TokenExchanger {
    pub fn new(client: Client, provider: ProviderConfig) -> Self {
        Self { client, provider: Arc::new(provider) }
    }

    pub fn provider(&self) -> &ProviderConfig {
        &self.provider
    }

    /// Trades a one-time authorization code for a token pair.
    pub async fn exchange_code(
        &self,
        code: &str,
        client_id: &str,
        client_secret: &str,
    ) -> Result<TokenPair, ExchangeError> {
        observe(CODE_MSG, self.request_code(code, client_id, client_secret)).await
    }

    /// Trades the current refresh token for a new access token.
    ///
    /// The provider invalidates `refresh_token` and issues a replacement in
    /// the returned pair; the caller owns persisting it.
    pub async fn exchange_refresh(
        &self,
        refresh_token: &str,
        client_id: &str,
        client_secret: &str,
    ) -> Result<TokenPair, ExchangeError> {
        observe(REFRESH_MSG, self.request_refresh(refresh_token, client_id, client_secret)).await
    }

    /// Authenticated GET against the API host, returns the raw payload.
    pub async fn fetch_resource(
        &self,
        access_token: &str,
        resource_path: &str,
    ) -> Result<String, ExchangeError> {
        observe(RESOURCE_MSG, self.request_resource(access_token, resource_path)).await
    }

    async fn request_code(
        &self,
        code: &str,
        client_id: &str,
        client_secret: &str,
    ) -> Result<TokenPair, ExchangeError> {
        let form = [
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("grant_type", GRANT_AUTHORIZATION_CODE),
            ("scope", self.provider.scope.as_str()),
            ("code", code),
            ("redirect_uri", self.provider.redirect_uri.as_str()),
        ];
        let (_, body) = self.post_token_form(&form).await?;
        let response = TokenResponse::parse(&body);
        if !response.is_bearer() {
            return Err(ExchangeError::Rejected { body });
        }
        Ok(response.into_pair())
    }

    async fn request_refresh(
        &self,
        refresh_token: &str,
        client_id: &str,
        client_secret: &str,
    ) -> Result<TokenPair, ExchangeError> {
        let form = [
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("grant_type", GRANT_REFRESH_TOKEN),
            ("scope", self.provider.scope.as_str()),
            ("refresh_token", refresh_token),
            ("redirect_uri", self.provider.redirect_uri.as_str()),
        ];
        let (status, body) = self.post_token_form(&form).await?;
        let response = TokenResponse::parse(&body);
        if !response.is_bearer() {
            return Err(ExchangeError::Provider {
                status,
                error: response.error.unwrap_or_else(|| format!("http status {}", status)),
            });
        }
        let pair = response.into_pair();
        if pair.access_token.is_empty() {
            return Err(ExchangeError::Provider {
                status,
                error: "access_token missing from response".to_owned(),
            });
        }
        Ok(pair)
    }

    async fn request_resource(
        &self,
        access_token: &str,
        resource_path: &str,
    ) -> Result<String, ExchangeError> {
        let url = self.provider.resource_url(resource_path);
        debug!("fetching resource {}", url);
        let response = self.client.get(&url).bearer_auth(access_token).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ExchangeError::Provider {
                status: status.as_u16(),
                error: resource_error(&body).unwrap_or_else(|| format!("http status {}", status)),
            });
        }
        Ok(body)
    }

    async fn post_token_form(&self, form: &[(&str, &str)]) -> Result<(u16, String), ExchangeError> {
        let response = self
            .client
            .post(self.provider.token_url())
            .form(form)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok((status, body))
    }
}

/// Token endpoints report `error` as a string, the resource API as an object with a `code`.
fn resource_error(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("error")? {
        Value::String(code) => Some(code.to_owned()),
        Value::Object(obj) => obj.get("code").and_then(Value::as_str).map(str::to_owned),
        _ => None,
    }
}

async fn observe<T>(
    kind: &str,
    exchange: impl std::future::Future<Output = Result<T, ExchangeError>>,
) -> Result<T, ExchangeError> {
    let metrics = get_metrics().await;
    let start = get_instant();
    metrics.exchange_requests.with_label_values(&[kind]).inc();

    let result = exchange.await;

    metrics.exchange_duration.with_label_values(&[kind]).observe(start.elapsed().as_secs_f64());
    if let Err(err) = &result {
        warn!("{} exchange failed: {}", kind, err);
        metrics.exchange_failures.with_label_values(&[kind, err.reason()]).inc();
    }
    result
}
