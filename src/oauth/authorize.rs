use anyhow::Result;
use url::form_urlencoded::byte_serialize;
use url::Url;

use crate::config::provider::ProviderConfig;

const REGISTER_APP_BASE: &str = "https://apps.dev.microsoft.com/";
const QUICK_START_URL: &str = "https://developer.microsoft.com/en-us/graph/quick-start?appID=_appId_&appName=_appName_&redirectUrl=http://localhost:8000&platform=option-windowsuniversal";
const APP_NAME: &str = "token-keeper";

/// URL the account owner opens to grant consent; the redirect carries `code`.
pub fn authorization_url(provider: &ProviderConfig, client_id: &str) -> Result<String> {
    let mut url = Url::parse(&provider.authorize_url())?;
    url.query_pairs_mut()
        .append_pair("client_id", client_id)
        .append_pair("response_type", "code")
        .append_pair("redirect_uri", &provider.redirect_uri)
        .append_pair("response_mode", "query")
        .append_pair("scope", &provider.scope);
    Ok(url.into())
}

/// Deep link into the provider's app registration quick start.
pub fn register_app_url(provider: &ProviderConfig) -> String {
    let deep_link = format!(
        "/quickstart/graphIO?publicClientSupport=false&appName={}&redirectUrl={}&allowImplicitFlow=false&ru={}",
        APP_NAME,
        provider.redirect_uri,
        escape(QUICK_START_URL)
    );
    format!("{}?deepLink={}", REGISTER_APP_BASE, escape(&deep_link))
}

fn escape(value: &str) -> String {
    byte_serialize(value.as_bytes()).collect()
}
