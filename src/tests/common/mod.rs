// tests/common/mod.rs
pub use axum::Router;
pub use tokio::task::JoinHandle;

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};

use crate::config::provider::ProviderConfig;
use crate::config::settings::HttpConfig;
use crate::oauth::transport::build_client;
use crate::oauth::TokenExchanger;
use crate::store::{subject_digest, Binding, CredentialStore, MemoryStore};

pub const TOKEN_PATH: &str = "/common/oauth2/v2.0/token";
pub const PROFILE_PATH: &str = "/v1.0/me";
pub const PROBE_PATH: &str = "/v1.0/me/messages";

/// Spawn an Axum router on an ephemeral port and return (JoinHandle, SocketAddr)
pub async fn spawn_axum(router: Router) -> (JoinHandle<()>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    (handle, addr)
}

pub fn build_plain_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .expect("reqwest client")
}

/// Provider config with token endpoint and API both on `base_url`
pub fn provider_at(base_url: &str) -> ProviderConfig {
    ProviderConfig {
        authority_url: base_url.to_owned(),
        api_url: base_url.to_owned(),
        ..ProviderConfig::default()
    }
}

pub fn exchanger_at(base_url: &str) -> TokenExchanger {
    exchanger_with(base_url, 2_000)
}

pub fn exchanger_with(base_url: &str, request_timeout_ms: u64) -> TokenExchanger {
    let http = HttpConfig {
        request_timeout_ms,
        connect_timeout_ms: 1_000,
        ..HttpConfig::default()
    };
    let client = build_client(&http).expect("reqwest client");
    TokenExchanger::new(client, provider_at(base_url))
}

pub fn sample_binding(chat_identity: &str, client_id: &str, refresh_token: &str) -> Binding {
    Binding {
        id: 0,
        chat_identity: chat_identity.to_owned(),
        refresh_token: refresh_token.to_owned(),
        subject_id: subject_digest(&format!("remote-{}", refresh_token)),
        display_alias: format!("alias-{}", refresh_token),
        client_id: client_id.to_owned(),
        client_secret: format!("secret-{}", client_id),
        last_success_at: 1_000,
        extra: String::new(),
    }
}

/// Memory store whose writes can be switched off
#[derive(Debug, Clone, Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub fail_writes: Arc<AtomicBool>,
}

impl FlakyStore {
    pub fn failing_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        match self.fail_writes.load(Ordering::SeqCst) {
            true => Err(anyhow!("disk full")),
            false => Ok(()),
        }
    }
}

impl CredentialStore for FlakyStore {
    async fn insert(&self, binding: Binding) -> Result<Binding> {
        self.check()?;
        self.inner.insert(binding).await
    }

    async fn update(&self, binding: &Binding) -> Result<()> {
        self.check()?;
        self.inner.update(binding).await
    }

    async fn query_by_principal(&self, chat_identity: &str) -> Result<Vec<Binding>> {
        self.inner.query_by_principal(chat_identity).await
    }

    async fn query_all(&self) -> Result<Vec<Binding>> {
        self.inner.query_all().await
    }
}
