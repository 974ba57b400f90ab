use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};
use url::Url;

use crate::helpers::time::now_i64;
use crate::oauth::exchanger::TokenExchanger;
use crate::observability::metrics::get_metrics;
use crate::store::{subject_digest, Binding, CredentialStore};
use crate::workflow::error::BindError;

static OK_MSG: &str = "ok";

/// Profile fields read from the provider's `me` endpoint
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Profile {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "displayName", default)]
    pub display_name: Option<String>,
    #[serde(rename = "userPrincipalName", default)]
    pub user_principal_name: Option<String>,
}

/// Successful bind: the persisted binding plus what the caller shows the user
#[derive(Debug, Clone)]
pub struct BindOutcome {
    pub binding: Binding,
    pub profile: Profile,
}

/// Parsed `"<redirect-url> <alias>"` input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindRequest {
    pub code: String,
    pub alias: String,
}

impl BindRequest {
    /// Accepts exactly two whitespace separated tokens; the first must be a
    /// URL whose query carries a non-empty `code`.
    pub fn parse(input: &str) -> Result<Self, BindError> {
        let tokens: Vec<&str> = input.split_whitespace().collect();
        let [redirect, alias] = tokens.as_slice() else {
            return Err(BindError::Format(format!("expected 2 tokens, got {}", tokens.len())));
        };

        let url = Url::parse(redirect)
            .map_err(|e| BindError::Format(format!("invalid redirect url: {}", e)))?;
        let code = url
            .query_pairs()
            .find(|(key, _)| key == "code")
            .map(|(_, value)| value.into_owned())
            .filter(|code| !code.is_empty())
            .ok_or_else(|| BindError::Format("redirect url has no 'code' parameter".to_owned()))?;

        Ok(Self { code, alias: (*alias).to_owned() })
    }
}

/// One-shot binding of a principal to a remote account.
pub struct BindingWorkflow<S> {
    exchanger: TokenExchanger,
    store: Arc<S>,
}

impl<S: CredentialStore> BindingWorkflow<S> {
    pub fn new(exchanger: TokenExchanger, store: Arc<S>) -> Self {
        Self { exchanger, store }
    }

    pub async fn bind(
        &self,
        chat_identity: &str,
        input: &str,
        client_id: &str,
        client_secret: &str,
    ) -> Result<BindOutcome, BindError> {
        info!("{} begin bind", chat_identity);
        let metrics = get_metrics().await;
        let result = self.try_bind(chat_identity, input, client_id, client_secret).await;
        match &result {
            Ok(outcome) => {
                info!("{} bind successful, subject {}", chat_identity, outcome.binding.subject_id);
                metrics.bind_attempts.with_label_values(&[OK_MSG]).inc();
            }
            Err(err) => {
                warn!("{} bind error: {}", chat_identity, err);
                metrics.bind_attempts.with_label_values(&[err.kind()]).inc();
            }
        }
        result
    }

    /// Bindings of one principal, used for counts and listings
    pub async fn bindings_of(&self, chat_identity: &str) -> anyhow::Result<Vec<Binding>> {
        self.store.query_by_principal(chat_identity).await
    }

    async fn try_bind(
        &self,
        chat_identity: &str,
        input: &str,
        client_id: &str,
        client_secret: &str,
    ) -> Result<BindOutcome, BindError> {
        let request = BindRequest::parse(input)?;

        let tokens = self
            .exchanger
            .exchange_code(&request.code, client_id, client_secret)
            .await
            .map_err(|e| BindError::Token(e.to_string()))?;
        if tokens.refresh_token.is_empty() {
            return Err(BindError::Token("provider returned no refresh token".to_owned()));
        }

        let payload = self
            .exchanger
            .fetch_resource(&tokens.access_token, &self.exchanger.provider().profile_path)
            .await
            .map_err(|e| BindError::ProfileFetch(e.to_string()))?;
        let profile: Profile = serde_json::from_str(&payload)
            .map_err(|e| BindError::ProfileFetch(format!("unreadable profile: {}", e)))?;
        if profile.id.is_empty() {
            return Err(BindError::ProfileFetch("profile carries no id".to_owned()));
        }

        // one binding per application and principal
        let existing = self
            .store
            .query_by_principal(chat_identity)
            .await
            .map_err(|e| BindError::Persistence(e.to_string()))?;
        if existing.iter().any(|b| b.client_id == client_id) {
            return Err(BindError::Duplicate { client_id: client_id.to_owned() });
        }

        let binding = Binding {
            id: 0,
            chat_identity: chat_identity.to_owned(),
            refresh_token: tokens.refresh_token,
            subject_id: subject_digest(&profile.id),
            display_alias: request.alias,
            client_id: client_id.to_owned(),
            client_secret: client_secret.to_owned(),
            last_success_at: now_i64(),
            extra: String::new(),
        };
        let binding = self
            .store
            .insert(binding)
            .await
            .map_err(|e| BindError::Persistence(e.to_string()))?;

        Ok(BindOutcome { binding, profile })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_code_and_alias() {
        let req = BindRequest::parse("https://x/cb?code=abc123&session_state=s alice").unwrap();
        assert_eq!(req, BindRequest { code: "abc123".into(), alias: "alice".into() });
    }

    #[test]
    fn tolerates_surrounding_whitespace() {
        let req = BindRequest::parse("  http://localhost/e5sub?code=c1\talias \n").unwrap();
        assert_eq!(req.code, "c1");
        assert_eq!(req.alias, "alias");
    }

    #[test]
    fn rejects_wrong_token_count() {
        for input in ["", "https://x/cb?code=abc", "https://x/cb?code=abc alice extra"] {
            let err = BindRequest::parse(input).unwrap_err();
            assert_eq!(err.kind(), "format", "input {:?}", input);
        }
    }

    #[test]
    fn rejects_url_without_code() {
        assert!(matches!(BindRequest::parse("https://x/cb?state=1 alice"), Err(BindError::Format(_))));
        assert!(matches!(BindRequest::parse("https://x/cb?code= alice"), Err(BindError::Format(_))));
        assert!(matches!(BindRequest::parse("not-a-url alice"), Err(BindError::Format(_))));
    }
}
