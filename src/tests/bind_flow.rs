// Bind workflow against an httpmock provider:
//  - token endpoint (POST, form encoded) -> bearer pair or a foreign token type
//  - profile endpoint (GET, bearer)      -> account id + display fields

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::Result;
    use httpmock::Method::{GET, POST};
    use httpmock::MockServer;
    use serde_json::json;

    use crate::store::{subject_digest, CredentialStore, MemoryStore};
    use crate::tests::common::{exchanger_at, sample_binding, FlakyStore, PROFILE_PATH, TOKEN_PATH};
    use crate::workflow::{BindError, BindingWorkflow};

    const INPUT: &str = "https://x/cb?code=abc123 alice";

    #[tokio::test]
    async fn bind_persists_binding_with_digest_and_alias() -> Result<()> {
        let server = MockServer::start_async().await;
        let token = server.mock_async(|when, then| {
            when.method(POST).path(TOKEN_PATH);
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!({"token_type": "Bearer", "access_token": "a1", "refresh_token": "r1"}));
        }).await;
        let profile = server.mock_async(|when, then| {
            when.method(GET).path(PROFILE_PATH).header("Authorization", "Bearer a1");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!({"id": "u1", "displayName": "Alice", "userPrincipalName": "alice@contoso"}));
        }).await;

        let store = Arc::new(MemoryStore::new());
        let workflow = BindingWorkflow::new(exchanger_at(&server.base_url()), store.clone());
        let outcome = workflow.bind("42", INPUT, "cid", "cse").await?;

        assert_eq!(token.hits_async().await, 1);
        assert_eq!(profile.hits_async().await, 1);
        assert_eq!(outcome.profile.display_name.as_deref(), Some("Alice"));
        assert_eq!(outcome.profile.user_principal_name.as_deref(), Some("alice@contoso"));

        let stored = store.query_by_principal("42").await?;
        assert_eq!(stored.len(), 1);
        let binding = &stored[0];
        assert_eq!(binding, &outcome.binding);
        assert_eq!(binding.display_alias, "alice");
        assert_eq!(binding.subject_id, subject_digest("u1"));
        assert_eq!(binding.refresh_token, "r1");
        assert_eq!(binding.client_id, "cid");
        assert_eq!(binding.client_secret, "cse");
        assert!(binding.last_success_at > 0);
        assert!(binding.extra.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn bearer_response_without_access_token_still_binds() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock_async(|when, then| {
            when.method(POST).path(TOKEN_PATH);
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!({"token_type": "Bearer", "refresh_token": "r1"}));
        }).await;
        let profile = server.mock_async(|when, then| {
            when.method(GET).path(PROFILE_PATH);
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!({"id": "u1"}));
        }).await;

        let store = Arc::new(MemoryStore::new());
        let workflow = BindingWorkflow::new(exchanger_at(&server.base_url()), store.clone());
        let outcome = workflow.bind("42", INPUT, "cid", "cse").await?;

        assert_eq!(profile.hits_async().await, 1);
        assert_eq!(outcome.binding.display_alias, "alice");
        assert_eq!(outcome.binding.refresh_token, "r1");
        assert_eq!(store.query_by_principal("42").await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn foreign_token_type_is_a_token_error_and_nothing_is_stored() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock_async(|when, then| {
            when.method(POST).path(TOKEN_PATH);
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!({"token_type": "MAC"}));
        }).await;
        let profile = server.mock_async(|when, then| {
            when.method(GET).path(PROFILE_PATH);
            then.status(200).json_body(json!({"id": "u1"}));
        }).await;

        let store = Arc::new(MemoryStore::new());
        let workflow = BindingWorkflow::new(exchanger_at(&server.base_url()), store.clone());
        let err = workflow.bind("42", INPUT, "cid", "cse").await.unwrap_err();

        assert!(matches!(err, BindError::Token(ref body) if body.contains("MAC")), "{err}");
        assert_eq!(profile.hits_async().await, 0);
        assert!(store.query_all().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn malformed_input_fails_before_any_network_call() -> Result<()> {
        let server = MockServer::start_async().await;
        let token = server.mock_async(|when, then| {
            when.method(POST).path(TOKEN_PATH);
            then.status(200).json_body(json!({"token_type": "Bearer", "refresh_token": "r1"}));
        }).await;

        let workflow = BindingWorkflow::new(exchanger_at(&server.base_url()), Arc::new(MemoryStore::new()));
        for input in ["", "alice", "https://x/cb?code=abc123", "https://x/cb?code=abc123 alice bob"] {
            let err = workflow.bind("42", input, "cid", "cse").await.unwrap_err();
            assert_eq!(err.kind(), "format", "input {:?}", input);
        }
        assert_eq!(token.hits_async().await, 0);
        Ok(())
    }

    #[tokio::test]
    async fn bearer_without_refresh_token_is_a_token_error() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock_async(|when, then| {
            when.method(POST).path(TOKEN_PATH);
            then.status(200).json_body(json!({"token_type": "Bearer", "access_token": "a1"}));
        }).await;

        let store = Arc::new(MemoryStore::new());
        let workflow = BindingWorkflow::new(exchanger_at(&server.base_url()), store.clone());
        let err = workflow.bind("42", INPUT, "cid", "cse").await.unwrap_err();

        assert_eq!(err.kind(), "token");
        assert!(store.query_all().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn profile_without_id_is_a_profile_error() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock_async(|when, then| {
            when.method(POST).path(TOKEN_PATH);
            then.status(200).json_body(json!({"token_type": "Bearer", "access_token": "a1", "refresh_token": "r1"}));
        }).await;
        server.mock_async(|when, then| {
            when.method(GET).path(PROFILE_PATH);
            then.status(401)
                .json_body(json!({"error": {"code": "InvalidAuthenticationToken", "message": "expired"}}));
        }).await;

        let store = Arc::new(MemoryStore::new());
        let workflow = BindingWorkflow::new(exchanger_at(&server.base_url()), store.clone());
        let err = workflow.bind("42", INPUT, "cid", "cse").await.unwrap_err();

        assert!(matches!(err, BindError::ProfileFetch(ref msg) if msg.contains("InvalidAuthenticationToken")), "{err}");
        assert!(store.query_all().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn second_bind_of_same_application_is_rejected() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock_async(|when, then| {
            when.method(POST).path(TOKEN_PATH);
            then.status(200).json_body(json!({"token_type": "Bearer", "access_token": "a1", "refresh_token": "r1"}));
        }).await;
        server.mock_async(|when, then| {
            when.method(GET).path(PROFILE_PATH);
            then.status(200).json_body(json!({"id": "u2", "displayName": "Bob"}));
        }).await;

        let store = Arc::new(MemoryStore::new());
        store.insert(sample_binding("42", "cid", "r0")).await?;
        let before = store.query_by_principal("42").await?;

        let workflow = BindingWorkflow::new(exchanger_at(&server.base_url()), store.clone());
        let err = workflow.bind("42", INPUT, "cid", "cse").await.unwrap_err();
        assert!(matches!(err, BindError::Duplicate { ref client_id } if client_id == "cid"));
        assert_eq!(store.query_by_principal("42").await?, before);

        // another application, or another principal, is fine
        workflow.bind("42", INPUT, "other-cid", "cse").await?;
        workflow.bind("43", INPUT, "cid", "cse").await?;
        assert_eq!(store.query_by_principal("42").await?.len(), 2);
        assert_eq!(workflow.bindings_of("43").await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn failed_insert_is_a_persistence_error() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock_async(|when, then| {
            when.method(POST).path(TOKEN_PATH);
            then.status(200).json_body(json!({"token_type": "Bearer", "access_token": "a1", "refresh_token": "r1"}));
        }).await;
        server.mock_async(|when, then| {
            when.method(GET).path(PROFILE_PATH);
            then.status(200).json_body(json!({"id": "u1"}));
        }).await;

        let store = Arc::new(FlakyStore::default());
        store.failing_writes(true);
        let workflow = BindingWorkflow::new(exchanger_at(&server.base_url()), store.clone());
        let err = workflow.bind("42", INPUT, "cid", "cse").await.unwrap_err();

        assert_eq!(err.kind(), "persistence");
        assert!(store.query_all().await?.is_empty());
        Ok(())
    }
}
