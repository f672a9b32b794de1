//! Gateway router: the four primitives plus the authentication orchestrator.
//!
//! [`GatewayRouter::authenticate`] runs Token → Agent → Session strictly in
//! order and stops at the first step that leaves an error on the traits.
//! Credentials are handed to the [`AuthStore`] only after all three succeed.

use std::sync::Arc;
use std::time::Duration;

use appgw_core::{AgentEntity, ConnectionTraits, Credentials, ProxyConfig, SharedProxy};
use appgw_settings::{GatewaySettings, TokenServiceSettings};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use crate::errors::AuthError;
use crate::operation::{Operation, OperationOutput, OperationRunner};
use crate::storage::AuthStore;
use crate::{agents, session, token};

/// HTTP-backed implementation of every gateway operation.
pub struct GatewayRouter {
    client: reqwest::Client,
    proxy: SharedProxy,
    token_service: TokenServiceSettings,
    store: Arc<dyn AuthStore>,
}

impl GatewayRouter {
    /// Build a router with an HTTP client configured from `settings`.
    pub fn new(
        settings: &GatewaySettings,
        proxy: SharedProxy,
        store: Arc<dyn AuthStore>,
    ) -> Result<Self, AuthError> {
        let mut builder = reqwest::Client::builder();
        if let Some(ms) = settings.http.timeout_ms {
            builder = builder.timeout(Duration::from_millis(ms));
        }
        Ok(Self::with_client(
            builder.build()?,
            settings.token.clone(),
            proxy,
            store,
        ))
    }

    /// Build a router around an existing HTTP client.
    pub fn with_client(
        client: reqwest::Client,
        token_service: TokenServiceSettings,
        proxy: SharedProxy,
        store: Arc<dyn AuthStore>,
    ) -> Self {
        Self {
            client,
            proxy,
            token_service,
            store,
        }
    }

    /// Storage collaborator used for credentials and the preferred agent.
    pub fn store(&self) -> &Arc<dyn AuthStore> {
        &self.store
    }

    fn proxy_snapshot(&self) -> ProxyConfig {
        self.proxy.read().clone()
    }

    /// Exchange credentials for a token.
    pub async fn obtain_token(&self, credentials: &Credentials) -> ConnectionTraits {
        token::obtain_token(&self.client, &self.token_service, credentials).await
    }

    /// Fetch the raw agent listing for `traits`' token.
    pub async fn obtain_agents(&self, mut traits: ConnectionTraits) -> (Vec<Value>, ConnectionTraits) {
        let proxy = self.proxy_snapshot();
        let agents = agents::obtain_agents(&self.client, &proxy, &mut traits).await;
        (agents.unwrap_or_default(), traits)
    }

    /// Fetch the listing and select an agent, honoring the stored preference.
    pub async fn obtain_agent(
        &self,
        mut traits: ConnectionTraits,
    ) -> (Option<AgentEntity>, ConnectionTraits) {
        let proxy = self.proxy_snapshot();
        let preferred = self.store.load_preferred_agent();
        let agent =
            agents::obtain_agent(&self.client, &proxy, &mut traits, preferred.as_ref()).await;
        (agent, traits)
    }

    /// Request a session for the agent in `agent_id_json`.
    pub async fn obtain_session(
        &self,
        mut traits: ConnectionTraits,
        agent_id_json: &str,
    ) -> (Option<String>, ConnectionTraits) {
        let proxy = self.proxy_snapshot();
        let session_id =
            session::obtain_session(&self.client, &proxy, &mut traits, agent_id_json).await;
        (session_id, traits)
    }

    /// Run Token → Agent → Session, stopping at the first error.
    ///
    /// On success the credentials are persisted and the returned traits hold
    /// token, agent, and session id with no error.
    #[tracing::instrument(skip_all, fields(username = %credentials.username))]
    pub async fn authenticate(&self, credentials: &Credentials) -> ConnectionTraits {
        let traits = self.obtain_token(credentials).await;
        if traits.is_error() {
            return traits;
        }

        let (agent, traits) = self.obtain_agent(traits).await;
        if traits.is_error() {
            return traits;
        }
        let Some(agent) = agent else {
            return traits;
        };

        let (_, traits) = self.obtain_session(traits, &agent.agent_id_json()).await;
        if traits.is_error() {
            return traits;
        }

        if let Err(e) = self.store.store_credentials(credentials) {
            warn!(error = %e, "failed to persist credentials");
        }
        info!(agent_id = %agent.agent_id, "authentication complete");
        traits
    }
}

impl std::fmt::Debug for GatewayRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayRouter")
            .field("proxy", &*self.proxy.read())
            .field("token_endpoint", &self.token_service.endpoint)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl OperationRunner for GatewayRouter {
    async fn run(&self, operation: Operation) -> OperationOutput {
        match operation {
            Operation::ObtainToken(credentials) => {
                OperationOutput::Token(self.obtain_token(&credentials).await)
            }
            Operation::ObtainAgents(traits) => {
                let (agents, traits) = self.obtain_agents(traits).await;
                OperationOutput::Agents { agents, traits }
            }
            Operation::ObtainAgent(traits) => {
                let (agent, traits) = self.obtain_agent(traits).await;
                OperationOutput::Agent { agent, traits }
            }
            Operation::ObtainSession {
                traits,
                agent_id_json,
            } => {
                let (session_id, traits) = self.obtain_session(traits, &agent_id_json).await;
                OperationOutput::Session { session_id, traits }
            }
            Operation::Authenticate(credentials) => {
                OperationOutput::Authenticated(self.authenticate(&credentials).await)
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryAuthStore;
    use appgw_core::logging::capture_logs;
    use appgw_core::{ErrorKind, ErrorScope};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TOKEN_BODY: &str =
        "<S:Envelope><S:Body><wst:RequestedSecurityToken>T1</wst:RequestedSecurityToken></S:Body></S:Envelope>";
    const FAULT_BODY: &str = "<S:Envelope><S:Body><S:Fault>\
        <S:Reason><S:Text>Authentication Failure</S:Text></S:Reason>\
        <S:Detail><psf:error><psf:internalerror><psf:text>Bad password.</psf:text>\
        </psf:internalerror></psf:error></S:Detail></S:Fault></S:Body></S:Envelope>";

    fn router(server: &MockServer, store: Arc<dyn AuthStore>) -> GatewayRouter {
        let token_service = TokenServiceSettings {
            endpoint: format!("{}/extSTS.srf", server.uri()),
            ..TokenServiceSettings::default()
        };
        let proxy = ProxyConfig::new(format!("{}/", server.uri()), false).into_shared();
        GatewayRouter::with_client(reqwest::Client::new(), token_service, proxy, store)
    }

    async fn mount_token(server: &MockServer, body: &str, calls: u64) {
        Mock::given(method("POST"))
            .and(path("/extSTS.srf"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .expect(calls)
            .mount(server)
            .await;
    }

    async fn mount_agents(server: &MockServer, body: serde_json::Value, calls: u64) {
        Mock::given(method("GET"))
            .and(path("/user/agents"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(calls)
            .mount(server)
            .await;
    }

    async fn mount_session(server: &MockServer, body: serde_json::Value, calls: u64) {
        Mock::given(method("POST"))
            .and(path("/user/session"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(calls)
            .mount(server)
            .await;
    }

    fn three_agents() -> serde_json::Value {
        json!({"agents": [
            {"agent_id": "a0", "display_name": "HQ"},
            {"agent_id": "a1", "display_name": "Lab"},
            {"agent_id": "a2", "display_name": "Branch"},
        ]})
    }

    #[tokio::test]
    async fn authenticate_runs_all_steps_and_stores_credentials() {
        let server = MockServer::start().await;
        mount_token(&server, TOKEN_BODY, 1).await;
        mount_agents(&server, three_agents(), 1).await;
        mount_session(&server, json!({"session_id": "S1"}), 1).await;

        let store = Arc::new(MemoryAuthStore::new());
        let router = router(&server, store.clone());
        let creds = Credentials::new("alice", "pw1");
        let traits = router.authenticate(&creds).await;

        assert_eq!(traits.error_text(), "");
        assert_eq!(traits.token.as_ref().unwrap().assertion(), "T1");
        assert_eq!(traits.agent_id(), Some("a0"));
        assert_eq!(traits.session(), Some("S1"));
        assert_eq!(store.load_credentials(), Some(creds));
    }

    #[tokio::test]
    async fn token_error_skips_agent_and_session() {
        let server = MockServer::start().await;
        mount_token(&server, FAULT_BODY, 1).await;
        mount_agents(&server, three_agents(), 0).await;
        mount_session(&server, json!({"session_id": "S1"}), 0).await;

        let store = Arc::new(MemoryAuthStore::new());
        let traits = router(&server, store.clone())
            .authenticate(&Credentials::new("alice", "bad"))
            .await;

        assert_eq!(
            traits.error_text(),
            "Token error - Authentication Failure: Bad password."
        );
        assert!(store.load_credentials().is_none());
    }

    #[tokio::test]
    async fn agent_error_skips_session_and_keeps_token() {
        let server = MockServer::start().await;
        mount_token(&server, TOKEN_BODY, 1).await;
        mount_agents(&server, json!({"agents": []}), 1).await;
        mount_session(&server, json!({"session_id": "S1"}), 0).await;

        let store = Arc::new(MemoryAuthStore::new());
        let traits = router(&server, store.clone())
            .authenticate(&Credentials::new("alice", "pw1"))
            .await;

        let err = traits.error.as_ref().unwrap();
        assert_eq!(err.scope, ErrorScope::Agent);
        assert_eq!(err.kind, ErrorKind::Business);
        assert_eq!(traits.token.as_ref().unwrap().assertion(), "T1");
        assert!(traits.session_id.is_none());
        assert!(store.load_credentials().is_none());
    }

    #[tokio::test]
    async fn preferred_agent_from_store_is_selected() {
        let server = MockServer::start().await;
        mount_token(&server, TOKEN_BODY, 1).await;
        mount_agents(&server, three_agents(), 1).await;
        Mock::given(method("POST"))
            .and(path("/user/session"))
            .and(wiremock::matchers::body_json(json!({"agent_id": "a2"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"session_id": "S2"})))
            .expect(1)
            .mount(&server)
            .await;

        let store = Arc::new(MemoryAuthStore::new().preferring(AgentEntity::new("a2", "Branch")));
        let traits = router(&server, store)
            .authenticate(&Credentials::new("alice", "pw1"))
            .await;

        assert_eq!(traits.agent_id(), Some("a2"));
        assert_eq!(traits.session(), Some("S2"));
    }

    #[tokio::test]
    async fn session_error_is_returned_as_is() {
        let server = MockServer::start().await;
        mount_token(&server, TOKEN_BODY, 1).await;
        mount_agents(&server, three_agents(), 1).await;
        mount_session(&server, json!({}), 1).await;

        let traits = router(&server, Arc::new(MemoryAuthStore::new()))
            .authenticate(&Credentials::new("alice", "pw1"))
            .await;

        assert_eq!(traits.error_text(), "Session error - Session is null or empty.");
        assert_eq!(traits.agent_id(), Some("a0"));
    }

    #[tokio::test]
    async fn runner_dispatches_by_operation() {
        let server = MockServer::start().await;
        mount_agents(&server, three_agents(), 1).await;

        let router = router(&server, Arc::new(MemoryAuthStore::new()));
        let traits = ConnectionTraits::with_token(appgw_core::SecurityToken::new("T"));
        let output = router.run(Operation::ObtainAgents(traits)).await;

        let OperationOutput::Agents { agents, traits } = output else {
            panic!("expected agents output");
        };
        assert_eq!(agents.len(), 3);
        assert!(!traits.is_error());
    }

    #[tokio::test]
    async fn password_never_logged() {
        let server = MockServer::start().await;
        mount_token(&server, FAULT_BODY, 1).await;

        let (logs, _guard) = capture_logs();
        let _ = router(&server, Arc::new(MemoryAuthStore::new()))
            .authenticate(&Credentials::new("alice", "s3cret-pw"))
            .await;

        assert!(logs.has_message("token request rejected"));
        assert!(!logs.has_message("s3cret-pw"));
        assert!(!logs.any_field_contains("s3cret-pw"));
    }

    #[test]
    fn new_honors_timeout_setting() {
        let mut settings = GatewaySettings::default();
        settings.http.timeout_ms = Some(1500);
        let router = GatewayRouter::new(
            &settings,
            ProxyConfig::default().into_shared(),
            Arc::new(MemoryAuthStore::new()),
        );
        assert!(router.is_ok());
    }
}
