#![allow(missing_docs, unused_results)]

mod common;

use std::sync::Arc;

use appgw_auth::{AuthStore, GatewayRouter, MemoryAuthStore, OperationKind};
use appgw_browser::{BrowserSession, SESSION_EXPIRED_PROMPT};
use appgw_core::{ErrorScope, ProxyConfig};
use appgw_settings::TokenServiceSettings;
use common::*;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn sign_in_success_replaces_traits_and_switches_agent_data() {
    let runner = FakeRunner::new();
    let session = signed_in(&runner, Arc::new(MemoryAuthStore::new())).await;

    assert_eq!(session.traits().session(), Some("S1"));
    assert_eq!(session.traits().agent_id(), Some("a1"));
    assert_eq!(session.agent_store().switched, vec!["a1"]);
    assert_eq!(session.page().busy_calls, 1);

    let status = session.status();
    assert!(status.connected);
    assert_eq!(status.account.as_deref(), Some("alice"));
    assert_eq!(status.agent_name.as_deref(), Some("Lab"));
}

#[tokio::test]
async fn sign_in_failure_shows_error_inline() {
    let runner = FakeRunner::new();
    runner.push(auth_err(ErrorScope::Token, "Authentication Failure: Bad password."));
    let mut session = new_session(&runner, Arc::new(MemoryAuthStore::new()));

    session.sign_in(alice());
    session.settle().await;

    assert!(session.is_signin_required());
    assert_eq!(
        session.page().sign_in_prompts(),
        vec![Some("Token error - Authentication Failure: Bad password.".to_owned())]
    );
    assert!(session.agent_store().switched.is_empty());
}

#[tokio::test]
async fn sign_in_with_stored_uses_saved_credentials() {
    let runner = FakeRunner::new();
    runner.push(auth_ok(&lab(), "S1"));
    let mut session = new_session(&runner, Arc::new(MemoryAuthStore::with_credentials(alice())));

    assert!(session.sign_in_with_stored());
    session.settle().await;
    assert_eq!(runner.calls(OperationKind::Authenticate), 1);
    assert!(!session.is_signin_required());
}

#[tokio::test]
async fn sign_out_discards_in_flight_sign_in() {
    let runner = FakeRunner::new();
    let gate = runner.hold(OperationKind::Authenticate);
    runner.push(auth_ok(&lab(), "S1"));
    let mut session = new_session(&runner, Arc::new(MemoryAuthStore::new()));

    session.sign_in(alice());
    session.sign_out();
    gate.notify_one();
    session.settle().await;

    assert!(session.is_signin_required());
    assert!(session.traits().session().is_none());
    assert!(session.agent_store().switched.is_empty());
    assert_eq!(session.page().busy_calls, 1);
    assert_eq!(session.page().idle_calls, 1);
}

#[tokio::test]
async fn list_agents_marks_current_and_skips_malformed() {
    let runner = FakeRunner::new();
    let mut session = signed_in(&runner, Arc::new(MemoryAuthStore::new())).await;
    runner.push(agents_ok(vec![
        json!({"agent_id": "a1", "display_name": "Lab"}),
        json!({"agent_id": "broken"}),
        json!({"agent_id": "a2", "display_name": "Branch"}),
    ]));

    assert!(session.list_agents());
    session.settle().await;

    assert_eq!(
        session.page().events.last(),
        Some(&PageEvent::Agents(vec![
            "[CURRENTLY IN USE] Lab".to_owned(),
            "Branch".to_owned()
        ]))
    );
}

#[tokio::test]
async fn list_agents_without_token_prompts_sign_in() {
    let runner = FakeRunner::new();
    let mut session = new_session(&runner, Arc::new(MemoryAuthStore::new()));
    assert!(!session.list_agents());
    assert_eq!(runner.calls(OperationKind::ObtainAgents), 0);
    assert_eq!(session.page().sign_in_prompts(), vec![None]);
}

#[tokio::test]
async fn select_agent_rebinds_session_and_remembers_choice() {
    let runner = FakeRunner::new();
    let store = Arc::new(MemoryAuthStore::new());
    let mut session = signed_in(&runner, Arc::clone(&store)).await;
    runner.push(session_ok("S2"));

    assert!(session.select_agent(branch()));
    session.settle().await;

    assert_eq!(session.traits().agent_id(), Some("a2"));
    assert_eq!(session.traits().session(), Some("S2"));
    assert_eq!(store.load_preferred_agent(), Some(branch()));
    assert_eq!(session.agent_store().switched, vec!["a1", "a2"]);
}

#[tokio::test]
async fn selecting_agent_in_use_is_noop() {
    let runner = FakeRunner::new();
    let mut session = signed_in(&runner, Arc::new(MemoryAuthStore::new())).await;
    assert!(!session.select_agent(lab()));
    assert_eq!(runner.calls(OperationKind::ObtainSession), 0);
}

#[tokio::test]
async fn select_agent_failure_notifies_and_keeps_binding() {
    let runner = FakeRunner::new();
    let store = Arc::new(MemoryAuthStore::new());
    let mut session = signed_in(&runner, Arc::clone(&store)).await;
    runner.push(session_err());

    session.select_agent(branch());
    session.settle().await;

    assert_eq!(
        session.page().events.last(),
        Some(&PageEvent::Error("Session error - Session is null or empty.".to_owned()))
    );
    assert_eq!(session.traits().agent_id(), Some("a1"));
    assert!(store.load_preferred_agent().is_none());
}

// ─────────────────────────────────────────────────────────────────────────────
// Against a mock gateway
// ─────────────────────────────────────────────────────────────────────────────

const TOKEN_BODY: &str = "<S:Envelope><S:Body><wst:RequestedSecurityToken>T1</wst:RequestedSecurityToken></S:Body></S:Envelope>";

#[tokio::test]
async fn gateway_router_drives_sign_in_browse_and_recovery() {
    let server = MockServer::start().await;
    let token_header = "<wst:RequestedSecurityToken>T1</wst:RequestedSecurityToken>";
    Mock::given(method("POST"))
        .and(path("/extSTS.srf"))
        .respond_with(ResponseTemplate::new(200).set_body_string(TOKEN_BODY))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/user/agents"))
        .and(header("X-Bhut-AuthN-Token", token_header))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "agents": [{"agent_id": "a1", "display_name": "Lab"}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/user/session"))
        .and(body_json(json!({"agent_id": "a1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"session_id": "S1"})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/user/session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"session_id": "S2"})))
        .mount(&server)
        .await;

    let proxy = ProxyConfig::new(format!("{}/", server.uri()), false).into_shared();
    let store = Arc::new(MemoryAuthStore::new());
    let token_service = TokenServiceSettings {
        endpoint: format!("{}/extSTS.srf", server.uri()),
        ..TokenServiceSettings::default()
    };
    let router = Arc::new(GatewayRouter::with_client(
        reqwest::Client::new(),
        token_service,
        Arc::clone(&proxy),
        store.clone(),
    ));
    let mut session = BrowserSession::new(
        router,
        proxy,
        store.clone(),
        RecordingPage::default(),
        RecordingAgentStore::default(),
    );

    session.sign_in(alice());
    session.settle().await;
    assert_eq!(session.traits().session(), Some("S1"));
    assert_eq!(store.load_credentials(), Some(alice()));

    assert!(session.navigate("intranet/app"));
    let endpoint = format!("{}/connect/browser/", server.uri());
    let page_url = format!("{endpoint}S1/http/intranet/app");
    assert_eq!(session.page().loads(), vec![page_url.as_str()]);

    session.on_page_started(&page_url);
    session.on_page_started(&format!("{endpoint}S1/http/intranet/session-expired/?orig_url=x"));
    session.settle().await;

    assert_eq!(session.traits().session(), Some("S2"));
    assert_eq!(
        session.page().loads().last().copied(),
        Some(format!("{endpoint}S2/http/intranet/app").as_str())
    );
    assert!(!session.page().sign_in_prompts().contains(&Some(SESSION_EXPIRED_PROMPT.to_owned())));
}
