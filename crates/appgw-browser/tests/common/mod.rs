#![allow(missing_docs, unused_results, dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use appgw_auth::{MemoryAuthStore, Operation, OperationKind, OperationOutput, OperationRunner};
use appgw_browser::{AgentListing, AgentScopedStore, BrowserSession, PageHost};
use appgw_core::{
    AgentEntity, ConnectionTraits, Credentials, ErrorScope, GatewayError, ProxyConfig,
    SecurityToken,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

pub const ROUTER: &str = "https://gw.example.com/";
pub const ENDPOINT: &str = "https://gw.example.com/connect/browser/";

// ─────────────────────────────────────────────────────────────────────────────
// Scripted runner
// ─────────────────────────────────────────────────────────────────────────────

/// Replays queued outputs per operation kind and records every call.
#[derive(Default)]
pub struct FakeRunner {
    script: Mutex<HashMap<OperationKind, VecDeque<OperationOutput>>>,
    calls: Mutex<Vec<Operation>>,
    gates: Mutex<HashMap<OperationKind, Arc<Notify>>>,
}

impl FakeRunner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, output: OperationOutput) {
        self.script
            .lock()
            .entry(output.kind())
            .or_default()
            .push_back(output);
    }

    /// Make runs of `kind` wait until the returned gate is notified.
    pub fn hold(&self, kind: OperationKind) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates.lock().insert(kind, Arc::clone(&gate));
        gate
    }

    pub fn calls(&self, kind: OperationKind) -> usize {
        self.calls.lock().iter().filter(|op| op.kind() == kind).count()
    }

    pub fn last_call(&self, kind: OperationKind) -> Option<Operation> {
        self.calls
            .lock()
            .iter()
            .rev()
            .find(|op| op.kind() == kind)
            .cloned()
    }
}

#[async_trait]
impl OperationRunner for FakeRunner {
    async fn run(&self, operation: Operation) -> OperationOutput {
        let kind = operation.kind();
        self.calls.lock().push(operation);
        let gate = self.gates.lock().get(&kind).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let scripted = self.script.lock().get_mut(&kind).and_then(VecDeque::pop_front);
        scripted.unwrap_or_else(|| {
            OperationOutput::Token(ConnectionTraits::failed(GatewayError::business(
                ErrorScope::Token,
                format!("unscripted {kind}"),
            )))
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Outputs
// ─────────────────────────────────────────────────────────────────────────────

pub fn connected(agent: &AgentEntity, session_id: &str) -> ConnectionTraits {
    let mut traits = ConnectionTraits::with_token(SecurityToken::new("T1"));
    traits.set_agent(agent.clone());
    traits.set_session(session_id);
    traits
}

pub fn auth_ok(agent: &AgentEntity, session_id: &str) -> OperationOutput {
    OperationOutput::Authenticated(connected(agent, session_id))
}

pub fn auth_err(scope: ErrorScope, message: &str) -> OperationOutput {
    OperationOutput::Authenticated(ConnectionTraits::failed(GatewayError::business(
        scope, message,
    )))
}

pub fn session_ok(session_id: &str) -> OperationOutput {
    let mut traits = ConnectionTraits::with_token(SecurityToken::new("T1"));
    traits.set_session(session_id);
    OperationOutput::Session {
        session_id: Some(session_id.to_owned()),
        traits,
    }
}

pub fn session_err() -> OperationOutput {
    OperationOutput::Session {
        session_id: None,
        traits: ConnectionTraits::failed(GatewayError::business(
            ErrorScope::Session,
            "Session is null or empty.",
        )),
    }
}

pub fn agents_ok(agents: Vec<serde_json::Value>) -> OperationOutput {
    OperationOutput::Agents {
        agents,
        traits: ConnectionTraits::with_token(SecurityToken::new("T1")),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Collaborators
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageEvent {
    Load(String),
    Stop,
    SignIn(Option<String>),
    Error(String),
    Agents(Vec<String>),
}

#[derive(Debug, Default)]
pub struct RecordingPage {
    pub events: Vec<PageEvent>,
    pub busy_calls: usize,
    pub idle_calls: usize,
}

impl RecordingPage {
    pub fn loads(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                PageEvent::Load(url) => Some(url.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, wanted: fn(&PageEvent) -> bool) -> usize {
        self.events.iter().filter(|e| wanted(e)).count()
    }

    pub fn sign_in_prompts(&self) -> Vec<Option<String>> {
        self.events
            .iter()
            .filter_map(|e| match e {
                PageEvent::SignIn(message) => Some(message.clone()),
                _ => None,
            })
            .collect()
    }
}

impl PageHost for RecordingPage {
    fn load_url(&mut self, url: &str) {
        self.events.push(PageEvent::Load(url.to_owned()));
    }

    fn stop_loading(&mut self) {
        self.events.push(PageEvent::Stop);
    }

    fn show_sign_in(&mut self, message: Option<&str>) {
        self.events.push(PageEvent::SignIn(message.map(str::to_owned)));
    }

    fn notify_error(&mut self, message: &str) {
        self.events.push(PageEvent::Error(message.to_owned()));
    }

    fn show_agents(&mut self, agents: &[AgentListing]) {
        self.events
            .push(PageEvent::Agents(agents.iter().map(AgentListing::label).collect()));
    }

    fn show_activity(&mut self, busy: bool) {
        if busy {
            self.busy_calls += 1;
        } else {
            self.idle_calls += 1;
        }
    }
}

#[derive(Debug, Default)]
pub struct RecordingAgentStore {
    pub switched: Vec<String>,
}

impl AgentScopedStore for RecordingAgentStore {
    fn switch_agent(&mut self, agent_id: &str) -> std::io::Result<()> {
        self.switched.push(agent_id.to_owned());
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Fixtures
// ─────────────────────────────────────────────────────────────────────────────

pub type TestSession = BrowserSession<FakeRunner, RecordingPage, RecordingAgentStore>;

pub fn lab() -> AgentEntity {
    AgentEntity::new("a1", "Lab")
}

pub fn branch() -> AgentEntity {
    AgentEntity::new("a2", "Branch")
}

pub fn alice() -> Credentials {
    Credentials::new("alice", "pw1")
}

pub fn new_session(runner: &Arc<FakeRunner>, store: Arc<MemoryAuthStore>) -> TestSession {
    BrowserSession::new(
        Arc::clone(runner),
        ProxyConfig::new(ROUTER, false).into_shared(),
        store,
        RecordingPage::default(),
        RecordingAgentStore::default(),
    )
}

/// Session signed in as alice on agent `lab` with session `S1`.
pub async fn signed_in(runner: &Arc<FakeRunner>, store: Arc<MemoryAuthStore>) -> TestSession {
    runner.push(auth_ok(&lab(), "S1"));
    let mut session = new_session(runner, store);
    let _ = session.sign_in(alice());
    session.settle().await;
    assert!(!session.is_signin_required());
    session
}

pub fn cloud(session_id: &str, rest: &str) -> String {
    format!("{ENDPOINT}{session_id}/http/{rest}")
}
