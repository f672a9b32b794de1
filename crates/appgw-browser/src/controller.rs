//! Browser session controller.
//!
//! [`BrowserSession`] is the owning context: it holds the connection traits,
//! the sign-in flag and the recovery machine, submits operations to the
//! executor, and applies their completions when pumped. Nothing else mutates
//! that state.

use std::sync::Arc;

use appgw_auth::agents::parse_agent_entry;
use appgw_auth::{AuthStore, Operation, OperationOutput, OperationRunner};
use appgw_core::constants::HTTP_PREFIX;
use appgw_core::{AgentEntity, ConnectionTraits, Credentials, ProxyConfig, SharedProxy, normalize_router_url};
use appgw_runtime::{Completion, ExecutionListener, Executor, Inbox, Ticket, channel};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::page::{AgentListing, AgentScopedStore, PageHost, SESSION_EXPIRED_PROMPT};
use crate::recovery::{PageStartAction, RecoveryStage, SessionRecovery};
use crate::rewrite::UrlRewriter;

/// Why an operation was submitted; decides how its completion is applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Purpose {
    /// Interactive or stored-credential sign-in.
    SignIn,
    /// Attempt 1 of the numbered recovery.
    RecoveryRefresh(u32),
    /// Attempt 2 of the numbered recovery.
    RecoveryReauth(u32),
    /// Agent chooser listing.
    AgentList,
    /// Rebind the session to another agent.
    AgentSwitch(AgentEntity),
}

/// Diagnostics snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    /// Username of the last sign-in attempt.
    pub account: Option<String>,
    /// Proxy origin.
    pub router: String,
    /// Smart-browser mode.
    pub smart_browser: bool,
    /// Display name of the bound agent.
    pub agent_name: Option<String>,
    /// Id of the bound agent.
    pub agent_id: Option<String>,
    /// Current session id.
    pub session_id: Option<String>,
    /// A token is held.
    pub has_token: bool,
    /// Session established and no sign-in pending.
    pub connected: bool,
    /// The user must sign in before browsing.
    pub signin_required: bool,
    /// A session-expiry recovery is running.
    pub recovering: bool,
    /// Operations still running on workers.
    pub pending: usize,
}

/// Owning context for one browsing session.
pub struct BrowserSession<R, H, S>
where
    R: OperationRunner + ?Sized,
    H: PageHost,
    S: AgentScopedStore,
{
    executor: Executor<R, Purpose>,
    inbox: Inbox<Purpose>,
    proxy: SharedProxy,
    store: Arc<dyn AuthStore>,
    page: H,
    agent_store: S,
    traits: ConnectionTraits,
    signin_required: bool,
    user_original_uri: Option<String>,
    account: Option<String>,
    recovery: SessionRecovery,
}

impl<R, H, S> BrowserSession<R, H, S>
where
    R: OperationRunner + ?Sized,
    H: PageHost,
    S: AgentScopedStore,
{
    /// Signed-out session. Operations require a tokio runtime.
    pub fn new(
        runner: Arc<R>,
        proxy: SharedProxy,
        store: Arc<dyn AuthStore>,
        page: H,
        agent_store: S,
    ) -> Self {
        let (executor, inbox) = channel(runner);
        Self {
            executor,
            inbox,
            proxy,
            store,
            page,
            agent_store,
            traits: ConnectionTraits::new(),
            signin_required: true,
            user_original_uri: None,
            account: None,
            recovery: SessionRecovery::new(),
        }
    }

    // ── accessors ───────────────────────────────────────────────────────

    /// Current connection traits.
    pub fn traits(&self) -> &ConnectionTraits {
        &self.traits
    }

    /// The page host.
    pub fn page(&self) -> &H {
        &self.page
    }

    /// The page host, mutably.
    pub fn page_mut(&mut self) -> &mut H {
        &mut self.page
    }

    /// The agent-scoped store.
    pub fn agent_store(&self) -> &S {
        &self.agent_store
    }

    /// The recovery machine.
    pub fn recovery(&self) -> &SessionRecovery {
        &self.recovery
    }

    /// Sign-in is required before browsing.
    pub fn is_signin_required(&self) -> bool {
        self.signin_required
    }

    /// URL the user last entered, in normal form.
    pub fn user_original_uri(&self) -> Option<&str> {
        self.user_original_uri.as_deref()
    }

    /// Rewriter for the current proxy configuration.
    pub fn rewriter(&self) -> UrlRewriter {
        UrlRewriter::new(&self.proxy.read())
    }

    fn submit(&mut self, operation: Operation, purpose: Purpose) -> Ticket<Purpose> {
        let executor = self.executor.clone();
        executor.perform(operation, purpose, self)
    }

    // ── navigation ──────────────────────────────────────────────────────

    /// Load user input, assuming `http://` when no scheme is given.
    pub fn navigate(&mut self, input: &str) -> bool {
        let input = input.trim();
        let uri = if input.starts_with("http") {
            input.to_owned()
        } else {
            format!("{HTTP_PREFIX}{input}")
        };
        self.recovery.abandon();
        self.user_original_uri = Some(uri.clone());
        self.go_to_url(&uri)
    }

    /// Load a normal-form URL through the proxy.
    ///
    /// Without a session the user is sent to sign-in and `false` is returned.
    pub fn go_to_url(&mut self, normal_url: &str) -> bool {
        let Some(session_id) = self.traits.session().map(str::to_owned) else {
            debug!("no session, sign-in required");
            self.signin_required = true;
            self.page.show_sign_in(None);
            return false;
        };
        let url = self.rewriter().to_cloud(
            normal_url,
            Some(&session_id),
            self.user_original_uri.as_deref(),
        );
        self.page.load_url(&url);
        true
    }

    /// Reload a page, re-cloudifying it with the current session id.
    pub fn reload(&mut self, current_cloud_url: &str) -> bool {
        if self.signin_required {
            self.page.show_sign_in(None);
            return false;
        }
        let normal = self.rewriter().to_normal(current_cloud_url);
        self.go_to_url(&normal)
    }

    /// A page started loading. Feeds the recovery machine.
    pub fn on_page_started(&mut self, url: &str) -> PageStartAction {
        let rewriter = self.rewriter();
        let action = self.recovery.on_page_started(url, &rewriter);
        match action {
            PageStartAction::Continue => {}
            PageStartAction::Halt => self.page.stop_loading(),
            PageStartAction::BeginRecovery => {
                self.page.stop_loading();
                let attempt = self.recovery.attempts();
                let _ = self.submit(
                    Operation::refresh_session(self.traits.clone()),
                    Purpose::RecoveryRefresh(attempt),
                );
            }
        }
        action
    }

    /// A page finished loading.
    pub fn on_page_finished(&mut self) {
        self.recovery.on_load_complete();
    }

    // ── authentication ──────────────────────────────────────────────────

    /// Run the full authentication pipeline with `credentials`.
    pub fn sign_in(&mut self, credentials: Credentials) -> Ticket<Purpose> {
        self.account = Some(credentials.username.clone());
        self.submit(Operation::Authenticate(credentials), Purpose::SignIn)
    }

    /// Sign in with stored credentials; prompts when there are none.
    pub fn sign_in_with_stored(&mut self) -> bool {
        match self.store.load_credentials().filter(Credentials::is_complete) {
            Some(credentials) => {
                let _ = self.sign_in(credentials);
                true
            }
            None => {
                self.signin_required = true;
                self.page.show_sign_in(None);
                false
            }
        }
    }

    /// Drop token, agent, and session. In-flight results are discarded.
    pub fn sign_out(&mut self) {
        self.traits.reset();
        self.signin_required = true;
        self.recovery.abandon();
        let _ = self.executor.advance_generation();
        info!("signed out");
        self.page.show_sign_in(None);
    }

    fn apply_authenticated(&mut self, traits: ConnectionTraits) {
        self.traits = traits;
        self.signin_required = false;
        self.switch_agent_store();
    }

    fn switch_agent_store(&mut self) {
        let Some(agent_id) = self.traits.agent_id().map(str::to_owned) else {
            return;
        };
        if let Err(e) = self.agent_store.switch_agent(&agent_id) {
            warn!(agent_id, error = %e, "failed to switch agent data");
        }
    }

    // ── agents ──────────────────────────────────────────────────────────

    /// Fetch the agent directory for the chooser.
    pub fn list_agents(&mut self) -> bool {
        if !self.traits.has_token() {
            self.signin_required = true;
            self.page.show_sign_in(None);
            return false;
        }
        let _ = self.submit(
            Operation::ObtainAgents(self.traits.clone()),
            Purpose::AgentList,
        );
        true
    }

    /// Bind the session to `agent`. No-op for the agent already in use.
    pub fn select_agent(&mut self, agent: AgentEntity) -> bool {
        if self.traits.agent.as_ref().is_some_and(|a| a.matches(&agent)) {
            debug!(agent_id = %agent.agent_id, "agent already in use");
            return false;
        }
        let operation = Operation::switch_agent(self.traits.clone(), &agent);
        let _ = self.submit(operation, Purpose::AgentSwitch(agent));
        true
    }

    fn listings(&self, agents: &[serde_json::Value]) -> Vec<AgentListing> {
        agents
            .iter()
            .filter_map(parse_agent_entry)
            .map(|agent| AgentListing {
                in_use: self.traits.agent.as_ref().is_some_and(|a| a.matches(&agent)),
                agent,
            })
            .collect()
    }

    // ── router settings ─────────────────────────────────────────────────

    /// Apply a router URL and smart-mode choice.
    ///
    /// Returns the new configuration when it changed; the caller persists it.
    /// A change invalidates the session.
    pub fn apply_router_settings(&mut self, url: &str, smart_browser: bool) -> Option<ProxyConfig> {
        let host_prefix = normalize_router_url(url);
        let updated = {
            let mut proxy = self.proxy.write();
            if proxy.host_prefix() == host_prefix && proxy.smart_browser() == smart_browser {
                return None;
            }
            proxy.set_host_prefix(host_prefix);
            proxy.set_smart_browser(smart_browser);
            (*proxy).clone()
        };
        info!(router = updated.host_prefix(), smart_browser, "router settings changed");
        self.traits.reset();
        self.signin_required = true;
        self.recovery.abandon();
        let _ = self.executor.advance_generation();
        self.page.show_sign_in(None);
        Some(updated)
    }

    // ── diagnostics ─────────────────────────────────────────────────────

    /// Diagnostics snapshot.
    pub fn status(&self) -> SessionStatus {
        let proxy = self.proxy.read();
        let session_id = self.traits.session().map(str::to_owned);
        SessionStatus {
            account: self.account.clone(),
            router: proxy.host_prefix().to_owned(),
            smart_browser: proxy.smart_browser(),
            agent_name: self.traits.agent.as_ref().map(|a| a.display_name.clone()),
            agent_id: self.traits.agent_id().map(str::to_owned),
            connected: session_id.is_some() && !self.signin_required,
            session_id,
            has_token: self.traits.has_token(),
            signin_required: self.signin_required,
            recovering: self.recovery.is_recovering(),
            pending: self.executor.pending(),
        }
    }

    // ── completion delivery ─────────────────────────────────────────────

    /// Wait for and apply the next completion.
    ///
    /// Returns `false` once nothing is outstanding.
    pub async fn pump(&mut self) -> bool {
        match self.inbox.recv().await {
            Some(completion) => {
                completion.dispatch(self);
                true
            }
            None => false,
        }
    }

    /// Apply a completion if one is already queued.
    pub fn try_pump(&mut self) -> bool {
        match self.inbox.try_recv() {
            Some(completion) => {
                completion.dispatch(self);
                true
            }
            None => false,
        }
    }

    /// Pump until no operation is outstanding.
    pub async fn settle(&mut self) {
        while self.pump().await {}
    }

    fn on_refresh_complete(&mut self, traits: &ConnectionTraits) {
        if let Some(session_id) = traits.session().filter(|_| !traits.is_error()) {
            self.traits.set_session(session_id);
            info!("session refreshed");
            self.resume_original();
            return;
        }
        debug!(error = %traits.error_text(), "session refresh failed");
        if !self.recovery.escalate() {
            return;
        }
        match self.store.load_credentials() {
            Some(credentials) => {
                let attempt = self.recovery.attempts();
                let _ = self.submit(
                    Operation::Authenticate(credentials),
                    Purpose::RecoveryReauth(attempt),
                );
            }
            None => self.fail_recovery(),
        }
    }

    fn on_reauth_complete(&mut self, traits: ConnectionTraits) {
        if traits.is_error() {
            warn!(error = %traits.error_text(), "reauthentication failed");
            self.fail_recovery();
            return;
        }
        self.apply_authenticated(traits);
        info!("session restored by reauthentication");
        self.resume_original();
    }

    fn resume_original(&mut self) {
        match self.recovery.finish() {
            Some(url) => {
                let _ = self.go_to_url(&url);
            }
            None => debug!("no original url to resume"),
        }
    }

    fn fail_recovery(&mut self) {
        let _ = self.recovery.finish();
        self.signin_required = true;
        self.page.show_sign_in(Some(SESSION_EXPIRED_PROMPT));
    }

    fn on_switch_complete(&mut self, agent: AgentEntity, session_id: Option<String>, traits: &ConnectionTraits) {
        let Some(session_id) = session_id.filter(|_| !traits.is_error()) else {
            self.page.notify_error(&traits.error_text());
            return;
        };
        if let Err(e) = self.store.store_preferred_agent(&agent) {
            warn!(error = %e, "failed to persist preferred agent");
        }
        info!(agent_id = %agent.agent_id, "agent switched");
        self.traits.set_agent(agent);
        self.traits.set_session(session_id);
        self.switch_agent_store();
    }
}

impl<R, H, S> ExecutionListener<Purpose> for BrowserSession<R, H, S>
where
    R: OperationRunner + ?Sized,
    H: PageHost,
    S: AgentScopedStore,
{
    fn on_before_execution(&mut self, ticket: &Ticket<Purpose>) {
        debug!(id = ticket.id, kind = %ticket.kind, purpose = ?ticket.purpose, "operation started");
        self.page.show_activity(true);
    }

    fn on_execution_complete(&mut self, completion: Completion<Purpose>) {
        self.page.show_activity(false);
        let Completion { ticket, output, .. } = completion;
        match (ticket.purpose, output) {
            (Purpose::SignIn, output) => {
                let traits = output.into_traits();
                if traits.is_error() {
                    self.signin_required = true;
                    self.page.show_sign_in(Some(&traits.error_text()));
                } else {
                    info!(agent_id = traits.agent_id().unwrap_or_default(), "signed in");
                    self.apply_authenticated(traits);
                }
            }
            (Purpose::RecoveryRefresh(attempt), output)
                if self.recovery.is_current(attempt, RecoveryStage::SessionRefresh) =>
            {
                self.on_refresh_complete(output.traits());
            }
            (Purpose::RecoveryReauth(attempt), output)
                if self.recovery.is_current(attempt, RecoveryStage::Reauthenticate) =>
            {
                self.on_reauth_complete(output.into_traits());
            }
            (Purpose::RecoveryRefresh(attempt) | Purpose::RecoveryReauth(attempt), _) => {
                debug!(id = ticket.id, attempt, "result for a recovery that is no longer running");
            }
            (Purpose::AgentList, OperationOutput::Agents { agents, traits }) => {
                if traits.is_error() {
                    self.page.notify_error(&traits.error_text());
                } else {
                    let listings = self.listings(&agents);
                    self.page.show_agents(&listings);
                }
            }
            (Purpose::AgentSwitch(agent), OperationOutput::Session { session_id, traits }) => {
                self.on_switch_complete(agent, session_id, &traits);
            }
            (purpose, output) => {
                warn!(?purpose, kind = %output.kind(), "unexpected output for purpose");
            }
        }
    }

    fn on_execution_discarded(&mut self, ticket: Ticket<Purpose>) {
        debug!(id = ticket.id, purpose = ?ticket.purpose, "stale result discarded");
        self.page.show_activity(false);
    }
}

impl<R, H, S> std::fmt::Debug for BrowserSession<R, H, S>
where
    R: OperationRunner + ?Sized,
    H: PageHost,
    S: AgentScopedStore,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrowserSession")
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
