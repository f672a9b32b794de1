//! Session-expiry detection and the two-attempt recovery state machine.
//!
//! ```text
//!  Idle ──expiry marker──▶ Recovering(SessionRefresh)
//!                              │ refresh failed
//!                              ▼
//!                          Recovering(Reauthenticate)
//!  Idle ◀──finish (success or final failure)──┘
//! ```
//!
//! The machine only decides; the controller performs the page and network
//! side effects. It lives on the owning context, so a plain enum is enough.

use appgw_core::constants::SESSION_EXPIRED_MARKER;
use tracing::{debug, info};

use crate::rewrite::UrlRewriter;

/// Which attempt an active recovery is on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecoveryStage {
    /// Attempt 1: new session for the existing token and agent.
    SessionRefresh,
    /// Attempt 2: full authentication with stored credentials.
    Reauthenticate,
}

/// Recovery state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RecoveryState {
    /// No recovery running.
    #[default]
    Idle,
    /// A recovery is running at the given stage.
    Recovering(RecoveryStage),
}

/// What the controller should do with a page that just started loading.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageStartAction {
    /// Ordinary load; let it proceed.
    Continue,
    /// Expiry seen while already recovering; stop the load, start nothing.
    Halt,
    /// Expiry seen while idle; stop the load and run attempt 1.
    BeginRecovery,
}

/// Idle/Recovering machine plus the original URL of the current load sequence.
#[derive(Clone, Debug, Default)]
pub struct SessionRecovery {
    state: RecoveryState,
    original_url: Option<String>,
    attempts: u32,
}

impl SessionRecovery {
    /// Idle machine with nothing captured.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub fn state(&self) -> RecoveryState {
        self.state
    }

    /// A recovery is running.
    pub fn is_recovering(&self) -> bool {
        matches!(self.state, RecoveryState::Recovering(_))
    }

    /// Recoveries started so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// `attempt` is the running recovery and it is at `stage`.
    ///
    /// Results submitted for an abandoned or superseded recovery fail this
    /// check and must not be applied.
    pub fn is_current(&self, attempt: u32, stage: RecoveryStage) -> bool {
        self.attempts == attempt && self.state == RecoveryState::Recovering(stage)
    }

    /// Normal-form URL the current load sequence started from.
    pub fn original_url(&self) -> Option<&str> {
        self.original_url.as_deref()
    }

    /// Classify a page-load start.
    ///
    /// The first non-expiry URL of a load sequence is captured, in normal
    /// form, as the URL to resume after recovery.
    pub fn on_page_started(&mut self, url: &str, rewriter: &UrlRewriter) -> PageStartAction {
        let expired = url.contains(SESSION_EXPIRED_MARKER);
        if !expired && self.original_url.is_none() {
            self.original_url = Some(rewriter.to_normal(url));
        }
        if !expired {
            return PageStartAction::Continue;
        }

        if self.is_recovering() {
            debug!("session expiry seen during recovery, halting load");
            return PageStartAction::Halt;
        }
        self.state = RecoveryState::Recovering(RecoveryStage::SessionRefresh);
        self.attempts += 1;
        info!(attempt = self.attempts, "session expired, starting recovery");
        PageStartAction::BeginRecovery
    }

    /// Move from attempt 1 to attempt 2.
    ///
    /// Returns `false` unless the machine is on attempt 1, so full
    /// reauthentication runs at most once per recovery.
    pub fn escalate(&mut self) -> bool {
        if self.state != RecoveryState::Recovering(RecoveryStage::SessionRefresh) {
            return false;
        }
        self.state = RecoveryState::Recovering(RecoveryStage::Reauthenticate);
        debug!("session refresh failed, escalating to full authentication");
        true
    }

    /// End the recovery and return the URL to resume, if any.
    pub fn finish(&mut self) -> Option<String> {
        self.state = RecoveryState::Idle;
        self.original_url.clone()
    }

    /// A page finished loading; forget the captured URL unless recovering.
    pub fn on_load_complete(&mut self) {
        if !self.is_recovering() {
            self.original_url = None;
        }
    }

    /// Drop an active recovery and the captured URL (user navigated away).
    pub fn abandon(&mut self) {
        if self.is_recovering() {
            debug!("recovery abandoned");
        }
        self.state = RecoveryState::Idle;
        self.original_url = None;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
