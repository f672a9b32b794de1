//! The connection aggregate threaded through the authentication pipeline.

use crate::errors::GatewayError;
use crate::types::{AgentEntity, SecurityToken};

/// Current connection state: token, selected agent, session id, or an error.
///
/// A set `error` means the aggregate must not be used for routing; callers
/// discard it or [`reset`](Self::reset) it. Fields written by earlier successful steps are left in
/// place when a later step fails.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConnectionTraits {
    /// Security token from the identity endpoint.
    pub token: Option<SecurityToken>,
    /// Selected routing agent.
    pub agent: Option<AgentEntity>,
    /// Proxy session identifier.
    pub session_id: Option<String>,
    /// First error hit by the pipeline.
    pub error: Option<GatewayError>,
}

impl ConnectionTraits {
    /// Empty aggregate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Aggregate holding only a token.
    pub fn with_token(token: SecurityToken) -> Self {
        Self {
            token: Some(token),
            ..Self::default()
        }
    }

    /// Aggregate holding only an error.
    pub fn failed(error: GatewayError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }

    /// An error is set.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Display text of the error, or an empty string.
    pub fn error_text(&self) -> String {
        self.error.as_ref().map(ToString::to_string).unwrap_or_default()
    }

    /// Record an error.
    pub fn fail(&mut self, error: GatewayError) -> &mut Self {
        self.error = Some(error);
        self
    }

    /// Token header value, when a non-empty token is present.
    pub fn token_header(&self) -> Option<&str> {
        self.token
            .as_ref()
            .map(SecurityToken::as_str)
            .filter(|t| !t.is_empty())
    }

    /// A non-empty token is present.
    pub fn has_token(&self) -> bool {
        self.token_header().is_some()
    }

    /// Selected agent id, when non-empty.
    pub fn agent_id(&self) -> Option<&str> {
        self.agent
            .as_ref()
            .map(|a| a.agent_id.as_str())
            .filter(|id| !id.is_empty())
    }

    /// Session id, when non-empty.
    pub fn session(&self) -> Option<&str> {
        self.session_id.as_deref().filter(|s| !s.is_empty())
    }

    /// Store the session id.
    pub fn set_session(&mut self, session_id: impl Into<String>) {
        self.session_id = Some(session_id.into());
    }

    /// Store the selected agent.
    pub fn set_agent(&mut self, agent: AgentEntity) {
        self.agent = Some(agent);
    }

    /// Forget token, agent, and session (sign-out).
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorScope;

    #[test]
    fn new_has_nothing() {
        let traits = ConnectionTraits::new();
        assert!(!traits.is_error());
        assert!(!traits.has_token());
        assert!(traits.agent_id().is_none());
        assert!(traits.session().is_none());
        assert_eq!(traits.error_text(), "");
    }

    #[test]
    fn fail_sets_error_text() {
        let mut traits = ConnectionTraits::new();
        let _ = traits.fail(GatewayError::business(
            ErrorScope::Session,
            "Session is null or empty.",
        ));
        assert!(traits.is_error());
        assert_eq!(traits.error_text(), "Session error - Session is null or empty.");
    }

    #[test]
    fn empty_values_do_not_count() {
        let mut traits = ConnectionTraits::with_token(SecurityToken::new(""));
        traits.set_agent(AgentEntity::new("", "Nameless"));
        traits.set_session("");
        assert!(!traits.has_token());
        assert!(traits.agent_id().is_none());
        assert!(traits.session().is_none());
    }

    #[test]
    fn reset_clears_everything() {
        let mut traits = ConnectionTraits::with_token(SecurityToken::new("t"));
        traits.set_agent(AgentEntity::new("a", "A"));
        traits.set_session("s");
        traits.reset();
        assert_eq!(traits, ConnectionTraits::new());
    }
}
