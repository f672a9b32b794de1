//! Credentials, routing agents, and the security token.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{JSON_AGENT_ID_KEY, TOKEN_CLOSE_TAG, TOKEN_OPEN_TAG};

// ─────────────────────────────────────────────────────────────────────────────
// Credentials
// ─────────────────────────────────────────────────────────────────────────────

/// Username and password for one authentication attempt.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Account name (usually an email address).
    pub username: String,
    /// Account password.
    pub password: String,
}

impl Credentials {
    /// Create a credentials pair.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Both fields are non-empty.
    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AgentEntity
// ─────────────────────────────────────────────────────────────────────────────

/// A routing agent ("connector") that tunnels traffic into an internal network.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentEntity {
    /// Server-assigned agent identifier.
    pub agent_id: String,
    /// Human-readable agent name.
    #[serde(default)]
    pub display_name: String,
}

impl AgentEntity {
    /// Create an agent entity.
    pub fn new(agent_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            display_name: display_name.into(),
        }
    }

    /// The `{"agent_id":"<id>"}` payload sent as the session request body.
    pub fn agent_id_json(&self) -> String {
        serde_json::json!({ JSON_AGENT_ID_KEY: self.agent_id }).to_string()
    }

    /// Rehydrate an agent from its single-field JSON wrapper.
    ///
    /// The display name is not part of the wrapper and comes back empty.
    pub fn from_agent_id_json(json: &str) -> Option<Self> {
        let value: serde_json::Value = serde_json::from_str(json).ok()?;
        let agent_id = value.get(JSON_AGENT_ID_KEY)?.as_str()?;
        Some(Self::new(agent_id, ""))
    }

    /// Same id and same display name.
    pub fn matches(&self, other: &AgentEntity) -> bool {
        self.agent_id == other.agent_id && self.display_name == other.display_name
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SecurityToken
// ─────────────────────────────────────────────────────────────────────────────

/// Security token issued by the identity endpoint.
///
/// Holds the framed element exactly as it appeared in the federation response,
/// markers included. That framed form is what the proxy expects in the token
/// header. [`assertion`](Self::assertion) yields the text between the markers.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecurityToken(String);

impl SecurityToken {
    /// Wrap an already-framed token.
    pub fn new(framed: impl Into<String>) -> Self {
        Self(framed.into())
    }

    /// Cut the framed token out of a response body.
    ///
    /// Returns `None` when the opening marker is missing or is not followed by
    /// a closing marker.
    pub fn extract(body: &str) -> Option<Self> {
        let start = body.find(TOKEN_OPEN_TAG)?;
        let tail = &body[start..];
        let end = tail.find(TOKEN_CLOSE_TAG)? + TOKEN_CLOSE_TAG.len();
        Some(Self(tail[..end].to_owned()))
    }

    /// The framed form, sent verbatim as the token header.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The inner assertion with the framing markers removed.
    pub fn assertion(&self) -> &str {
        let inner = self.0.strip_prefix(TOKEN_OPEN_TAG).unwrap_or(&self.0);
        inner.strip_suffix(TOKEN_CLOSE_TAG).unwrap_or(inner)
    }

    /// No framed content at all.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecurityToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecurityToken(<{} bytes>)", self.0.len())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_debug_hides_password() {
        let creds = Credentials::new("alice", "pw1");
        let dbg = format!("{creds:?}");
        assert!(dbg.contains("alice"));
        assert!(!dbg.contains("pw1"));
    }

    #[test]
    fn credentials_completeness() {
        assert!(Credentials::new("a", "b").is_complete());
        assert!(!Credentials::new("a", "").is_complete());
        assert!(!Credentials::new("", "b").is_complete());
    }

    #[test]
    fn agent_id_json_wraps_only_the_id() {
        let agent = AgentEntity::new("ag-7", "Lab");
        assert_eq!(agent.agent_id_json(), r#"{"agent_id":"ag-7"}"#);
    }

    #[test]
    fn agent_rehydrates_from_json_wrapper() {
        let agent = AgentEntity::from_agent_id_json(r#"{"agent_id":"ag-7"}"#).unwrap();
        assert_eq!(agent.agent_id, "ag-7");
        assert!(agent.display_name.is_empty());
        assert!(AgentEntity::from_agent_id_json("{}").is_none());
        assert!(AgentEntity::from_agent_id_json("not json").is_none());
    }

    #[test]
    fn agent_matches_requires_id_and_name() {
        let a = AgentEntity::new("1", "One");
        assert!(a.matches(&AgentEntity::new("1", "One")));
        assert!(!a.matches(&AgentEntity::new("1", "Uno")));
        assert!(!a.matches(&AgentEntity::new("2", "One")));
    }

    #[test]
    fn agent_storage_form_is_camel_case() {
        let json = serde_json::to_value(AgentEntity::new("1", "One")).unwrap();
        assert_eq!(json["agentId"], "1");
        assert_eq!(json["displayName"], "One");
    }

    #[test]
    fn token_extract_keeps_markers() {
        let body = "<x><wst:RequestedSecurityToken>T1</wst:RequestedSecurityToken></x>";
        let token = SecurityToken::extract(body).unwrap();
        assert_eq!(
            token.as_str(),
            "<wst:RequestedSecurityToken>T1</wst:RequestedSecurityToken>"
        );
        assert_eq!(token.assertion(), "T1");
    }

    #[test]
    fn token_extract_requires_both_markers() {
        assert!(SecurityToken::extract("<wst:RequestedSecurityToken>T1").is_none());
        assert!(SecurityToken::extract("T1</wst:RequestedSecurityToken>").is_none());
        assert!(SecurityToken::extract("").is_none());
    }

    #[test]
    fn token_debug_is_redacted() {
        let token = SecurityToken::new("<wst:RequestedSecurityToken>secret</wst:RequestedSecurityToken>");
        assert!(!format!("{token:?}").contains("secret"));
    }

    #[test]
    fn unframed_token_assertion_is_whole_value() {
        assert_eq!(SecurityToken::new("raw").assertion(), "raw");
    }
}
