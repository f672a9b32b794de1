//! Tagged error value carried on [`ConnectionTraits`](crate::ConnectionTraits).
//!
//! Every pipeline step converts its failures into a [`GatewayError`] instead of
//! propagating them. Callers check one thing (`traits.is_error()`) and tests can
//! still assert on the structured [`ErrorKind`] and [`ErrorScope`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// What went wrong, independent of which step it happened in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// I/O failure talking to the remote endpoint.
    Transport,
    /// The response body was malformed or unexpected.
    Protocol,
    /// A local precondition was not met (e.g. no token).
    Validation,
    /// A well-formed response reported a failure.
    Business,
}

impl ErrorKind {
    /// Whether retrying the same request could plausibly succeed.
    pub fn is_transient(self) -> bool {
        matches!(self, Self::Transport)
    }
}

/// Which pipeline step produced the error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorScope {
    /// Credential exchange.
    Token,
    /// Agent directory lookup and selection.
    Agent,
    /// Session establishment.
    Session,
}

impl fmt::Display for ErrorScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Token => "Token",
            Self::Agent => "Agent",
            Self::Session => "Session",
        })
    }
}

/// A pipeline failure with its kind, scope, and the user-facing message.
///
/// Displays as `"{Scope} error - {message}"`.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{scope} error - {message}")]
pub struct GatewayError {
    /// Failure classification.
    pub kind: ErrorKind,
    /// Step that failed.
    pub scope: ErrorScope,
    /// Message without the scope prefix.
    pub message: String,
}

impl GatewayError {
    /// Create an error with an explicit kind.
    pub fn new(kind: ErrorKind, scope: ErrorScope, message: impl Into<String>) -> Self {
        Self {
            kind,
            scope,
            message: message.into(),
        }
    }

    /// Transport failure.
    pub fn transport(scope: ErrorScope, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transport, scope, message)
    }

    /// Malformed or unexpected response.
    pub fn protocol(scope: ErrorScope, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Protocol, scope, message)
    }

    /// Missing local precondition.
    pub fn validation(scope: ErrorScope, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, scope, message)
    }

    /// Server-reported failure.
    pub fn business(scope: ErrorScope, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Business, scope, message)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
