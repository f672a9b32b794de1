//! Auth error types.
//!
//! Pipeline failures never surface here: they are folded into
//! [`ConnectionTraits`](appgw_core::ConnectionTraits). These errors cover the
//! local concerns around the pipeline (storage files, client construction).

/// Errors from credential storage and client setup.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Building the HTTP client failed.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
