//! # appgw-browser
//!
//! Browsing through the application gateway proxy.
//!
//! - [`rewrite`]: normal ↔ cloudified URL rewriting ([`UrlRewriter`])
//! - [`recovery`]: session-expiry detection and the two-attempt recovery
//!   machine ([`SessionRecovery`])
//! - [`page`]: page host and agent-scoped storage collaborators
//! - [`controller`]: [`BrowserSession`], the owning context that ties them to
//!   the execution harness

#![deny(unsafe_code)]

pub mod controller;
pub mod page;
pub mod recovery;
pub mod rewrite;

pub use controller::{BrowserSession, Purpose, SessionStatus};
pub use page::{AgentDataDir, AgentListing, AgentScopedStore, PageHost, SESSION_EXPIRED_PROMPT};
pub use recovery::{PageStartAction, RecoveryStage, RecoveryState, SessionRecovery};
pub use rewrite::UrlRewriter;
