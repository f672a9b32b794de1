//! # appgw-core
//!
//! Foundation types shared by every layer of the application gateway client.
//!
//! - [`types`]: credentials, routing agents, and the framed security token
//! - [`connection`]: the [`ConnectionTraits`] aggregate threaded through the
//!   Token → Agent → Session pipeline
//! - [`errors`]: the tagged [`GatewayError`] carried on that aggregate
//! - [`proxy`]: the proxy origin / browse endpoint context ([`ProxyConfig`])
//! - [`logging`]: subscriber bootstrap and test log capture

#![deny(unsafe_code)]

pub mod connection;
pub mod constants;
pub mod errors;
pub mod logging;
pub mod proxy;
pub mod types;

pub use connection::ConnectionTraits;
pub use errors::{ErrorKind, ErrorScope, GatewayError};
pub use proxy::{ProxyConfig, SharedProxy, normalize_router_url};
pub use types::{AgentEntity, Credentials, SecurityToken};

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
