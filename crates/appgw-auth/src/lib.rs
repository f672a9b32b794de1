//! # appgw-auth
//!
//! Clients for the three gateway services and the pipeline that chains them.
//!
//! - [`token`]: SOAP WS-Trust token exchange and fault interpretation
//! - [`agents`]: agent directory fetch and preferred-agent selection
//! - [`session`]: token + agent → proxy session id
//! - [`router`]: [`GatewayRouter`], the Token → Agent → Session orchestrator
//! - [`operation`]: operation tags for background execution
//! - [`storage`]: credential and preferred-agent persistence

#![deny(unsafe_code)]

pub mod agents;
pub mod errors;
pub mod fault;
pub mod operation;
pub mod router;
pub mod session;
pub mod storage;
pub mod token;

pub use errors::AuthError;
pub use fault::SoapFault;
pub use operation::{Operation, OperationKind, OperationOutput, OperationRunner};
pub use router::GatewayRouter;
pub use storage::{AuthStorage, AuthStore, FileAuthStore, MemoryAuthStore};

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
