//! # appgw-runtime
//!
//! Background execution harness.
//!
//! Every gateway operation runs on a one-shot tokio task. The owner gets a
//! synchronous "before" callback at submission and receives the result
//! through an [`Inbox`] it drains on its own context, so all state mutation
//! happens in one place. A generation counter lets the owner invalidate
//! in-flight work wholesale (sign-out, router change).

#![deny(unsafe_code)]

pub mod executor;
pub mod ticket;

pub use executor::{Executor, Inbox, channel};
pub use ticket::{Completion, ExecutionListener, TaskId, Ticket};
