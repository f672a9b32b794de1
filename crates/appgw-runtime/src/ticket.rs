//! Tickets, completions, and the owning-context listener.

use appgw_auth::{OperationKind, OperationOutput};

/// Monotonic identifier of one submitted operation.
pub type TaskId = u64;

/// Handle describing one submitted operation.
///
/// `purpose` is caller-defined context that travels with the operation and
/// comes back on the [`Completion`], so the owner knows what to do with it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ticket<P> {
    /// Submission order, starting at 1.
    pub id: TaskId,
    /// Generation current at submission.
    pub generation: u64,
    /// Which primitive runs.
    pub kind: OperationKind,
    /// Caller context.
    pub purpose: P,
}

/// Result of a finished operation, waiting to be applied on the owning context.
#[derive(Debug)]
pub struct Completion<P> {
    /// The ticket handed out at submission.
    pub ticket: Ticket<P>,
    /// What the runner produced.
    pub output: OperationOutput,
    pub(crate) stale: bool,
}

impl<P> Completion<P> {
    /// Submitted before the last generation change.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Hand this completion to `listener`.
    ///
    /// Stale completions go to [`ExecutionListener::on_execution_discarded`]
    /// so every `before` is still paired with exactly one callback.
    pub fn dispatch<L>(self, listener: &mut L)
    where
        L: ExecutionListener<P> + ?Sized,
    {
        if self.stale {
            listener.on_execution_discarded(self.ticket);
        } else {
            listener.on_execution_complete(self);
        }
    }
}

/// Before/after callbacks, both invoked on the owning context.
pub trait ExecutionListener<P> {
    /// Called synchronously from `perform`, before the worker starts.
    fn on_before_execution(&mut self, ticket: &Ticket<P>);

    /// Called when the owner pumps a fresh completion out of its inbox.
    fn on_execution_complete(&mut self, completion: Completion<P>);

    /// Called instead of `on_execution_complete` for a stale completion.
    /// The output has already been dropped.
    fn on_execution_discarded(&mut self, _ticket: Ticket<P>) {}
}
