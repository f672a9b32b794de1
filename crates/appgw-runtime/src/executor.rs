//! Worker dispatch and the owning-context inbox.
//!
//! [`channel`] pairs an [`Executor`], which spawns one tokio task per
//! operation, with an [`Inbox`] the owner drains on its own context. Each
//! ticket is stamped with the current generation; completions from older
//! generations are marked stale when they reach the inbox, and their output
//! is never applied.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use appgw_auth::{Operation, OperationRunner};
use tokio::sync::{Notify, mpsc};
use tracing::debug;

use crate::ticket::{Completion, ExecutionListener, Ticket};

/// Counters shared by the executor handles and the inbox.
#[derive(Debug, Default)]
struct Shared {
    generation: AtomicU64,
    next_id: AtomicU64,
    pending: AtomicUsize,
    settled: Notify,
}

/// Decrements the pending count when a worker finishes, even on panic.
struct PendingGuard(Arc<Shared>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        let _ = self.0.pending.fetch_sub(1, Ordering::SeqCst);
        self.0.settled.notify_one();
    }
}

/// Create an executor/inbox pair around `runner`.
pub fn channel<R, P>(runner: Arc<R>) -> (Executor<R, P>, Inbox<P>)
where
    R: OperationRunner + ?Sized,
    P: Clone + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let shared = Arc::new(Shared::default());
    let executor = Executor {
        runner,
        tx,
        shared: Arc::clone(&shared),
    };
    (executor, Inbox { rx, shared })
}

/// Submits operations to background workers.
pub struct Executor<R: ?Sized, P> {
    runner: Arc<R>,
    tx: mpsc::UnboundedSender<Completion<P>>,
    shared: Arc<Shared>,
}

impl<R: ?Sized, P> Clone for Executor<R, P> {
    fn clone(&self) -> Self {
        Self {
            runner: Arc::clone(&self.runner),
            tx: self.tx.clone(),
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<R, P> Executor<R, P>
where
    R: OperationRunner + ?Sized,
    P: Clone + Send + 'static,
{
    /// Run `operation` on a worker.
    ///
    /// `listener.on_before_execution` runs before this returns. The output is
    /// queued on the paired [`Inbox`]. Must be called inside a tokio runtime.
    pub fn perform<L>(&self, operation: Operation, purpose: P, listener: &mut L) -> Ticket<P>
    where
        L: ExecutionListener<P> + ?Sized,
    {
        let ticket = Ticket {
            id: self.shared.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            generation: self.shared.generation.load(Ordering::SeqCst),
            kind: operation.kind(),
            purpose,
        };
        listener.on_before_execution(&ticket);

        let _ = self.shared.pending.fetch_add(1, Ordering::SeqCst);
        let guard = PendingGuard(Arc::clone(&self.shared));
        let runner = Arc::clone(&self.runner);
        let tx = self.tx.clone();
        let task_ticket = ticket.clone();

        debug!(id = ticket.id, kind = %ticket.kind, "operation dispatched");
        drop(tokio::spawn(async move {
            let output = runner.run(operation).await;
            let id = task_ticket.id;
            if tx
                .send(Completion {
                    ticket: task_ticket,
                    output,
                    stale: false,
                })
                .is_err()
            {
                debug!(id, "inbox closed, completion discarded");
            }
            drop(guard);
        }));
        ticket
    }
}

impl<R: ?Sized, P> Executor<R, P> {
    /// Invalidate every operation submitted so far.
    ///
    /// Their completions arrive stale and are routed to
    /// [`ExecutionListener::on_execution_discarded`].
    /// Returns the new generation.
    pub fn advance_generation(&self) -> u64 {
        self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Current generation.
    pub fn generation(&self) -> u64 {
        self.shared.generation.load(Ordering::SeqCst)
    }

    /// Operations whose worker has not finished yet.
    pub fn pending(&self) -> usize {
        self.shared.pending.load(Ordering::SeqCst)
    }
}

impl<R: ?Sized, P> fmt::Debug for Executor<R, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("generation", &self.generation())
            .field("pending", &self.pending())
            .finish_non_exhaustive()
    }
}

/// Receiving end, drained on the owning context.
pub struct Inbox<P> {
    rx: mpsc::UnboundedReceiver<Completion<P>>,
    shared: Arc<Shared>,
}

impl<P> Inbox<P> {
    fn mark(&self, mut completion: Completion<P>) -> Completion<P> {
        let current = self.shared.generation.load(Ordering::SeqCst);
        if completion.ticket.generation < current {
            debug!(
                id = completion.ticket.id,
                kind = %completion.ticket.kind,
                generation = completion.ticket.generation,
                current,
                "stale completion"
            );
            completion.stale = true;
        }
        completion
    }

    /// Next completion already queued, without waiting.
    pub fn try_recv(&mut self) -> Option<Completion<P>> {
        self.rx.try_recv().ok().map(|completion| self.mark(completion))
    }

    /// Wait for the next completion.
    ///
    /// Returns `None` once nothing is queued and no worker is outstanding.
    pub async fn recv(&mut self) -> Option<Completion<P>> {
        loop {
            if let Some(completion) = self.try_recv() {
                return Some(completion);
            }
            // Workers send before decrementing, so zero here means every
            // completion is already in the queue.
            if self.shared.pending.load(Ordering::SeqCst) == 0 {
                return self.try_recv();
            }
            self.shared.settled.notified().await;
        }
    }

    /// Operations whose worker has not finished yet.
    pub fn pending(&self) -> usize {
        self.shared.pending.load(Ordering::SeqCst)
    }
}

impl<P> fmt::Debug for Inbox<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inbox")
            .field("pending", &self.pending())
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
