//! Abort Coordinator
//!
//! Owns the cancel handle of every live operation. Starting an operation of a
//! kind that already has a live one cancels and retires the old one first, so
//! its late results can never be recorded. Terminal statuses are sticky: once
//! an operation is `Completed`, `Cancelled` or `Failed` nothing changes it.
//!
//! A deadline is just another cancellation source: a timer task trips the
//! same token the user would.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::{debug, info, warn};

use crate::operation::{Operation, OperationKind, OperationStatus};
use crate::OperationId;

/// Number of finished operations kept for `snapshot`
const RETAINED_FINISHED: usize = 64;

/// Cancellation handle passed into every cancellable stage
///
/// Cloning is cheap; all clones observe the same cancellation.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: CancellationToken,
}

impl CancelToken {
    /// Create a fresh, uncancelled token
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.inner.is_cancelled()
    }

    /// Completes once cancellation has been requested
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.inner.cancelled()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    /// A token cancelled together with this one, but cancellable on its own
    pub fn child(&self) -> Self {
        Self {
            inner: self.inner.child_token(),
        }
    }
}

struct Entry {
    seq: u64,
    operation: Operation,
    token: Option<CancelToken>,
}

#[derive(Default)]
struct Registry {
    next_seq: u64,
    operations: HashMap<OperationId, Entry>,
    live: HashMap<OperationKind, OperationId>,
}

impl Registry {
    fn retire(&mut self, id: OperationId, status: OperationStatus, error: Option<String>) {
        if let Some(entry) = self.operations.get_mut(&id) {
            entry.operation.status = status;
            entry.operation.error = error;
            entry.operation.finished_at = Some(Utc::now());
            entry.token = None;
            if self.live.get(&entry.operation.kind) == Some(&id) {
                self.live.remove(&entry.operation.kind);
            }
        }
        self.prune();
    }

    fn prune(&mut self) {
        let mut finished: Vec<(u64, OperationId)> = self
            .operations
            .iter()
            .filter(|(_, e)| e.operation.status.is_terminal())
            .map(|(id, e)| (e.seq, *id))
            .collect();
        if finished.len() <= RETAINED_FINISHED {
            return;
        }
        finished.sort();
        let excess = finished.len() - RETAINED_FINISHED;
        for (_, id) in finished.into_iter().take(excess) {
            self.operations.remove(&id);
        }
    }
}

/// Registry of operations and their cancel handles
///
/// Cloning shares the same registry.
#[derive(Clone, Default)]
pub struct AbortCoordinator {
    inner: Arc<Mutex<Registry>>,
}

impl AbortCoordinator {
    /// Create an empty coordinator
    pub fn new() -> Self {
        Self::default()
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        // A panic while holding the lock cannot leave the maps inconsistent
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a new operation, cancelling any live one of the same kind
    pub fn begin_operation(&self, kind: OperationKind) -> (OperationId, CancelToken) {
        let mut registry = self.registry();

        if let Some(previous) = registry.live.get(&kind).copied() {
            if let Some(token) = registry
                .operations
                .get(&previous)
                .and_then(|e| e.token.clone())
            {
                token.cancel();
            }
            registry.retire(previous, OperationStatus::Cancelled, None);
            info!("Cancelled superseded {} operation {}", kind, previous);
        }

        let operation = Operation::new(kind);
        let id = operation.id;
        let token = CancelToken::new();
        let seq = registry.next_seq;
        registry.next_seq += 1;
        registry.operations.insert(
            id,
            Entry {
                seq,
                operation,
                token: Some(token.clone()),
            },
        );
        registry.live.insert(kind, id);
        debug!("Began {} operation {}", kind, id);

        (id, token)
    }

    /// Like `begin_operation`, plus a timer that cancels after `deadline`
    ///
    /// Must be called from within a tokio runtime.
    pub fn begin_operation_with_deadline(
        &self,
        kind: OperationKind,
        deadline: Duration,
    ) -> (OperationId, CancelToken) {
        let (id, token) = self.begin_operation(kind);
        let timer = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = timer.cancelled() => {}
                _ = tokio::time::sleep(deadline) => {
                    warn!("Operation {} exceeded its {:?} deadline, cancelling", id, deadline);
                    timer.cancel();
                }
            }
        });
        (id, token)
    }

    /// Request cancellation of a live operation
    ///
    /// The status becomes `Cancelled` when the owner finishes it.
    pub fn cancel(&self, id: OperationId) -> bool {
        let registry = self.registry();
        match registry.operations.get(&id).and_then(|e| e.token.as_ref()) {
            Some(token) => {
                token.cancel();
                info!("Cancellation requested for operation {}", id);
                true
            }
            None => false,
        }
    }

    /// Request cancellation of the live operation of `kind`, if any
    pub fn cancel_kind(&self, kind: OperationKind) -> bool {
        let live = self.live(kind);
        live.map(|id| self.cancel(id)).unwrap_or(false)
    }

    /// Whether a token has been cancelled
    pub fn is_cancelled(token: &CancelToken) -> bool {
        token.is_cancelled()
    }

    /// Record a non-terminal status change
    ///
    /// Returns `false` if the operation is unknown, already terminal, or
    /// `status` is terminal (use `finish` / `fail` for those).
    pub fn set_status(&self, id: OperationId, status: OperationStatus) -> bool {
        if status.is_terminal() {
            return false;
        }
        let mut registry = self.registry();
        match registry.operations.get_mut(&id) {
            Some(entry) if !entry.operation.status.is_terminal() => {
                debug!("Operation {} {} -> {}", id, entry.operation.status, status);
                entry.operation.status = status;
                true
            }
            _ => false,
        }
    }

    /// Move an operation to a terminal status and release its handle
    ///
    /// `Completed` is recorded as `Cancelled` when the token was cancelled.
    /// Returns the status actually recorded, or `None` if the operation was
    /// unknown or already terminal.
    pub fn finish(&self, id: OperationId, status: OperationStatus) -> Option<OperationStatus> {
        if !status.is_terminal() {
            return None;
        }
        let mut registry = self.registry();
        let entry = registry.operations.get(&id)?;
        if entry.operation.status.is_terminal() {
            return None;
        }
        let cancelled = entry.token.as_ref().map(|t| t.is_cancelled()).unwrap_or(false);
        let recorded = if status == OperationStatus::Completed && cancelled {
            OperationStatus::Cancelled
        } else {
            status
        };
        registry.retire(id, recorded, None);
        info!("Operation {} finished as {}", id, recorded);
        Some(recorded)
    }

    /// Move an operation to `Failed` with the verbatim error message
    pub fn fail(&self, id: OperationId, message: impl Into<String>) -> bool {
        let message = message.into();
        let mut registry = self.registry();
        let open = matches!(
            registry.operations.get(&id),
            Some(entry) if !entry.operation.status.is_terminal()
        );
        if !open {
            return false;
        }
        warn!("Operation {} failed: {}", id, message);
        registry.retire(id, OperationStatus::Failed, Some(message));
        true
    }

    /// Current state of an operation
    pub fn snapshot(&self, id: OperationId) -> Option<Operation> {
        self.registry()
            .operations
            .get(&id)
            .map(|e| e.operation.clone())
    }

    /// The live operation of `kind`, if any
    pub fn live(&self, kind: OperationKind) -> Option<OperationId> {
        self.registry().live.get(&kind).copied()
    }
}
