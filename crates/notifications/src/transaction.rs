//! Unit of work with deferred writes and post-commit hooks.

use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::StoreError;

/// Serializes commits so that every check of a transaction still holds when
/// its writes are applied.
static COMMIT_LOCK: Mutex<()> = Mutex::new(());

type Check = Box<dyn Fn() -> Result<(), StoreError> + Send>;
type Apply = Box<dyn FnOnce() + Send>;

/// A write deferred until commit.
///
/// `check` must not mutate anything; `apply` must not fail.
pub struct StagedWrite {
    check: Check,
    apply: Apply,
}

impl StagedWrite {
    pub fn new<C, A>(check: C, apply: A) -> Self
    where
        C: Fn() -> Result<(), StoreError> + Send + 'static,
        A: FnOnce() + Send + 'static,
    {
        Self {
            check: Box::new(check),
            apply: Box::new(apply),
        }
    }

    /// A write with no precondition.
    pub fn unconditional<A>(apply: A) -> Self
    where
        A: FnOnce() + Send + 'static,
    {
        Self::new(|| Ok(()), apply)
    }
}

/// Side effect run after every staged write has been applied.
pub type CommitHook = Box<dyn FnOnce() + Send>;

/// A unit of work.
///
/// Stores stage their writes here; nothing becomes visible until
/// [`Transaction::commit`]. Commit is all-or-nothing: every staged check runs
/// before any write is applied. Hooks registered with
/// [`Transaction::on_commit`] run after the writes, in registration order.
/// Rolling back, a failed commit, or dropping the transaction without
/// committing discards both.
#[derive(Default)]
pub struct Transaction {
    writes: Vec<StagedWrite>,
    hooks: Vec<CommitHook>,
}

impl Transaction {
    pub fn begin() -> Self {
        Self::default()
    }

    pub fn stage(&mut self, write: StagedWrite) {
        self.writes.push(write);
    }

    pub fn on_commit<F>(&mut self, hook: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.hooks.push(Box::new(hook));
    }

    pub fn staged_writes(&self) -> usize {
        self.writes.len()
    }

    pub fn pending_hooks(&self) -> usize {
        self.hooks.len()
    }

    /// Check every staged write, apply them all, then run the commit hooks.
    ///
    /// The first failing check aborts the commit: no write is applied and no
    /// hook runs.
    pub fn commit(self) -> Result<(), StoreError> {
        let Transaction { writes, hooks } = self;

        {
            let _guard = COMMIT_LOCK.lock().unwrap_or_else(PoisonError::into_inner);

            if let Some(err) = writes.iter().find_map(|w| (w.check)().err()) {
                debug!(writes = writes.len(), error = %err, "transaction aborted");
                return Err(err);
            }

            for write in writes {
                (write.apply)();
            }
        }

        // Hooks may open transactions of their own
        for hook in hooks {
            hook();
        }

        Ok(())
    }

    pub fn rollback(self) {
        debug!(
            writes = self.writes.len(),
            hooks = self.hooks.len(),
            "transaction rolled back"
        );
    }
}

impl core::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Transaction")
            .field("staged_writes", &self.writes.len())
            .field("pending_hooks", &self.hooks.len())
            .finish()
    }
}
