//! Scoped non-reentrant lock
//!
//! Operations that mutate registry state and then call out to a collaborator
//! run inside [`ReentrancyGuard::run`]. Independent callers queue on the
//! guard's mutex and run one after another. A call made from inside a guarded
//! scope on the same task, such as a collaborator calling back into the
//! registry, fails immediately with [`CoreError::Reentrancy`] instead of
//! waiting on a lock its own caller holds.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;

use crate::error::CoreError;

static NEXT_GUARD_ID: AtomicU64 = AtomicU64::new(1);

tokio::task_local! {
    /// Guards held by the current task, innermost last
    static HELD: Vec<u64>;
}

/// Exclusive, non-reentrant section shared by a set of operations
#[derive(Debug)]
pub struct ReentrancyGuard {
    id: u64,
    lock: Mutex<()>,
}

impl Default for ReentrancyGuard {
    fn default() -> Self {
        Self {
            id: NEXT_GUARD_ID.fetch_add(1, Ordering::Relaxed),
            lock: Mutex::new(()),
        }
    }
}

impl ReentrancyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the current task is inside a section of this guard
    pub fn is_held_by_current_task(&self) -> bool {
        HELD.try_with(|held| held.contains(&self.id)).unwrap_or(false)
    }

    /// Run `operation` inside the guarded section.
    ///
    /// Waits for other tasks to leave the section first. Fails without
    /// running `operation` if the current task is already inside it. The
    /// section is released when `operation` completes or is dropped.
    pub async fn run<F, T, E>(&self, operation: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: From<CoreError>,
    {
        let mut held = HELD.try_with(|held| held.clone()).unwrap_or_default();
        if held.contains(&self.id) {
            return Err(CoreError::Reentrancy.into());
        }

        let _section = self.lock.lock().await;
        held.push(self.id);
        HELD.scope(held, operation).await
    }
}
