//! Joinable set of detached tasks.
//!
//! Store writes and revalidations run detached from the response they
//! belong to. They are recorded here so callers (and tests) can wait for
//! the store to settle instead of relying on timing.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinSet;

/// Cloneable handle to a shared set of detached tasks.
#[derive(Clone, Default)]
pub struct BackgroundTasks {
    inner: Arc<Mutex<JoinSet<()>>>,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Detach a task. Must be called from within a tokio runtime.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut set = self.lock();
        while let Some(finished) = set.try_join_next() {
            log_join_result(finished);
        }
        set.spawn(task);
    }

    /// Number of tasks spawned and not yet joined.
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    /// Wait for every detached task, including ones spawned while waiting.
    ///
    /// Returns the number of tasks joined.
    pub async fn drain(&self) -> usize {
        let mut joined = 0;
        loop {
            let mut set = std::mem::take(&mut *self.lock());
            if set.is_empty() {
                return joined;
            }
            while let Some(finished) = set.join_next().await {
                log_join_result(finished);
                joined += 1;
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn log_join_result(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        tracing::warn!(error = %e, "background task did not complete");
    }
}

impl std::fmt::Debug for BackgroundTasks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundTasks").field("pending", &self.pending()).finish()
    }
}
