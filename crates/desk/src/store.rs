//! Per-browser desks held in memory.
//!
//! Each entry sits behind its own async mutex; a handler holds the lock for
//! its whole duration so one browser's intents apply one at a time. Entries
//! idle out and are rebuilt from `Loading` on the next request.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use proxima_core::desk::Desk;

use crate::gateway::AuthSession;

/// Upper bound on concurrently held desks.
const MAX_DESKS: u64 = 10_000;

/// A desk plus the backend session it acts with.
#[derive(Debug, Default)]
pub struct DeskEntry {
    pub desk: Desk,
    pub auth: Option<AuthSession>,
}

impl DeskEntry {
    /// A fresh desk that will resume `auth` when it resolves.
    #[must_use]
    pub fn resuming(auth: Option<AuthSession>) -> Self {
        Self {
            desk: Desk::default(),
            auth,
        }
    }
}

/// Desk entries keyed by the id kept in the browser session.
#[derive(Clone)]
pub struct DeskStore {
    desks: Cache<Uuid, Arc<Mutex<DeskEntry>>>,
}

impl std::fmt::Debug for DeskStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeskStore")
            .field("entries", &self.desks.entry_count())
            .finish()
    }
}

impl DeskStore {
    #[must_use]
    pub fn new(idle: Duration) -> Self {
        Self {
            desks: Cache::builder()
                .max_capacity(MAX_DESKS)
                .time_to_idle(idle)
                .build(),
        }
    }

    /// Lock the desk for `id`, creating it with `init` if absent.
    pub async fn lock(
        &self,
        id: Uuid,
        init: impl FnOnce() -> DeskEntry,
    ) -> OwnedMutexGuard<DeskEntry> {
        let entry = self
            .desks
            .get_with(id, async move { Arc::new(Mutex::new(init())) })
            .await;
        entry.lock_owned().await
    }

    /// Drop the desk for `id`.
    pub async fn remove(&self, id: Uuid) {
        self.desks.invalidate(&id).await;
    }
}
