//! Per-conversation mutual exclusion

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// One async mutex per conversation that currently has an operation in
/// flight. Entries are dropped again once nobody holds or waits on them.
#[derive(Clone, Default)]
pub struct ConversationLocks {
    inner: Arc<DashMap<Uuid, Arc<Mutex<()>>>>,
}

impl ConversationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, conversation_id: Uuid) -> ConversationGuard {
        // Clone out of the map before awaiting; a shard lock must not be
        // held across the await.
        let mutex = self
            .inner
            .entry(conversation_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let guard = mutex.lock_owned().await;
        ConversationGuard {
            guard: Some(guard),
            conversation_id,
            locks: self.inner.clone(),
        }
    }

    /// Conversations with a holder or waiter.
    pub fn active(&self) -> usize {
        self.inner.len()
    }
}

pub struct ConversationGuard {
    guard: Option<OwnedMutexGuard<()>>,
    conversation_id: Uuid,
    locks: Arc<DashMap<Uuid, Arc<Mutex<()>>>>,
}

impl Drop for ConversationGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Only the map's own reference left: no holder, no waiter.
        self.locks
            .remove_if(&self.conversation_id, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}
