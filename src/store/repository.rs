//! Serialized access to raffles.
//!
//! Every mutation runs as a read-modify-write under a per-(scope, name)
//! async mutex, so concurrent joins, leaves, kicks and draws on one raffle
//! never lose updates. Raffles under different keys proceed in parallel.
//! Lock entries are dropped once nobody holds or waits on them.

use super::{RaffleKey, RaffleStore, StoreError};
use crate::raffle::{RaffleDefinition, ScopeId};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

pub struct RaffleRepository {
    store: Arc<dyn RaffleStore>,
    locks: DashMap<RaffleKey, Arc<Mutex<()>>>,
}

impl RaffleRepository {
    pub fn new(store: Arc<dyn RaffleStore>) -> Self {
        Self {
            store,
            locks: DashMap::new(),
        }
    }

    fn lock_for(&self, key: &RaffleKey) -> Arc<Mutex<()>> {
        self.locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn release(&self, key: &RaffleKey) {
        self.locks
            .remove_if(key, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Snapshot read. Not serialized with writers; callers that act on the
    /// result must re-check inside [`update`](Self::update).
    pub async fn get(&self, key: &RaffleKey) -> Result<Option<RaffleDefinition>, StoreError> {
        self.store.get(key).await
    }

    /// Run `f` against the current value under the key's lock and persist
    /// whatever it leaves behind: `Some` is written, `None` deletes.
    /// Nothing is written when `f` leaves the value unchanged.
    pub async fn update<F, R>(&self, key: &RaffleKey, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut Option<RaffleDefinition>) -> R,
    {
        let lock = self.lock_for(key);
        let result = {
            let _guard = lock.lock().await;
            self.modify(key, f).await
        };
        drop(lock);
        self.release(key);
        result
    }

    async fn modify<F, R>(&self, key: &RaffleKey, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut Option<RaffleDefinition>) -> R,
    {
        let before = self.store.get(key).await?;
        let mut slot = before.clone();
        let result = f(&mut slot);

        if slot != before {
            match &slot {
                Some(raffle) => self.store.put(key, raffle).await?,
                None => {
                    self.store.delete(key).await?;
                    debug!(raffle = %key, "raffle removed");
                }
            }
        }
        Ok(result)
    }

    /// Delete a raffle. Returns whether it existed.
    pub async fn delete(&self, key: &RaffleKey) -> Result<bool, StoreError> {
        self.update(key, |slot| slot.take().is_some()).await
    }

    pub async fn names(&self, scope: ScopeId) -> Result<Vec<String>, StoreError> {
        self.store.keys(scope).await
    }

    /// Snapshot of every raffle in a scope, in name order.
    pub async fn all(&self, scope: ScopeId) -> Result<Vec<RaffleDefinition>, StoreError> {
        let mut raffles = Vec::new();
        for name in self.store.keys(scope).await? {
            if let Some(raffle) = self.store.get(&RaffleKey::new(scope, name)).await? {
                raffles.push(raffle);
            }
        }
        Ok(raffles)
    }

    /// Number of keys with a live lock entry.
    pub fn held_locks(&self) -> usize {
        self.locks.len()
    }
}
