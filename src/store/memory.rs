//! In-memory raffle store.
//!
//! Used when persistence is disabled and by tests. Contents are lost on
//! restart.

use super::{RaffleKey, RaffleStore, StoreError};
use crate::raffle::{RaffleDefinition, ScopeId};
use crate::dashmap_ext::DashMapExt;
use async_trait::async_trait;
use dashmap::DashMap;

#[derive(Default)]
pub struct MemoryStore {
    raffles: DashMap<RaffleKey, RaffleDefinition>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.raffles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raffles.is_empty()
    }
}

#[async_trait]
impl RaffleStore for MemoryStore {
    async fn get(&self, key: &RaffleKey) -> Result<Option<RaffleDefinition>, StoreError> {
        Ok(self.raffles.get_cloned(key))
    }

    async fn put(&self, key: &RaffleKey, raffle: &RaffleDefinition) -> Result<(), StoreError> {
        self.raffles.insert(key.clone(), raffle.clone());
        Ok(())
    }

    async fn delete(&self, key: &RaffleKey) -> Result<bool, StoreError> {
        Ok(self.raffles.remove(key).is_some())
    }

    async fn keys(&self, scope: ScopeId) -> Result<Vec<String>, StoreError> {
        let mut names: Vec<String> = self
            .raffles
            .iter()
            .filter(|e| e.key().scope == scope)
            .map(|e| e.key().name.clone())
            .collect();
        names.sort();
        Ok(names)
    }
}
