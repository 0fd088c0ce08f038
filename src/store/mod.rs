//! Raffle storage abstraction.
//!
//! Backends implement [`RaffleStore`], a plain get/put/delete/keys
//! interface over per-scope raffle collections. [`RaffleRepository`] wraps
//! a backend with per-(scope, name) locks and is the only way the engine
//! mutates raffles.

use crate::raffle::{RaffleDefinition, ScopeId};
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

pub mod memory;
pub mod redb;
pub mod repository;

pub use memory::MemoryStore;
pub use self::redb::RedbStore;
pub use repository::RaffleRepository;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Identifies one raffle: names are unique within a scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RaffleKey {
    pub scope: ScopeId,
    pub name: String,
}

impl RaffleKey {
    pub fn new(scope: ScopeId, name: impl Into<String>) -> Self {
        Self {
            scope,
            name: name.into(),
        }
    }
}

impl fmt::Display for RaffleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.scope, self.name)
    }
}

#[async_trait]
pub trait RaffleStore: Send + Sync {
    /// Fetch a raffle definition.
    async fn get(&self, key: &RaffleKey) -> Result<Option<RaffleDefinition>, StoreError>;

    /// Insert or replace a raffle definition.
    async fn put(&self, key: &RaffleKey, raffle: &RaffleDefinition) -> Result<(), StoreError>;

    /// Remove a raffle definition. Returns whether it existed.
    async fn delete(&self, key: &RaffleKey) -> Result<bool, StoreError>;

    /// Names of all raffles in a scope, sorted.
    async fn keys(&self, scope: ScopeId) -> Result<Vec<String>, StoreError>;
}
