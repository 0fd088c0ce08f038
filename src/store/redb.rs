//! Redb-backed persistent raffle storage.
//!
//! One table, keyed by `"{scope}\0{name}"` so a scope's raffles are a
//! contiguous, name-ordered key range. Values are JSON-encoded
//! [`RaffleDefinition`]s.

use super::{RaffleKey, RaffleStore, StoreError};
use crate::raffle::{RaffleDefinition, ScopeId};
use async_trait::async_trait;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::Arc;

const RAFFLES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("raffles");

pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = Database::create(path).map_err(|e| StoreError::Database(e.to_string()))?;

        // Create the table up front so reads on a fresh file don't fail.
        let write_txn = db
            .begin_write()
            .map_err(|e| StoreError::Database(e.to_string()))?;
        write_txn
            .open_table(RAFFLES_TABLE)
            .map_err(|e| StoreError::Database(e.to_string()))?;
        write_txn
            .commit()
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }

    fn make_key(key: &RaffleKey) -> String {
        format!("{:020}\0{}", key.scope, key.name)
    }

    fn scope_prefix(scope: ScopeId) -> String {
        format!("{:020}\0", scope)
    }
}

#[async_trait]
impl RaffleStore for RedbStore {
    async fn get(&self, key: &RaffleKey) -> Result<Option<RaffleDefinition>, StoreError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| StoreError::Database(e.to_string()))?;
        let table = read_txn
            .open_table(RAFFLES_TABLE)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let db_key = Self::make_key(key);
        match table
            .get(db_key.as_str())
            .map_err(|e| StoreError::Database(e.to_string()))?
        {
            Some(v) => {
                let raffle = serde_json::from_slice(v.value())
                    .map_err(|e| StoreError::Serialization(e.to_string()))?;
                Ok(Some(raffle))
            }
            None => Ok(None),
        }
    }

    async fn put(&self, key: &RaffleKey, raffle: &RaffleDefinition) -> Result<(), StoreError> {
        let db_key = Self::make_key(key);
        let value =
            serde_json::to_vec(raffle).map_err(|e| StoreError::Serialization(e.to_string()))?;

        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| StoreError::Database(e.to_string()))?;
        {
            let mut table = write_txn
                .open_table(RAFFLES_TABLE)
                .map_err(|e| StoreError::Database(e.to_string()))?;
            table
                .insert(db_key.as_str(), value.as_slice())
                .map_err(|e| StoreError::Database(e.to_string()))?;
        }
        write_txn
            .commit()
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(())
    }

    async fn delete(&self, key: &RaffleKey) -> Result<bool, StoreError> {
        let db_key = Self::make_key(key);
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| StoreError::Database(e.to_string()))?;
        let existed = {
            let mut table = write_txn
                .open_table(RAFFLES_TABLE)
                .map_err(|e| StoreError::Database(e.to_string()))?;
            table
                .remove(db_key.as_str())
                .map_err(|e| StoreError::Database(e.to_string()))?
                .is_some()
        };
        write_txn
            .commit()
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(existed)
    }

    async fn keys(&self, scope: ScopeId) -> Result<Vec<String>, StoreError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| StoreError::Database(e.to_string()))?;
        let table = read_txn
            .open_table(RAFFLES_TABLE)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let prefix = Self::scope_prefix(scope);
        // '\u{1}' sorts directly after the '\0' separator.
        let end = format!("{:020}\u{1}", scope);
        let range = table
            .range(prefix.as_str()..end.as_str())
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let mut names = Vec::new();
        for item in range {
            let (k, _v) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if let Some(name) = k.value().strip_prefix(prefix.as_str()) {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }
}
