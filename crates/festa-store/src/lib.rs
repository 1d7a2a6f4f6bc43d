//! Festa Storage Layer
//!
//! Implements the `RecordStore` and `BatchStore` traits from `festa-domain`.
//!
//! # Architecture
//!
//! - `SqliteStore`: one row per record, the record itself kept as a JSON
//!   document with a few columns copied out for ordering, and one row per
//!   analyzed batch
//! - `MemoryStore`: a map, for tests and throwaway sessions
//! - `backup`: JSON export and import through any `RecordStore`
//!
//! Writes are last-writer-wins. There is no versioning or conflict detection.
//!
//! # Examples
//!
//! ```no_run
//! use festa_store::SqliteStore;
//!
//! let store = SqliteStore::new(":memory:").unwrap();
//! // Store is now ready for record operations
//! ```

#![warn(missing_docs)]

pub mod backup;
mod memory;

use chrono::Utc;
use festa_domain::traits::{BatchStore, RecordQuery, RecordStore};
use festa_domain::{Batch, BatchId, RecordId, StructuredRecord};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

pub use backup::{export_json, import_json, ImportMode, ImportSummary};
pub use memory::MemoryStore;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A record with this id already exists
    #[error("Duplicate record: {0}")]
    Duplicate(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::InvalidData(e.to_string())
    }
}

/// SQLite-based implementation of RecordStore
///
/// # Thread Safety
///
/// SQLite connections are not thread-safe. Each thread should have its own
/// SqliteStore instance.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Create a new SqliteStore with the given database path
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let mut store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&mut self) -> Result<(), StoreError> {
        let schema = include_str!("schema.sql");
        self.conn.execute_batch(schema)?;
        Ok(())
    }

    fn id_to_bytes(id: RecordId) -> Vec<u8> {
        id.value().to_be_bytes().to_vec()
    }

    fn batch_id_to_bytes(id: BatchId) -> Vec<u8> {
        id.value().to_be_bytes().to_vec()
    }

    fn exists(&self, id_bytes: &[u8]) -> Result<bool, StoreError> {
        let exists = self
            .conn
            .query_row(
                "SELECT 1 FROM records WHERE id = ?1",
                params![id_bytes],
                |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        Ok(exists)
    }

    fn decode(body: &str) -> Result<StructuredRecord, rusqlite::Error> {
        serde_json::from_str(body).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
        })
    }

    fn decode_batch(body: &str) -> Result<Batch, rusqlite::Error> {
        serde_json::from_str(body).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })
    }

    /// Number of stored records
    pub fn count(&self) -> Result<usize, StoreError> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}

impl RecordStore for SqliteStore {
    type Error = StoreError;

    fn create(&mut self, record: StructuredRecord) -> Result<RecordId, Self::Error> {
        let id_bytes = Self::id_to_bytes(record.id);
        if self.exists(&id_bytes)? {
            return Err(StoreError::Duplicate(record.id.to_string()));
        }

        let body = serde_json::to_string(&record)?;
        self.conn.execute(
            "INSERT INTO records (id, display_name, name, deadline_gregorian, created_at, updated_at, body)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                &id_bytes,
                &record.display_name,
                &record.name,
                record.deadline_gregorian(),
                record.created_at.timestamp_micros(),
                record.updated_at.timestamp_micros(),
                &body,
            ],
        )?;
        debug!("Created record {} '{}'", record.id, record.label());

        Ok(record.id)
    }

    fn update(&mut self, record: StructuredRecord) -> Result<(), Self::Error> {
        let id_bytes = Self::id_to_bytes(record.id);
        let body = serde_json::to_string(&record)?;
        let changed = self.conn.execute(
            "UPDATE records SET display_name = ?2, name = ?3, deadline_gregorian = ?4,
             updated_at = ?5, body = ?6 WHERE id = ?1",
            params![
                &id_bytes,
                &record.display_name,
                &record.name,
                record.deadline_gregorian(),
                record.updated_at.timestamp_micros(),
                &body,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(record.id.to_string()));
        }
        debug!("Updated record {}", record.id);
        Ok(())
    }

    fn delete(&mut self, id: RecordId) -> Result<bool, Self::Error> {
        let id_bytes = Self::id_to_bytes(id);
        let tx = self.conn.transaction()?;
        let changed = tx.execute("DELETE FROM records WHERE id = ?1", params![&id_bytes])?;
        let batches = tx.execute(
            "DELETE FROM batches WHERE record_id = ?1",
            params![&id_bytes],
        )?;
        tx.commit()?;
        if batches > 0 {
            debug!("Deleted {} batch(es) of record {}", batches, id);
        }
        Ok(changed > 0)
    }

    fn get(&self, id: RecordId) -> Result<Option<StructuredRecord>, Self::Error> {
        let id_bytes = Self::id_to_bytes(id);
        let record = self
            .conn
            .query_row(
                "SELECT body FROM records WHERE id = ?1",
                params![&id_bytes],
                |row| {
                    let body: String = row.get(0)?;
                    Self::decode(&body)
                },
            )
            .optional()?;
        Ok(record)
    }

    fn list(&self, query: &RecordQuery) -> Result<Vec<StructuredRecord>, Self::Error> {
        let mut stmt = self
            .conn
            .prepare("SELECT body FROM records ORDER BY created_at DESC, id DESC")?;
        let records = stmt
            .query_map([], |row| {
                let body: String = row.get(0)?;
                Self::decode(&body)
            })?
            .collect::<Result<Vec<_>, _>>()?;

        // Name filtering happens here so it is Unicode case-insensitive
        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(records
            .into_iter()
            .filter(|r| query.matches(r))
            .take(limit)
            .collect())
    }
}

impl BatchStore for SqliteStore {
    type Error = StoreError;

    fn save_batch(&mut self, batch: &Batch) -> Result<(), Self::Error> {
        let body = serde_json::to_string(batch)?;
        self.conn.execute(
            "INSERT INTO batches (id, record_id, saved_at, body) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET body = excluded.body",
            params![
                Self::batch_id_to_bytes(batch.id),
                Self::id_to_bytes(batch.record_id),
                Utc::now().timestamp_micros(),
                &body,
            ],
        )?;
        debug!("Saved batch {} ({} item(s))", batch.id, batch.items.len());
        Ok(())
    }

    fn get_batch(&self, id: BatchId) -> Result<Option<Batch>, Self::Error> {
        let batch = self
            .conn
            .query_row(
                "SELECT body FROM batches WHERE id = ?1",
                params![Self::batch_id_to_bytes(id)],
                |row| {
                    let body: String = row.get(0)?;
                    Self::decode_batch(&body)
                },
            )
            .optional()?;
        Ok(batch)
    }

    fn batches_for(&self, record_id: RecordId) -> Result<Vec<Batch>, Self::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT body FROM batches WHERE record_id = ?1 ORDER BY saved_at DESC, rowid DESC",
        )?;
        let batches = stmt
            .query_map(params![Self::id_to_bytes(record_id)], |row| {
                let body: String = row.get(0)?;
                Self::decode_batch(&body)
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(batches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use festa_domain::{ContentKind, ItemInput, ItemStatus, TopicFocus};

    fn record(name: &str) -> StructuredRecord {
        let mut r = StructuredRecord::new(format!("{}.pdf", name), ContentKind::Document, "text");
        r.name = Some(name.to_string());
        r
    }

    #[test]
    fn test_store_initialization() {
        let store = SqliteStore::new(":memory:").unwrap();
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_create_and_get() {
        let mut store = SqliteStore::new(":memory:").unwrap();
        let mut r = record("Nature Lens");
        r.set_deadline_persian("1403/02/10").unwrap();
        let id = store.create(r.clone()).unwrap();

        let loaded = store.get(id).unwrap().unwrap();
        assert_eq!(loaded, r);
        assert_eq!(loaded.deadline_gregorian(), Some("2024-04-29"));
    }

    #[test]
    fn test_duplicate_create_rejected() {
        let mut store = SqliteStore::new(":memory:").unwrap();
        let r = record("A");
        store.create(r.clone()).unwrap();
        assert!(matches!(store.create(r), Err(StoreError::Duplicate(_))));
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let mut store = SqliteStore::new(":memory:").unwrap();
        assert!(matches!(
            store.update(record("A")),
            Err(StoreError::NotFound(_))
        ));
    }

    fn batch(record_id: RecordId, names: &[&str]) -> Batch {
        let inputs = names
            .iter()
            .map(|n| ItemInput {
                name: n.to_string(),
                mime: "image/jpeg".to_string(),
                bytes: Vec::new(),
                note: None,
            })
            .collect();
        Batch::new(record_id, TopicFocus::Holistic, inputs)
    }

    #[test]
    fn test_save_batch_replaces_same_id() {
        let mut store = SqliteStore::new(":memory:").unwrap();
        let id = store.create(record("A")).unwrap();
        let mut b = batch(id, &["a.jpg", "b.jpg"]);
        store.save_batch(&b).unwrap();

        b.items[0].transition(ItemStatus::Cancelled).unwrap();
        b.items[1].transition(ItemStatus::Cancelled).unwrap();
        b.remove_item(0).unwrap();
        store.save_batch(&b).unwrap();

        assert_eq!(store.get_batch(b.id).unwrap().unwrap(), b);
        assert_eq!(store.batches_for(id).unwrap().len(), 1);
    }

    #[test]
    fn test_batches_for_newest_first() {
        let mut store = SqliteStore::new(":memory:").unwrap();
        let id = store.create(record("A")).unwrap();
        let first = batch(id, &["a.jpg"]);
        let second = batch(id, &["b.jpg"]);
        store.save_batch(&first).unwrap();
        store.save_batch(&second).unwrap();
        store.save_batch(&batch(RecordId::new(), &["c.jpg"])).unwrap();

        let ids: Vec<_> = store.batches_for(id).unwrap().iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[test]
    fn test_delete_record_drops_its_batches() {
        let mut store = SqliteStore::new(":memory:").unwrap();
        let id = store.create(record("A")).unwrap();
        let b = batch(id, &["a.jpg"]);
        store.save_batch(&b).unwrap();

        assert!(store.delete(id).unwrap());
        assert!(store.get_batch(b.id).unwrap().is_none());
        assert!(store.batches_for(id).unwrap().is_empty());
    }
}
