//! Trait definitions for external interactions
//!
//! These traits define the boundaries between domain logic and infrastructure.
//! Infrastructure implementations live in other crates.

use crate::{Batch, BatchId, RecordId, StructuredRecord};

/// Trait for storing and retrieving contest records
///
/// Implemented by the infrastructure layer (festa-store). Writes are
/// last-writer-wins; there is no versioning.
pub trait RecordStore {
    /// Error type for store operations
    type Error;

    /// Insert a new record
    fn create(&mut self, record: StructuredRecord) -> Result<RecordId, Self::Error>;

    /// Replace an existing record
    fn update(&mut self, record: StructuredRecord) -> Result<(), Self::Error>;

    /// Delete a record, returning whether it existed
    fn delete(&mut self, id: RecordId) -> Result<bool, Self::Error>;

    /// Get a record by ID
    fn get(&self, id: RecordId) -> Result<Option<StructuredRecord>, Self::Error>;

    /// List records matching criteria, newest first
    fn list(&self, query: &RecordQuery) -> Result<Vec<StructuredRecord>, Self::Error>;
}

/// Trait for keeping finished batches
///
/// A record points at its latest batch through `last_batch_id`. Deleting a
/// record deletes its batches.
pub trait BatchStore {
    /// Error type for store operations
    type Error;

    /// Insert a batch, or replace the stored one with the same id
    fn save_batch(&mut self, batch: &Batch) -> Result<(), Self::Error>;

    /// Get a batch by ID
    fn get_batch(&self, id: BatchId) -> Result<Option<Batch>, Self::Error>;

    /// Batches analyzed against one record, most recently saved first
    fn batches_for(&self, record_id: RecordId) -> Result<Vec<Batch>, Self::Error>;
}

/// Query criteria for listing records
#[derive(Debug, Clone, Default)]
pub struct RecordQuery {
    /// Case-insensitive substring of the contest or display name
    pub name_contains: Option<String>,

    /// Maximum results to return
    pub limit: Option<usize>,
}

impl RecordQuery {
    /// Whether a record satisfies the name filter
    pub fn matches(&self, record: &StructuredRecord) -> bool {
        match &self.name_contains {
            None => true,
            Some(needle) => {
                let needle = needle.to_lowercase();
                record.display_name.to_lowercase().contains(&needle)
                    || record
                        .name
                        .as_deref()
                        .map(|n| n.to_lowercase().contains(&needle))
                        .unwrap_or(false)
            }
        }
    }
}
