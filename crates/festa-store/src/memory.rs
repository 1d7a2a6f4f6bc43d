//! In-memory record and batch store

use std::collections::HashMap;

use festa_domain::traits::{BatchStore, RecordQuery, RecordStore};
use festa_domain::{Batch, BatchId, RecordId, StructuredRecord};

use crate::StoreError;

/// HashMap-backed `RecordStore` and `BatchStore`
///
/// Used by tests and by sessions that should leave nothing behind.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    records: HashMap<RecordId, (u64, StructuredRecord)>,
    batches: HashMap<BatchId, (u64, Batch)>,
    next_seq: u64,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RecordStore for MemoryStore {
    type Error = StoreError;

    fn create(&mut self, record: StructuredRecord) -> Result<RecordId, Self::Error> {
        if self.records.contains_key(&record.id) {
            return Err(StoreError::Duplicate(record.id.to_string()));
        }
        let id = record.id;
        self.records.insert(id, (self.next_seq, record));
        self.next_seq += 1;
        Ok(id)
    }

    fn update(&mut self, record: StructuredRecord) -> Result<(), Self::Error> {
        match self.records.get_mut(&record.id) {
            Some(slot) => {
                slot.1 = record;
                Ok(())
            }
            None => Err(StoreError::NotFound(record.id.to_string())),
        }
    }

    fn delete(&mut self, id: RecordId) -> Result<bool, Self::Error> {
        self.batches.retain(|_, (_, b)| b.record_id != id);
        Ok(self.records.remove(&id).is_some())
    }

    fn get(&self, id: RecordId) -> Result<Option<StructuredRecord>, Self::Error> {
        Ok(self.records.get(&id).map(|(_, r)| r.clone()))
    }

    fn list(&self, query: &RecordQuery) -> Result<Vec<StructuredRecord>, Self::Error> {
        let mut entries: Vec<&(u64, StructuredRecord)> = self
            .records
            .values()
            .filter(|(_, r)| query.matches(r))
            .collect();
        // Newest first, insertion order breaks ties
        entries.sort_by(|a, b| {
            b.1.created_at
                .cmp(&a.1.created_at)
                .then_with(|| b.0.cmp(&a.0))
        });
        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(entries.into_iter().take(limit).map(|(_, r)| r.clone()).collect())
    }
}

impl BatchStore for MemoryStore {
    type Error = StoreError;

    fn save_batch(&mut self, batch: &Batch) -> Result<(), Self::Error> {
        match self.batches.get_mut(&batch.id) {
            Some(slot) => slot.1 = batch.clone(),
            None => {
                self.batches.insert(batch.id, (self.next_seq, batch.clone()));
                self.next_seq += 1;
            }
        }
        Ok(())
    }

    fn get_batch(&self, id: BatchId) -> Result<Option<Batch>, Self::Error> {
        Ok(self.batches.get(&id).map(|(_, b)| b.clone()))
    }

    fn batches_for(&self, record_id: RecordId) -> Result<Vec<Batch>, Self::Error> {
        let mut entries: Vec<&(u64, Batch)> = self
            .batches
            .values()
            .filter(|(_, b)| b.record_id == record_id)
            .collect();
        entries.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(entries.into_iter().map(|(_, b)| b.clone()).collect())
    }
}
