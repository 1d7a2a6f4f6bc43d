//! JSON backup and restore
//!
//! A backup is a pretty-printed JSON array of records. It goes through the
//! `RecordStore` trait, so it works the same for every store.

use festa_domain::traits::{RecordQuery, RecordStore};
use festa_domain::StructuredRecord;
use tracing::{info, warn};

use crate::StoreError;

/// How imported records combine with existing ones
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportMode {
    /// Delete every existing record first
    Replace,
    /// Keep existing records; imported records with the same id overwrite them
    Merge,
}

/// What an import did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Records inserted
    pub created: usize,
    /// Existing records overwritten
    pub updated: usize,
    /// Existing records removed by `Replace`
    pub removed: usize,
}

/// Serialize every record in the store
pub fn export_json<S>(store: &S) -> Result<String, StoreError>
where
    S: RecordStore<Error = StoreError>,
{
    let records = store.list(&RecordQuery::default())?;
    let json = serde_json::to_string_pretty(&records)?;
    info!("Exported {} records", records.len());
    Ok(json)
}

/// Load records from a backup produced by [`export_json`]
///
/// The whole document is parsed before the store is touched, so a malformed
/// backup leaves the store unchanged.
pub fn import_json<S>(store: &mut S, json: &str, mode: ImportMode) -> Result<ImportSummary, StoreError>
where
    S: RecordStore<Error = StoreError>,
{
    let records: Vec<StructuredRecord> = serde_json::from_str(json)
        .map_err(|e| StoreError::InvalidData(format!("Backup is not a record array: {}", e)))?;

    let mut summary = ImportSummary::default();

    if mode == ImportMode::Replace {
        for existing in store.list(&RecordQuery::default())? {
            if store.delete(existing.id)? {
                summary.removed += 1;
            }
        }
    }

    for record in records {
        if store.get(record.id)?.is_some() {
            warn!("Backup overwrites existing record {}", record.id);
            store.update(record)?;
            summary.updated += 1;
        } else {
            store.create(record)?;
            summary.created += 1;
        }
    }

    info!(
        "Imported backup: {} created, {} updated, {} removed",
        summary.created, summary.updated, summary.removed
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use festa_domain::ContentKind;

    #[test]
    fn test_malformed_backup_leaves_store_untouched() {
        let mut store = MemoryStore::new();
        store
            .create(StructuredRecord::new("a.pdf", ContentKind::Document, ""))
            .unwrap();
        let result = import_json(&mut store, "{\"not\": \"an array\"}", ImportMode::Replace);
        assert!(matches!(result, Err(StoreError::InvalidData(_))));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_merge_overwrites_same_id() {
        let mut store = MemoryStore::new();
        let mut r = StructuredRecord::new("a.pdf", ContentKind::Document, "");
        store.create(r.clone()).unwrap();
        r.name = Some("From backup".to_string());
        let json = serde_json::to_string(&vec![r.clone()]).unwrap();

        let summary = import_json(&mut store, &json, ImportMode::Merge).unwrap();
        assert_eq!(summary, ImportSummary { created: 0, updated: 1, removed: 0 });
        assert_eq!(store.get(r.id).unwrap().unwrap().name.as_deref(), Some("From backup"));
    }
}
