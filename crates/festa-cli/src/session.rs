//! Everything a command needs: configuration, the store, the provider and
//! the abort coordinator.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use festa_domain::traits::{RecordQuery, RecordStore};
use festa_domain::{AbortCoordinator, OperationKind, StructuredRecord};
use festa_llm::{GeminiProvider, InferenceService, MockInference};
use festa_store::{SqliteStore, StoreError};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{CliError, Result};

/// Shared state for one CLI invocation
pub struct Session {
    /// Effective configuration
    pub config: Config,
    /// Operation registry
    pub coordinator: AbortCoordinator,
    store: Arc<Mutex<SqliteStore>>,
    offline: bool,
}

impl Session {
    /// Open the database at `path`, creating its directory if needed
    pub fn open(config: Config, path: &Path, offline: bool) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let store = SqliteStore::new(path)?;
        debug!("Opened database {}", path.display());
        Ok(Self {
            config,
            coordinator: AbortCoordinator::new(),
            store: Arc::new(Mutex::new(store)),
            offline,
        })
    }

    /// Open an in-memory database
    pub fn in_memory(config: Config) -> Result<Self> {
        Self::open(config, &PathBuf::from(":memory:"), true)
    }

    /// Shared handle to the store
    pub fn store(&self) -> Arc<Mutex<SqliteStore>> {
        Arc::clone(&self.store)
    }

    fn lock(&self) -> MutexGuard<'_, SqliteStore> {
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run `f` with exclusive access to the store
    pub fn with_store<T>(
        &self,
        f: impl FnOnce(&mut SqliteStore) -> std::result::Result<T, StoreError>,
    ) -> Result<T> {
        let mut store = self.lock();
        Ok(f(&mut store)?)
    }

    /// The inference provider, built on first use
    ///
    /// Commands that never call the service do not need an API key.
    pub fn inference(&self) -> Result<Arc<dyn InferenceService>> {
        if self.offline {
            info!("Using the offline provider");
            return Ok(Arc::new(MockInference::new()));
        }
        let provider = GeminiProvider::new(self.config.gemini.clone())?;
        Ok(Arc::new(provider))
    }

    /// Find a record by full id or unique id prefix
    pub fn resolve(&self, id: &str) -> Result<StructuredRecord> {
        let needle = id.trim().to_lowercase().replace('-', "");
        if needle.is_empty() {
            return Err(CliError::InvalidInput("Record id is empty".to_string()));
        }

        let records = self.with_store(|s| s.list(&RecordQuery::default()))?;
        let mut matches: Vec<StructuredRecord> = records
            .into_iter()
            .filter(|r| r.id.to_string().replace('-', "").starts_with(&needle))
            .collect();

        match matches.len() {
            0 => Err(CliError::NotFound(id.to_string())),
            1 => Ok(matches.remove(0)),
            n => Err(CliError::InvalidInput(format!(
                "'{}' matches {} records; use more characters",
                id, n
            ))),
        }
    }

    /// Save changes to an existing record
    pub fn update(&self, mut record: StructuredRecord) -> Result<StructuredRecord> {
        record.touch();
        let saved = record.clone();
        self.with_store(|s| s.update(record))?;
        Ok(saved)
    }

    /// Cancel the live operation of `kind` when Ctrl+C is pressed
    ///
    /// Abort the returned handle once the operation is over.
    pub fn cancel_on_ctrl_c(&self, kind: OperationKind) -> JoinHandle<()> {
        let coordinator = self.coordinator.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupt received, cancelling {}", kind);
                coordinator.cancel_kind(kind);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use festa_domain::ContentKind;

    fn session_with(names: &[&str]) -> (Session, Vec<StructuredRecord>) {
        let session = Session::in_memory(Config::default()).unwrap();
        let mut records = Vec::new();
        for name in names {
            let mut r = StructuredRecord::new(format!("{}.pdf", name), ContentKind::Document, "");
            r.name = Some(name.to_string());
            session.with_store(|s| s.create(r.clone())).unwrap();
            records.push(r);
        }
        (session, records)
    }

    #[test]
    fn test_resolve_full_id_and_prefix() {
        let (session, records) = session_with(&["A"]);
        let id = records[0].id;

        assert_eq!(session.resolve(&id.to_string()).unwrap().id, id);
        assert_eq!(session.resolve(&id.short()).unwrap().id, id);
    }

    #[test]
    fn test_resolve_unknown() {
        let (session, _) = session_with(&["A"]);
        assert!(matches!(session.resolve("ffffffff"), Err(CliError::NotFound(_))));
        assert!(matches!(session.resolve("  "), Err(CliError::InvalidInput(_))));
    }

    #[test]
    fn test_resolve_ambiguous_prefix() {
        let (session, records) = session_with(&["A", "B"]);
        // UUIDv7 ids created together share their timestamp prefix
        let shared = &records[0].id.short()[..4];
        if records[1].id.short().starts_with(shared) {
            assert!(matches!(session.resolve(shared), Err(CliError::InvalidInput(_))));
        }
    }

    #[test]
    fn test_update_touches_record() {
        let (session, records) = session_with(&["A"]);
        let mut r = records[0].clone();
        r.objectives = Some("Show the city at night".to_string());

        let saved = session.update(r).unwrap();
        assert!(saved.updated_at >= records[0].updated_at);
        let loaded = session.resolve(&saved.id.to_string()).unwrap();
        assert_eq!(loaded.objectives.as_deref(), Some("Show the city at night"));
    }

    #[test]
    fn test_offline_provider_needs_no_key() {
        let session = Session::in_memory(Config::default()).unwrap();
        assert_eq!(session.inference().unwrap().name(), "mock");
    }
}
