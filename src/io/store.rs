//! The data store: owns the persisted document and runs every record
//! operation as a whole-document read-modify-write.
//!
//! Persistence goes through a [`Backend`], a plain key -> string store.
//! [`DirBackend`] keeps one JSON file per key in the `.tracker/` directory;
//! [`MemoryBackend`] keeps everything in memory.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde_json::Value;

use crate::io::config_io::ConfigError;
use crate::io::lock::LockError;
use crate::io::recovery::{self, RecoveryCategory, RecoveryEntry};
use crate::model::category::{Category, CategoryGroup, CategoryPatch};
use crate::model::document::Document;
use crate::model::progress::{CategoryProgress, GroupProgress, OverallProgress};
use crate::model::task::{Priority, Task, TaskPatch};
use crate::ops::import::{ImportError, ImportReport};
use crate::ops::{OpError, category_ops, import, progress, task_ops};

/// Key under which the document is persisted
pub const DOCUMENT_KEY: &str = "progress_tracker_data";

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("not a tracker directory: no .tracker/ found (run `pt init`)")]
    NotAStore,
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("stored document is corrupt: {0} (fix the file or run `pt import`)")]
    Corrupt(serde_json::Error),
    #[error("could not serialize document: {0}")]
    Serialize(serde_json::Error),
    #[error(transparent)]
    Op(#[from] OpError),
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Backends
// ---------------------------------------------------------------------------

/// A persistent key -> value store.
pub trait Backend {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;

    /// Where displaced documents are logged, if anywhere
    fn recovery_dir(&self) -> Option<&Path> {
        None
    }
}

/// Stores each key as `<key>.json` inside a directory.
#[derive(Debug, Clone)]
pub struct DirBackend {
    dir: PathBuf,
}

impl DirBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        DirBackend { dir: dir.into() }
    }

    pub fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl Backend for DirBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.key_path(key);
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Read { path, source: e }),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.key_path(key);
        if let Err(e) = recovery::atomic_write(&path, value.as_bytes()) {
            recovery::log_recovery(
                &self.dir,
                RecoveryEntry {
                    timestamp: chrono::Utc::now(),
                    category: RecoveryCategory::Write,
                    description: "document write failed".to_string(),
                    fields: vec![
                        ("Target".to_string(), path.display().to_string()),
                        ("Error".to_string(), e.to_string()),
                    ],
                    body: value.to_string(),
                },
            );
            return Err(StoreError::Write { path, source: e });
        }
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        let path = self.key_path(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Write { path, source: e }),
        }
    }

    fn recovery_dir(&self) -> Option<&Path> {
        Some(&self.dir)
    }
}

/// Keeps every key in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    entries: HashMap<String, String>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        MemoryBackend::default()
    }
}

impl Backend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Data store
// ---------------------------------------------------------------------------

/// Owner of the persisted document.
pub struct DataStore<B: Backend> {
    backend: B,
}

impl<B: Backend> DataStore<B> {
    pub fn new(backend: B) -> Self {
        DataStore { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    // --- Lifecycle ---

    /// Create the empty document if nothing is persisted yet.
    pub fn init(&mut self) -> Result<(), StoreError> {
        if self.backend.get(DOCUMENT_KEY)?.is_none() {
            self.write(&Document::empty())?;
            info!("event=store_init status=ok");
        }
        Ok(())
    }

    /// Read the persisted document, creating it on first access.
    pub fn load(&mut self) -> Result<Document, StoreError> {
        match self.backend.get(DOCUMENT_KEY)? {
            Some(text) => serde_json::from_str(&text).map_err(StoreError::Corrupt),
            None => {
                let doc = Document::empty();
                self.write(&doc)?;
                info!("event=store_init status=ok");
                Ok(doc)
            }
        }
    }

    /// Stamp `last_updated` and persist the whole document.
    pub fn save(&mut self, doc: &mut Document) -> Result<(), StoreError> {
        doc.touch();
        self.write(doc)
    }

    fn write(&mut self, doc: &Document) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(doc).map_err(StoreError::Serialize)?;
        self.backend.set(DOCUMENT_KEY, &json)
    }

    /// Load, apply `f`, and save. Nothing is persisted when `f` fails.
    pub fn mutate<T>(
        &mut self,
        f: impl FnOnce(&mut Document) -> Result<T, OpError>,
    ) -> Result<T, StoreError> {
        let mut doc = self.load()?;
        let out = f(&mut doc)?;
        self.save(&mut doc)?;
        Ok(out)
    }

    /// Discard the persisted document and start over with an empty one.
    pub fn clear_all(&mut self) -> Result<Document, StoreError> {
        self.preserve_current(RecoveryCategory::Clear, "document cleared");
        self.backend.remove(DOCUMENT_KEY)?;
        info!("event=store_clear status=ok");
        self.load()
    }

    /// Copy the current document into the recovery log before it is replaced.
    fn preserve_current(&self, category: RecoveryCategory, description: &str) {
        let Some(dir) = self.backend.recovery_dir() else {
            return;
        };
        if let Ok(Some(text)) = self.backend.get(DOCUMENT_KEY) {
            recovery::log_displaced_document(dir, category, description, text);
        }
    }

    // --- Categories ---

    pub fn create_category(
        &mut self,
        name: &str,
        group: CategoryGroup,
        color: Option<&str>,
    ) -> Result<Category, StoreError> {
        let category =
            self.mutate(|doc| category_ops::create_category(doc, name, group, color))?;
        debug!("event=category_create status=ok id={}", category.id);
        Ok(category)
    }

    pub fn update_category(&mut self, id: &str, patch: CategoryPatch) -> Result<Category, StoreError> {
        let category = self.mutate(|doc| category_ops::update_category(doc, id, patch))?;
        debug!("event=category_update status=ok id={}", id);
        Ok(category)
    }

    /// Returns the number of cascaded task deletions, or `None` if absent.
    pub fn delete_category(&mut self, id: &str) -> Result<Option<usize>, StoreError> {
        let removed = self.mutate(|doc| Ok(category_ops::delete_category(doc, id)))?;
        debug!(
            "event=category_delete status=ok id={} cascaded={}",
            id,
            removed.unwrap_or(0)
        );
        Ok(removed)
    }

    pub fn reorder_categories(&mut self, ordered_ids: &[String]) -> Result<usize, StoreError> {
        self.mutate(|doc| Ok(category_ops::reorder_categories(doc, ordered_ids)))
    }

    pub fn get_category(&mut self, id: &str) -> Result<Category, StoreError> {
        let doc = self.load()?;
        Ok(category_ops::find_category(&doc, id)?.clone())
    }

    pub fn list_categories(&mut self) -> Result<Vec<Category>, StoreError> {
        let doc = self.load()?;
        Ok(category_ops::list_categories(&doc).into_iter().cloned().collect())
    }

    // --- Tasks ---

    pub fn create_task(
        &mut self,
        title: &str,
        weight: u32,
        category_id: &str,
        priority: Priority,
    ) -> Result<Task, StoreError> {
        let task =
            self.mutate(|doc| task_ops::create_task(doc, title, weight, category_id, priority))?;
        debug!("event=task_create status=ok id={}", task.id);
        Ok(task)
    }

    pub fn update_task(&mut self, id: &str, patch: TaskPatch) -> Result<Task, StoreError> {
        let task = self.mutate(|doc| task_ops::update_task(doc, id, patch))?;
        debug!("event=task_update status=ok id={}", id);
        Ok(task)
    }

    pub fn toggle_completed(&mut self, id: &str) -> Result<Task, StoreError> {
        self.mutate(|doc| task_ops::toggle_completed(doc, id))
    }

    pub fn toggle_pinned(&mut self, id: &str) -> Result<Task, StoreError> {
        self.mutate(|doc| task_ops::toggle_pinned(doc, id))
    }

    /// Returns false when no such task existed.
    pub fn delete_task(&mut self, id: &str) -> Result<bool, StoreError> {
        let removed = self.mutate(|doc| Ok(task_ops::delete_task(doc, id)))?;
        debug!("event=task_delete status=ok id={} removed={}", id, removed);
        Ok(removed)
    }

    pub fn reorder_tasks(
        &mut self,
        category_id: &str,
        ordered_ids: &[String],
    ) -> Result<usize, StoreError> {
        self.mutate(|doc| Ok(task_ops::reorder_tasks(doc, category_id, ordered_ids)))
    }

    pub fn get_task(&mut self, id: &str) -> Result<Task, StoreError> {
        let doc = self.load()?;
        Ok(task_ops::find_task(&doc, id)?.clone())
    }

    pub fn list_tasks(&mut self) -> Result<Vec<Task>, StoreError> {
        let doc = self.load()?;
        Ok(task_ops::list_tasks(&doc).into_iter().cloned().collect())
    }

    pub fn list_tasks_in_category(&mut self, category_id: &str) -> Result<Vec<Task>, StoreError> {
        let doc = self.load()?;
        Ok(task_ops::list_tasks_in_category(&doc, category_id)
            .into_iter()
            .cloned()
            .collect())
    }

    // --- Progress ---

    pub fn category_progress(&mut self) -> Result<Vec<CategoryProgress>, StoreError> {
        Ok(progress::compute_category_progress(&self.load()?))
    }

    pub fn progress_for(&mut self, category_id: &str) -> Result<CategoryProgress, StoreError> {
        Ok(progress::category_progress(&self.load()?, category_id)?)
    }

    pub fn grouped_progress(
        &mut self,
    ) -> Result<indexmap::IndexMap<CategoryGroup, GroupProgress>, StoreError> {
        Ok(progress::compute_grouped_progress(&self.load()?))
    }

    pub fn overall_progress(&mut self) -> Result<OverallProgress, StoreError> {
        Ok(progress::overall_progress(&self.load()?))
    }

    // --- Import / export ---

    /// The full document, unmodified.
    pub fn export(&mut self) -> Result<Document, StoreError> {
        Ok(import::export_document(&self.load()?))
    }

    /// Replace the whole document with a repaired copy of `candidate`.
    ///
    /// On a validation failure the persisted document is left as it was.
    pub fn import(&mut self, candidate: &Value) -> Result<ImportReport, StoreError> {
        let (doc, report) = import::import_value(candidate)?;
        self.replace(doc, &report)?;
        Ok(report)
    }

    /// Read a previously exported file and import it.
    pub fn import_file(&mut self, path: &Path) -> Result<ImportReport, StoreError> {
        let text = fs::read_to_string(path).map_err(|e| ImportError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let (doc, report) = import::import_json(&text)?;
        self.replace(doc, &report)?;
        Ok(report)
    }

    fn replace(&mut self, mut doc: Document, report: &ImportReport) -> Result<(), StoreError> {
        self.preserve_current(RecoveryCategory::Import, "document replaced by import");
        self.save(&mut doc)?;
        info!(
            "event=import status=ok categories={} tasks={}",
            report.categories, report.tasks
        );
        if !report.is_clean() {
            warn!(
                "event=import_repair repaired_fields={} regenerated_ids={} dropped_orphans={} skipped_entries={}",
                report.repaired_fields,
                report.regenerated_ids,
                report.dropped_orphans,
                report.skipped_entries
            );
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn memory_store() -> DataStore<MemoryBackend> {
        DataStore::new(MemoryBackend::new())
    }

    #[test]
    fn test_load_creates_document_lazily() {
        let mut store = memory_store();
        assert!(store.backend().get(DOCUMENT_KEY).unwrap().is_none());
        let doc = store.load().unwrap();
        assert!(doc.categories.is_empty());
        assert!(store.backend().get(DOCUMENT_KEY).unwrap().is_some());
    }

    #[test]
    fn test_init_is_idempotent() {
        let mut store = memory_store();
        store.init().unwrap();
        store.create_category("A", CategoryGroup::Work, None).unwrap();
        store.init().unwrap();
        assert_eq!(store.list_categories().unwrap().len(), 1);
    }

    #[test]
    fn test_mutation_persists_and_touches() {
        let mut store = memory_store();
        let before = store.load().unwrap().settings.last_updated;
        let cat = store.create_category("A", CategoryGroup::Work, None).unwrap();
        let doc = store.load().unwrap();
        assert_eq!(doc.categories[0].id, cat.id);
        assert!(doc.settings.last_updated >= before);
    }

    #[test]
    fn test_failed_mutation_leaves_document() {
        let mut store = memory_store();
        store.create_category("A", CategoryGroup::Work, None).unwrap();
        let before = store.backend().get(DOCUMENT_KEY).unwrap();

        assert!(matches!(
            store.create_category(" ", CategoryGroup::Work, None),
            Err(StoreError::Op(OpError::Validation(_)))
        ));
        assert!(matches!(
            store.update_task("missing", TaskPatch::default()),
            Err(StoreError::Op(OpError::NotFound { .. }))
        ));
        assert_eq!(store.backend().get(DOCUMENT_KEY).unwrap(), before);
    }

    #[test]
    fn test_failed_import_leaves_document() {
        let mut store = memory_store();
        store.create_category("A", CategoryGroup::Work, None).unwrap();
        let before = store.backend().get(DOCUMENT_KEY).unwrap();

        let err = store.import(&json!({})).unwrap_err();
        assert!(matches!(err, StoreError::Op(OpError::Validation(_))));
        assert_eq!(store.backend().get(DOCUMENT_KEY).unwrap(), before);
    }

    #[test]
    fn test_import_replaces_wholesale() {
        let mut store = memory_store();
        store.create_category("Old", CategoryGroup::Work, None).unwrap();
        let report = store
            .import(&json!({
                "categories": [{"id": "c1", "name": "New"}],
                "tasks": [],
                "settings": {}
            }))
            .unwrap();
        assert_eq!(report.categories, 1);
        let names: Vec<String> = store
            .list_categories()
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["New"]);
    }

    #[test]
    fn test_lookups() {
        let mut store = memory_store();
        let cat = store.create_category("A", CategoryGroup::Work, None).unwrap();
        let task = store.create_task("t", 2, &cat.id, Priority::High).unwrap();
        store.toggle_completed(&task.id).unwrap();

        assert_eq!(store.get_category(&cat.id).unwrap().name, "A");
        assert!(store.get_task(&task.id).unwrap().completed);
        assert_eq!(store.progress_for(&cat.id).unwrap().progress_percentage, 100.0);
        assert!(matches!(
            store.get_task("missing"),
            Err(StoreError::Op(OpError::NotFound { .. }))
        ));
    }

    #[test]
    fn test_clear_all_resets() {
        let mut store = memory_store();
        let cat = store.create_category("A", CategoryGroup::Work, None).unwrap();
        store.create_task("t", 1, &cat.id, Priority::Medium).unwrap();
        let doc = store.clear_all().unwrap();
        assert!(doc.categories.is_empty());
        assert!(doc.tasks.is_empty());
        assert!(store.list_tasks().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_document_reported() {
        let mut backend = MemoryBackend::new();
        backend.set(DOCUMENT_KEY, "{ not json").unwrap();
        let mut store = DataStore::new(backend);
        assert!(matches!(store.load(), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn test_dir_backend_persists_between_stores() {
        let tmp = TempDir::new().unwrap();
        let cat_id = {
            let mut store = DataStore::new(DirBackend::new(tmp.path()));
            store.create_category("Disk", CategoryGroup::Health, None).unwrap().id
        };
        let mut store = DataStore::new(DirBackend::new(tmp.path()));
        let cats = store.list_categories().unwrap();
        assert_eq!(cats[0].id, cat_id);
        assert!(tmp.path().join("progress_tracker_data.json").exists());
    }

    #[test]
    fn test_dir_backend_logs_displaced_document() {
        let tmp = TempDir::new().unwrap();
        let mut store = DataStore::new(DirBackend::new(tmp.path()));
        store.create_category("Keep me", CategoryGroup::Work, None).unwrap();
        store.clear_all().unwrap();

        let entries = recovery::read_recovery_entries(tmp.path(), None);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].category, RecoveryCategory::Clear);
        assert!(entries[0].body.contains("Keep me"));
    }

    #[test]
    fn test_import_file_errors() {
        let tmp = TempDir::new().unwrap();
        let mut store = memory_store();

        let missing = tmp.path().join("missing.json");
        assert!(matches!(
            store.import_file(&missing),
            Err(StoreError::Import(ImportError::Read { .. }))
        ));

        let garbage = tmp.path().join("garbage.json");
        fs::write(&garbage, "<html>").unwrap();
        assert!(matches!(
            store.import_file(&garbage),
            Err(StoreError::Import(ImportError::Malformed(_)))
        ));

        let empty = tmp.path().join("empty.json");
        fs::write(&empty, "{}").unwrap();
        assert!(matches!(
            store.import_file(&empty),
            Err(StoreError::Import(ImportError::Invalid(_)))
        ));
    }
}
