use std::path::{Path, PathBuf};

use crate::io::config_io::{self, CONFIG_FILE};
use crate::io::store::{DataStore, DirBackend, StoreError};
use crate::model::config::TrackerConfig;

/// Name of the store directory inside a tracker root
pub const STORE_DIR: &str = ".tracker";

/// An opened tracker: its location, config, and document store.
pub struct Tracker {
    /// Directory containing `.tracker/`
    pub root: PathBuf,
    /// The `.tracker/` directory itself
    pub store_dir: PathBuf,
    pub config: TrackerConfig,
    pub store: DataStore<DirBackend>,
}

/// Path of the store directory under `root`.
pub fn store_dir(root: &Path) -> PathBuf {
    root.join(STORE_DIR)
}

/// Walk up from `start` looking for a `.tracker/` directory with a config.
/// Returns the directory that contains it.
pub fn discover_store(start: &Path) -> Result<PathBuf, StoreError> {
    let mut current = start.to_path_buf();
    loop {
        let dir = store_dir(&current);
        if dir.is_dir() && dir.join(CONFIG_FILE).exists() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(StoreError::NotAStore);
        }
    }
}

/// Open the tracker rooted at `root`.
pub fn open_tracker(root: &Path) -> Result<Tracker, StoreError> {
    let dir = store_dir(root);
    if !dir.is_dir() {
        return Err(StoreError::NotAStore);
    }
    let (config, _) = config_io::read_config(&dir)?;
    Ok(Tracker {
        root: root.to_path_buf(),
        store: DataStore::new(DirBackend::new(&dir)),
        store_dir: dir,
        config,
    })
}
