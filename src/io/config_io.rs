use std::fs;
use std::path::{Path, PathBuf};

use crate::model::config::TrackerConfig;
use crate::model::theme::find_theme;

pub const CONFIG_FILE: &str = "config.toml";

/// Error type for config I/O
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
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
    #[error("could not parse config.toml: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("could not edit config.toml: {0}")]
    Edit(#[from] toml_edit::TomlError),
    #[error("unknown theme '{0}' (see `pt theme` for the list)")]
    UnknownTheme(String),
}

/// Read the config, returning both the parsed config and the raw toml_edit
/// document for edits that keep comments and layout intact.
pub fn read_config(dir: &Path) -> Result<(TrackerConfig, toml_edit::DocumentMut), ConfigError> {
    let path = dir.join(CONFIG_FILE);
    let text = fs::read_to_string(&path).map_err(|e| ConfigError::Read {
        path: path.clone(),
        source: e,
    })?;
    let config: TrackerConfig = toml::from_str(&text)?;
    let doc: toml_edit::DocumentMut = text.parse()?;
    Ok((config, doc))
}

/// Write the config document back to disk.
pub fn write_config(dir: &Path, doc: &toml_edit::DocumentMut) -> Result<(), ConfigError> {
    let path = dir.join(CONFIG_FILE);
    fs::write(&path, doc.to_string()).map_err(|e| ConfigError::Write { path, source: e })
}

/// Set `[ui] theme`, rejecting keys outside the theme catalog.
pub fn set_theme(doc: &mut toml_edit::DocumentMut, theme: &str) -> Result<(), ConfigError> {
    if find_theme(theme).is_none() {
        return Err(ConfigError::UnknownTheme(theme.to_string()));
    }
    if !doc.contains_key("ui") {
        doc["ui"] = toml_edit::Item::Table(toml_edit::Table::new());
    }
    doc["ui"]["theme"] = toml_edit::value(theme);
    Ok(())
}
