use std::fs;
use std::path::Path;

use crate::cli::commands::InitArgs;
use crate::io::config_io::{self, CONFIG_FILE};
use crate::io::store::{DataStore, DirBackend};
use crate::io::store_io::{self, STORE_DIR};

const CONFIG_TOML_TEMPLATE: &str = r##"[tracker]
name = ""

# --- Appearance ---
# One of: dark, cyber, ocean, forest, sunset, purple, matrix, gold, ice, volcano
# Change with: pt theme <name>
[ui]
theme = "dark"

# --- Diagnostics ---
# off, error, warn, info, debug, or trace. RUST_LOG overrides this.
[log]
level = "warn"

# --- Defaults ---
# Used by `pt category add` and `pt add` when a flag is omitted.
[defaults]
group = "work"        # work, personal, or health
priority = "medium"   # high, medium, or low
weight = 1
"##;

/// Infer a tracker name from a directory name: replace hyphens with spaces, title-case.
fn infer_name(dir_name: &str) -> String {
    dir_name
        .split(['-', '_'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(c) => {
                    let upper: String = c.to_uppercase().collect();
                    upper + chars.as_str()
                }
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render config.toml with the tracker name filled in.
fn render_config_toml(name: &str) -> Result<String, config_io::ConfigError> {
    let mut doc: toml_edit::DocumentMut = CONFIG_TOML_TEMPLATE.parse()?;
    doc["tracker"]["name"] = toml_edit::value(name);
    Ok(doc.to_string())
}

pub fn cmd_init(args: InitArgs, dir: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let cwd = match dir {
        Some(dir) => fs::canonicalize(dir)
            .map_err(|e| format!("cannot resolve -C path '{}': {}", dir.display(), e))?,
        None => std::env::current_dir()?,
    };
    let tracker_dir = store_io::store_dir(&cwd);

    if tracker_dir.join(CONFIG_FILE).exists() && !args.force {
        return Err(format!("tracker already exists in ./{}/ (use --force to rewrite its config)", STORE_DIR).into());
    }

    if let Some(parent) = cwd.parent()
        && let Ok(parent_root) = store_io::discover_store(parent)
    {
        eprintln!("Note: parent tracker found at {}/", store_io::store_dir(&parent_root).display());
        eprintln!("Creating new tracker in ./{}/", STORE_DIR);
    }

    let name = args.name.unwrap_or_else(|| {
        cwd.file_name()
            .and_then(|n| n.to_str())
            .map(infer_name)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "Untitled".to_string())
    });

    fs::create_dir_all(&tracker_dir)?;
    fs::write(tracker_dir.join(CONFIG_FILE), render_config_toml(&name)?)?;

    let mut store = DataStore::new(DirBackend::new(&tracker_dir));
    store.init()?;

    println!("Initialized tracker: {}", name);
    Ok(())
}
