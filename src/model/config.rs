use serde::{Deserialize, Serialize};

use super::category::CategoryGroup;
use super::task::Priority;
use super::theme::DEFAULT_THEME;

/// Configuration from `.tracker/config.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    pub tracker: TrackerInfo,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerInfo {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Selected theme key; unknown values render with the default theme
    #[serde(default = "default_theme")]
    pub theme: String,
}

impl Default for UiConfig {
    fn default() -> Self {
        UiConfig {
            theme: default_theme(),
        }
    }
}

fn default_theme() -> String {
    DEFAULT_THEME.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// flexi_logger spec, e.g. `warn` or `tracker=debug`
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

/// Values used by the CLI when a flag is omitted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default)]
    pub group: CategoryGroup,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default = "default_weight")]
    pub weight: u32,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        DefaultsConfig {
            group: CategoryGroup::default(),
            priority: Priority::default(),
            weight: default_weight(),
        }
    }
}

fn default_weight() -> u32 {
    1
}
