use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::category::Category;
use super::task::Task;

/// Schema version stamped on every fresh or imported document
pub const SCHEMA_VERSION: &str = "3.0";

/// Document-level metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub version: String,
    pub last_updated: DateTime<Utc>,
}

impl Settings {
    pub fn fresh() -> Self {
        Settings {
            version: SCHEMA_VERSION.to_string(),
            last_updated: Utc::now(),
        }
    }
}

/// The single persisted value holding every category, task and the settings block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub categories: Vec<Category>,
    pub tasks: Vec<Task>,
    pub settings: Settings,
}

impl Document {
    /// An empty document with a fresh settings block
    pub fn empty() -> Self {
        Document {
            categories: Vec::new(),
            tasks: Vec::new(),
            settings: Settings::fresh(),
        }
    }

    /// Refresh `settings.last_updated`
    pub fn touch(&mut self) {
        self.settings.last_updated = Utc::now();
    }

    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn category_mut(&mut self, id: &str) -> Option<&mut Category> {
        self.categories.iter_mut().find(|c| c.id == id)
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn task_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    /// Tasks owned by `category_id`, in storage order
    pub fn tasks_in<'a, 'b>(
        &'a self,
        category_id: &'b str,
    ) -> impl Iterator<Item = &'a Task> + use<'a, 'b> {
        self.tasks.iter().filter(move |t| t.category_id == category_id)
    }

    /// True if `id` is used by any category or task
    pub fn contains_id(&self, id: &str) -> bool {
        self.categories.iter().any(|c| c.id == id) || self.tasks.iter().any(|t| t.id == id)
    }
}

impl Default for Document {
    fn default() -> Self {
        Document::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_carries_schema_version() {
        let doc = Document::empty();
        assert!(doc.categories.is_empty());
        assert!(doc.tasks.is_empty());
        assert_eq!(doc.settings.version, SCHEMA_VERSION);
    }

    #[test]
    fn test_serializes_three_top_level_sections() {
        let value = serde_json::to_value(Document::empty()).unwrap();
        let obj = value.as_object().unwrap();
        assert!(obj.contains_key("categories"));
        assert!(obj.contains_key("tasks"));
        assert!(obj.contains_key("settings"));
        assert!(value["settings"]["last_updated"].is_string());
    }

    #[test]
    fn test_touch_advances_timestamp() {
        let mut doc = Document::empty();
        doc.settings.last_updated = DateTime::<Utc>::MIN_UTC;
        doc.touch();
        assert!(doc.settings.last_updated > DateTime::<Utc>::MIN_UTC);
    }
}
