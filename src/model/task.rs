use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Task priority, used as the last tiebreak when listing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    /// Sort rank: high < medium < low
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }

    /// Single-character marker for compact listings
    pub fn marker(self) -> char {
        match self {
            Priority::High => '!',
            Priority::Medium => ' ',
            Priority::Low => '.',
        }
    }

    /// Parse a priority key (case-insensitive)
    pub fn parse_priority(s: &str) -> Option<Priority> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Some(Priority::High),
            "medium" => Some(Priority::Medium),
            "low" => Some(Priority::Low),
            _ => None,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// A weighted, prioritized unit of work belonging to exactly one category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Opaque unique id, assigned on creation
    pub id: String,
    /// Display title, never empty
    pub title: String,
    /// Contribution toward the category's completion; always >= 1
    pub weight: u32,
    /// Owning category
    pub category_id: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub completed: bool,
    /// Pinned tasks list above everything else
    #[serde(default)]
    pub pinned: bool,
    /// Rank within the owning category
    pub order: i64,
    pub created_at: DateTime<Utc>,
}

/// Partial update for a task. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub weight: Option<u32>,
    pub category_id: Option<String>,
    pub priority: Option<Priority>,
    pub completed: Option<bool>,
    pub pinned: Option<bool>,
    pub order: Option<i64>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        *self == TaskPatch::default()
    }

    /// Merge the supplied fields over `task`
    pub fn apply(self, task: &mut Task) {
        if let Some(title) = self.title {
            task.title = title;
        }
        if let Some(weight) = self.weight {
            task.weight = weight;
        }
        if let Some(category_id) = self.category_id {
            task.category_id = category_id;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
        if let Some(pinned) = self.pinned {
            task.pinned = pinned;
        }
        if let Some(order) = self.order {
            task.order = order;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Task {
        Task {
            id: "t1".into(),
            title: "Write report".into(),
            weight: 2,
            category_id: "c1".into(),
            priority: Priority::Medium,
            completed: false,
            pinned: false,
            order: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_priority_rank_orders_high_first() {
        assert!(Priority::High.rank() < Priority::Medium.rank());
        assert!(Priority::Medium.rank() < Priority::Low.rank());
    }

    #[test]
    fn test_priority_defaults_to_medium() {
        assert_eq!(Priority::default(), Priority::Medium);
        assert_eq!(Priority::parse_priority("LOW"), Some(Priority::Low));
        assert_eq!(Priority::parse_priority("urgent"), None);
    }

    #[test]
    fn test_flags_default_when_missing() {
        let task: Task = serde_json::from_str(
            r#"{"id":"t1","title":"x","weight":1,"category_id":"c1","order":0,
                "created_at":"2025-05-01T10:00:00Z"}"#,
        )
        .unwrap();
        assert!(!task.completed);
        assert!(!task.pinned);
        assert_eq!(task.priority, Priority::Medium);
    }

    #[test]
    fn test_empty_patch_changes_nothing() {
        let mut task = sample();
        let before = task.clone();
        let patch = TaskPatch::default();
        assert!(patch.is_empty());
        patch.apply(&mut task);
        assert_eq!(task, before);
    }

    #[test]
    fn test_patch_merges_fields() {
        let mut task = sample();
        TaskPatch {
            completed: Some(true),
            pinned: Some(true),
            weight: Some(5),
            ..Default::default()
        }
        .apply(&mut task);
        assert!(task.completed);
        assert!(task.pinned);
        assert_eq!(task.weight, 5);
        assert_eq!(task.title, "Write report");
    }
}
