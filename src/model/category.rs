use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Coarse bucket a category belongs to, used for aggregate progress
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryGroup {
    #[default]
    Work,
    Personal,
    Health,
}

impl CategoryGroup {
    /// All groups in display order
    pub const ALL: [CategoryGroup; 3] = [
        CategoryGroup::Work,
        CategoryGroup::Personal,
        CategoryGroup::Health,
    ];

    /// The lowercase key used in the persisted document
    pub fn key(self) -> &'static str {
        match self {
            CategoryGroup::Work => "work",
            CategoryGroup::Personal => "personal",
            CategoryGroup::Health => "health",
        }
    }

    /// Human-readable group name
    pub fn display_name(self) -> &'static str {
        match self {
            CategoryGroup::Work => "Work",
            CategoryGroup::Personal => "Personal",
            CategoryGroup::Health => "Health",
        }
    }

    /// Parse a group key (case-insensitive)
    pub fn parse_group(s: &str) -> Option<CategoryGroup> {
        match s.trim().to_ascii_lowercase().as_str() {
            "work" => Some(CategoryGroup::Work),
            "personal" => Some(CategoryGroup::Personal),
            "health" => Some(CategoryGroup::Health),
            _ => None,
        }
    }
}

impl std::fmt::Display for CategoryGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// A named bucket owning a set of tasks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Opaque unique id, assigned on creation
    pub id: String,
    /// Display name, never empty
    pub name: String,
    pub group: CategoryGroup,
    /// Optional display hint such as `#3B82F6`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Rank among all categories; not required to be dense or unique
    pub order: i64,
    pub created_at: DateTime<Utc>,
}

/// Partial update for a category. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub group: Option<CategoryGroup>,
    /// `Some(None)` clears the color
    pub color: Option<Option<String>>,
    pub order: Option<i64>,
}

impl CategoryPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.group.is_none() && self.color.is_none() && self.order.is_none()
    }

    /// Merge the supplied fields over `category`
    pub fn apply(self, category: &mut Category) {
        if let Some(name) = self.name {
            category.name = name;
        }
        if let Some(group) = self.group {
            category.group = group;
        }
        if let Some(color) = self.color {
            category.color = color;
        }
        if let Some(order) = self.order {
            category.order = order;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_serializes_lowercase() {
        let json = serde_json::to_string(&CategoryGroup::Personal).unwrap();
        assert_eq!(json, "\"personal\"");
        let g: CategoryGroup = serde_json::from_str("\"health\"").unwrap();
        assert_eq!(g, CategoryGroup::Health);
    }

    #[test]
    fn test_parse_group_is_case_insensitive() {
        assert_eq!(CategoryGroup::parse_group(" Work "), Some(CategoryGroup::Work));
        assert_eq!(CategoryGroup::parse_group("HEALTH"), Some(CategoryGroup::Health));
        assert_eq!(CategoryGroup::parse_group("default"), None);
    }

    #[test]
    fn test_color_omitted_when_absent() {
        let cat = Category {
            id: "c1".into(),
            name: "Reading".into(),
            group: CategoryGroup::Personal,
            color: None,
            order: 0,
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(&cat).unwrap();
        assert!(value.get("color").is_none());
        assert_eq!(value["group"], "personal");
    }

    #[test]
    fn test_patch_applies_only_supplied_fields() {
        let created = Utc::now();
        let mut cat = Category {
            id: "c1".into(),
            name: "Reading".into(),
            group: CategoryGroup::Personal,
            color: Some("#ffffff".into()),
            order: 3,
            created_at: created,
        };
        CategoryPatch {
            name: Some("Books".into()),
            color: Some(None),
            ..Default::default()
        }
        .apply(&mut cat);
        assert_eq!(cat.name, "Books");
        assert_eq!(cat.group, CategoryGroup::Personal);
        assert_eq!(cat.color, None);
        assert_eq!(cat.order, 3);
        assert_eq!(cat.id, "c1");
        assert_eq!(cat.created_at, created);
    }
}
