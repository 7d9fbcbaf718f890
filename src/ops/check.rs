use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::model::document::{Document, SCHEMA_VERSION};

/// Structured result from `pt check`, suitable for --json output.
#[derive(Debug, Default, Serialize)]
pub struct CheckResult {
    pub valid: bool,
    pub errors: Vec<CheckError>,
    pub warnings: Vec<CheckWarning>,
}

/// A broken invariant (something that should be fixed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum CheckError {
    /// The same id is used by more than one record
    #[serde(rename = "duplicate_id")]
    DuplicateId { id: String, count: usize },
    /// A task references a category that doesn't exist
    #[serde(rename = "orphaned_task")]
    OrphanedTask { task_id: String, category_id: String },
    /// A task weight below 1
    #[serde(rename = "zero_weight")]
    ZeroWeight { task_id: String },
    /// A blank category name or task title
    #[serde(rename = "empty_text")]
    EmptyText { id: String, field: String },
}

/// A non-critical issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum CheckWarning {
    /// Two categories share a rank
    #[serde(rename = "category_order_tie")]
    CategoryOrderTie { order: i64, category_ids: Vec<String> },
    /// The settings block carries a different schema version
    #[serde(rename = "schema_version")]
    SchemaVersion { found: String, expected: String },
}

// ---------------------------------------------------------------------------
// Main check entry point
// ---------------------------------------------------------------------------

/// Validate a document and return structured results.
///
/// This is a read-only operation. It exists for data files that were edited
/// by hand; documents produced by the store operations always pass.
pub fn check_document(doc: &Document) -> CheckResult {
    let mut result = CheckResult::default();

    let mut id_counts: HashMap<&str, usize> = HashMap::new();
    let ids = doc
        .categories
        .iter()
        .map(|c| c.id.as_str())
        .chain(doc.tasks.iter().map(|t| t.id.as_str()));
    for id in ids {
        *id_counts.entry(id).or_default() += 1;
    }
    let mut duplicates: Vec<(&str, usize)> = id_counts.into_iter().filter(|(_, n)| *n > 1).collect();
    duplicates.sort();
    for (id, count) in duplicates {
        result.errors.push(CheckError::DuplicateId {
            id: id.to_string(),
            count,
        });
    }

    for category in &doc.categories {
        if category.name.trim().is_empty() {
            result.errors.push(CheckError::EmptyText {
                id: category.id.clone(),
                field: "name".into(),
            });
        }
    }

    let category_ids: HashSet<&str> = doc.categories.iter().map(|c| c.id.as_str()).collect();
    for task in &doc.tasks {
        if !category_ids.contains(task.category_id.as_str()) {
            result.errors.push(CheckError::OrphanedTask {
                task_id: task.id.clone(),
                category_id: task.category_id.clone(),
            });
        }
        if task.weight == 0 {
            result.errors.push(CheckError::ZeroWeight {
                task_id: task.id.clone(),
            });
        }
        if task.title.trim().is_empty() {
            result.errors.push(CheckError::EmptyText {
                id: task.id.clone(),
                field: "title".into(),
            });
        }
    }

    check_order_ties(doc, &mut result);

    if doc.settings.version != SCHEMA_VERSION {
        result.warnings.push(CheckWarning::SchemaVersion {
            found: doc.settings.version.clone(),
            expected: SCHEMA_VERSION.to_string(),
        });
    }

    result.valid = result.errors.is_empty();
    result
}

fn check_order_ties(doc: &Document, result: &mut CheckResult) {
    let mut by_order: Vec<(i64, Vec<String>)> = Vec::new();
    for category in &doc.categories {
        match by_order.iter_mut().find(|(o, _)| *o == category.order) {
            Some((_, ids)) => ids.push(category.id.clone()),
            None => by_order.push((category.order, vec![category.id.clone()])),
        }
    }
    by_order.sort_by_key(|(o, _)| *o);
    for (order, category_ids) in by_order {
        if category_ids.len() > 1 {
            result
                .warnings
                .push(CheckWarning::CategoryOrderTie { order, category_ids });
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::category::CategoryGroup;
    use crate::model::task::Priority;
    use crate::ops::category_ops::{create_category, reorder_categories};
    use crate::ops::task_ops::create_task;

    #[test]
    fn test_clean_document_is_valid() {
        let mut doc = Document::empty();
        let cat = create_category(&mut doc, "A", CategoryGroup::Work, None).unwrap();
        create_task(&mut doc, "t", 2, &cat.id, Priority::Medium).unwrap();
        let result = check_document(&doc);
        assert!(result.valid);
        assert!(result.errors.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_detects_hand_edited_defects() {
        let mut doc = Document::empty();
        let cat = create_category(&mut doc, "A", CategoryGroup::Work, None).unwrap();
        let task = create_task(&mut doc, "t", 2, &cat.id, Priority::Medium).unwrap();
        let mut orphan = task.clone();
        orphan.category_id = "ghost".into();
        orphan.weight = 0;
        orphan.title = " ".into();
        doc.tasks.push(orphan);

        let result = check_document(&doc);
        assert!(!result.valid);
        assert!(result.errors.contains(&CheckError::DuplicateId {
            id: task.id.clone(),
            count: 2
        }));
        assert!(result.errors.contains(&CheckError::OrphanedTask {
            task_id: task.id.clone(),
            category_id: "ghost".into()
        }));
        assert!(result.errors.contains(&CheckError::ZeroWeight {
            task_id: task.id.clone()
        }));
        assert!(result.errors.contains(&CheckError::EmptyText {
            id: task.id.clone(),
            field: "title".into()
        }));
    }

    #[test]
    fn test_warns_on_order_ties_and_version() {
        let mut doc = Document::empty();
        let a = create_category(&mut doc, "A", CategoryGroup::Work, None).unwrap();
        let b = create_category(&mut doc, "B", CategoryGroup::Work, None).unwrap();
        reorder_categories(&mut doc, &[b.id.clone()]);
        doc.settings.version = "2.0".into();

        let result = check_document(&doc);
        assert!(result.valid);
        assert_eq!(
            result.warnings[0],
            CheckWarning::CategoryOrderTie {
                order: 0,
                category_ids: vec![a.id, b.id]
            }
        );
        assert!(matches!(
            result.warnings[1],
            CheckWarning::SchemaVersion { .. }
        ));
    }

    #[test]
    fn test_json_shape() {
        let err = CheckError::ZeroWeight {
            task_id: "t1".into(),
        };
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["type"], "zero_weight");
        assert_eq!(value["task_id"], "t1");
    }
}
