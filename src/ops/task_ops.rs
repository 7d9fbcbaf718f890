use chrono::Utc;

use super::{OpError, new_id, next_order, require_text};
use crate::model::document::Document;
use crate::model::task::{Priority, Task, TaskPatch};

// ---------------------------------------------------------------------------
// CRUD
// ---------------------------------------------------------------------------

/// Create a task at the end of its category.
///
/// A weight of 0 is treated as missing and defaults to 1. The category must
/// already exist.
pub fn create_task(
    doc: &mut Document,
    title: &str,
    weight: u32,
    category_id: &str,
    priority: Priority,
) -> Result<Task, OpError> {
    let title = require_text(title, "task title")?;
    if doc.category(category_id).is_none() {
        return Err(OpError::Validation(format!(
            "category does not exist: {}",
            category_id
        )));
    }

    let task = Task {
        id: new_id(doc),
        title,
        weight: weight.max(1),
        category_id: category_id.to_string(),
        priority,
        completed: false,
        pinned: false,
        order: next_order(doc.tasks_in(category_id).map(|t| t.order)),
        created_at: Utc::now(),
    };
    doc.tasks.push(task.clone());
    Ok(task)
}

/// Merge `patch` into the task with the given id.
///
/// Moving a task to another category without an explicit `order` places it
/// after that category's last task.
pub fn update_task(doc: &mut Document, id: &str, mut patch: TaskPatch) -> Result<Task, OpError> {
    let current = doc.task(id).ok_or_else(|| OpError::task_not_found(id))?;
    let current_category = current.category_id.clone();

    if let Some(title) = patch.title.take() {
        patch.title = Some(require_text(&title, "task title")?);
    }
    if patch.weight == Some(0) {
        return Err(OpError::Validation("task weight must be at least 1".into()));
    }
    if let Some(ref category_id) = patch.category_id {
        if doc.category(category_id).is_none() {
            return Err(OpError::Validation(format!(
                "category does not exist: {}",
                category_id
            )));
        }
        if *category_id != current_category && patch.order.is_none() {
            patch.order = Some(next_order(doc.tasks_in(category_id).map(|t| t.order)));
        }
    }

    let task = doc.task_mut(id).ok_or_else(|| OpError::task_not_found(id))?;
    patch.apply(task);
    Ok(task.clone())
}

/// Remove a task. Returns false when no such task existed.
pub fn delete_task(doc: &mut Document, id: &str) -> bool {
    let before = doc.tasks.len();
    doc.tasks.retain(|t| t.id != id);
    doc.tasks.len() != before
}

/// Flip the completed flag.
pub fn toggle_completed(doc: &mut Document, id: &str) -> Result<Task, OpError> {
    let task = doc.task_mut(id).ok_or_else(|| OpError::task_not_found(id))?;
    task.completed = !task.completed;
    Ok(task.clone())
}

/// Flip the pinned flag.
pub fn toggle_pinned(doc: &mut Document, id: &str) -> Result<Task, OpError> {
    let task = doc.task_mut(id).ok_or_else(|| OpError::task_not_found(id))?;
    task.pinned = !task.pinned;
    Ok(task.clone())
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

/// Assign `order = position` to each listed task of `category_id`.
///
/// Ids that are unknown or belong to another category are ignored; tasks
/// missing from the list keep their old rank. Returns the number updated.
pub fn reorder_tasks(doc: &mut Document, category_id: &str, ordered_ids: &[String]) -> usize {
    let mut updated = 0;
    for (index, id) in ordered_ids.iter().enumerate() {
        if let Some(task) = doc
            .tasks
            .iter_mut()
            .find(|t| t.id == *id && t.category_id == category_id)
        {
            task.order = index as i64;
            updated += 1;
        }
    }
    updated
}

/// Sort key for listings: pinned first, then manual order, then priority.
fn list_key(task: &Task) -> (bool, i64, u8) {
    (!task.pinned, task.order, task.priority.rank())
}

/// All tasks, pinned first, then by ascending `order`, then by priority.
pub fn list_tasks(doc: &Document) -> Vec<&Task> {
    let mut tasks: Vec<&Task> = doc.tasks.iter().collect();
    tasks.sort_by_key(|t| list_key(t));
    tasks
}

/// Tasks of one category, in listing order.
pub fn list_tasks_in_category<'a>(doc: &'a Document, category_id: &str) -> Vec<&'a Task> {
    let mut tasks: Vec<&Task> = doc.tasks_in(category_id).collect();
    tasks.sort_by_key(|t| list_key(t));
    tasks
}

/// Look up a task by id.
pub fn find_task<'a>(doc: &'a Document, id: &str) -> Result<&'a Task, OpError> {
    doc.task(id).ok_or_else(|| OpError::task_not_found(id))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::category::CategoryGroup;
    use crate::ops::category_ops::create_category;

    fn doc_with_categories(n: usize) -> (Document, Vec<String>) {
        let mut doc = Document::empty();
        let ids = (0..n)
            .map(|i| {
                create_category(&mut doc, &format!("Cat {}", i), CategoryGroup::Work, None)
                    .unwrap()
                    .id
            })
            .collect();
        (doc, ids)
    }

    fn titles(tasks: &[&Task]) -> Vec<String> {
        tasks.iter().map(|t| t.title.clone()).collect()
    }

    #[test]
    fn test_create_task_defaults() {
        let (mut doc, cats) = doc_with_categories(1);
        let task = create_task(&mut doc, "Write", 3, &cats[0], Priority::High).unwrap();
        assert_eq!(task.weight, 3);
        assert_eq!(task.priority, Priority::High);
        assert!(!task.completed);
        assert!(!task.pinned);
        assert_eq!(task.order, 0);
        assert!(doc.task(&task.id).is_some());
    }

    #[test]
    fn test_create_zero_weight_defaults_to_one() {
        let (mut doc, cats) = doc_with_categories(1);
        let task = create_task(&mut doc, "Write", 0, &cats[0], Priority::Medium).unwrap();
        assert_eq!(task.weight, 1);
    }

    #[test]
    fn test_order_is_scoped_per_category() {
        let (mut doc, cats) = doc_with_categories(2);
        create_task(&mut doc, "a1", 1, &cats[0], Priority::Medium).unwrap();
        create_task(&mut doc, "a2", 1, &cats[0], Priority::Medium).unwrap();
        let b1 = create_task(&mut doc, "b1", 1, &cats[1], Priority::Medium).unwrap();
        let a3 = create_task(&mut doc, "a3", 1, &cats[0], Priority::Medium).unwrap();
        assert_eq!(b1.order, 0);
        assert_eq!(a3.order, 2);
    }

    #[test]
    fn test_create_rejects_empty_title() {
        let (mut doc, cats) = doc_with_categories(1);
        let err = create_task(&mut doc, "  ", 1, &cats[0], Priority::Medium).unwrap_err();
        assert!(matches!(err, OpError::Validation(_)));
        assert!(doc.tasks.is_empty());
    }

    #[test]
    fn test_create_rejects_unknown_category() {
        let (mut doc, _) = doc_with_categories(1);
        let err = create_task(&mut doc, "Orphan", 1, "ghost", Priority::Medium).unwrap_err();
        assert!(matches!(err, OpError::Validation(_)));
        assert!(doc.tasks.is_empty());
    }

    #[test]
    fn test_update_task_merges() {
        let (mut doc, cats) = doc_with_categories(1);
        let task = create_task(&mut doc, "Write", 1, &cats[0], Priority::Medium).unwrap();
        let updated = update_task(
            &mut doc,
            &task.id,
            TaskPatch {
                completed: Some(true),
                priority: Some(Priority::Low),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(updated.completed);
        assert_eq!(updated.priority, Priority::Low);
        assert_eq!(updated.title, "Write");
        assert_eq!(updated.created_at, task.created_at);
    }

    #[test]
    fn test_update_missing_task() {
        let (mut doc, _) = doc_with_categories(1);
        let err = update_task(&mut doc, "nope", TaskPatch::default()).unwrap_err();
        assert_eq!(err, OpError::task_not_found("nope"));
    }

    #[test]
    fn test_update_rejects_zero_weight() {
        let (mut doc, cats) = doc_with_categories(1);
        let task = create_task(&mut doc, "Write", 2, &cats[0], Priority::Medium).unwrap();
        let err = update_task(
            &mut doc,
            &task.id,
            TaskPatch {
                weight: Some(0),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, OpError::Validation(_)));
        assert_eq!(doc.task(&task.id).unwrap().weight, 2);
    }

    #[test]
    fn test_move_to_other_category_appends() {
        let (mut doc, cats) = doc_with_categories(2);
        create_task(&mut doc, "b1", 1, &cats[1], Priority::Medium).unwrap();
        create_task(&mut doc, "b2", 1, &cats[1], Priority::Medium).unwrap();
        let a1 = create_task(&mut doc, "a1", 1, &cats[0], Priority::Medium).unwrap();

        let moved = update_task(
            &mut doc,
            &a1.id,
            TaskPatch {
                category_id: Some(cats[1].clone()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(moved.category_id, cats[1]);
        assert_eq!(moved.order, 2);
    }

    #[test]
    fn test_move_to_unknown_category_rejected() {
        let (mut doc, cats) = doc_with_categories(1);
        let a1 = create_task(&mut doc, "a1", 1, &cats[0], Priority::Medium).unwrap();
        let err = update_task(
            &mut doc,
            &a1.id,
            TaskPatch {
                category_id: Some("ghost".into()),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, OpError::Validation(_)));
        assert_eq!(doc.task(&a1.id).unwrap().category_id, cats[0]);
    }

    #[test]
    fn test_delete_task() {
        let (mut doc, cats) = doc_with_categories(1);
        let task = create_task(&mut doc, "Write", 1, &cats[0], Priority::Medium).unwrap();
        assert!(delete_task(&mut doc, &task.id));
        assert!(!delete_task(&mut doc, &task.id));
        assert!(doc.tasks.is_empty());
        assert_eq!(doc.categories.len(), 1);
    }

    #[test]
    fn test_toggles() {
        let (mut doc, cats) = doc_with_categories(1);
        let task = create_task(&mut doc, "Write", 1, &cats[0], Priority::Medium).unwrap();
        assert!(toggle_completed(&mut doc, &task.id).unwrap().completed);
        assert!(!toggle_completed(&mut doc, &task.id).unwrap().completed);
        assert!(toggle_pinned(&mut doc, &task.id).unwrap().pinned);
        assert!(toggle_pinned(&mut doc, "nope").is_err());
    }

    #[test]
    fn test_list_pinned_floats_above_order() {
        let (mut doc, cats) = doc_with_categories(1);
        let a = create_task(&mut doc, "A", 1, &cats[0], Priority::High).unwrap();
        let b = create_task(&mut doc, "B", 1, &cats[0], Priority::Low).unwrap();
        let c = create_task(&mut doc, "C", 1, &cats[0], Priority::Medium).unwrap();
        assert_eq!((a.order, b.order, c.order), (0, 1, 2));
        toggle_pinned(&mut doc, &b.id).unwrap();

        assert_eq!(titles(&list_tasks(&doc)), vec!["B", "A", "C"]);
    }

    #[test]
    fn test_list_priority_breaks_order_ties() {
        let (mut doc, cats) = doc_with_categories(2);
        create_task(&mut doc, "low", 1, &cats[0], Priority::Low).unwrap();
        create_task(&mut doc, "high", 1, &cats[1], Priority::High).unwrap();
        // Both have order 0 in their own category
        assert_eq!(titles(&list_tasks(&doc)), vec!["high", "low"]);
    }

    #[test]
    fn test_list_in_category_filters() {
        let (mut doc, cats) = doc_with_categories(2);
        create_task(&mut doc, "a1", 1, &cats[0], Priority::Medium).unwrap();
        create_task(&mut doc, "b1", 1, &cats[1], Priority::Medium).unwrap();
        assert_eq!(titles(&list_tasks_in_category(&doc, &cats[1])), vec!["b1"]);
    }

    #[test]
    fn test_list_in_category_outlives_id() {
        let (mut doc, cats) = doc_with_categories(1);
        create_task(&mut doc, "a1", 1, &cats[0], Priority::Medium).unwrap();
        let listed = {
            let id = cats[0].clone();
            list_tasks_in_category(&doc, &id)
        };
        assert_eq!(titles(&listed), vec!["a1"]);
    }

    #[test]
    fn test_reorder_tasks_scoped_to_category() {
        let (mut doc, cats) = doc_with_categories(2);
        let a1 = create_task(&mut doc, "a1", 1, &cats[0], Priority::Medium).unwrap();
        let a2 = create_task(&mut doc, "a2", 1, &cats[0], Priority::Medium).unwrap();
        let b1 = create_task(&mut doc, "b1", 1, &cats[1], Priority::Medium).unwrap();

        let ids = vec![b1.id.clone(), a2.id.clone(), a1.id.clone()];
        assert_eq!(reorder_tasks(&mut doc, &cats[0], &ids), 2);
        assert_eq!(doc.task(&a2.id).unwrap().order, 1);
        assert_eq!(doc.task(&a1.id).unwrap().order, 2);
        // b1 belongs to another category and keeps its rank
        assert_eq!(doc.task(&b1.id).unwrap().order, 0);
    }
}
