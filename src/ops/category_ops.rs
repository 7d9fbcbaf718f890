use chrono::Utc;

use super::{OpError, new_id, next_order, require_text};
use crate::model::category::{Category, CategoryGroup, CategoryPatch};
use crate::model::document::Document;

// ---------------------------------------------------------------------------
// CRUD
// ---------------------------------------------------------------------------

/// Create a category at the end of the ordering.
pub fn create_category(
    doc: &mut Document,
    name: &str,
    group: CategoryGroup,
    color: Option<&str>,
) -> Result<Category, OpError> {
    let name = require_text(name, "category name")?;
    let category = Category {
        id: new_id(doc),
        name,
        group,
        color: normalize_color(color),
        order: next_order(doc.categories.iter().map(|c| c.order)),
        created_at: Utc::now(),
    };
    doc.categories.push(category.clone());
    Ok(category)
}

/// Merge `patch` into the category with the given id.
pub fn update_category(
    doc: &mut Document,
    id: &str,
    mut patch: CategoryPatch,
) -> Result<Category, OpError> {
    if doc.category(id).is_none() {
        return Err(OpError::category_not_found(id));
    }
    if let Some(name) = patch.name.take() {
        patch.name = Some(require_text(&name, "category name")?);
    }
    if let Some(color) = patch.color.take() {
        patch.color = Some(normalize_color(color.as_deref()));
    }

    let category = doc
        .category_mut(id)
        .ok_or_else(|| OpError::category_not_found(id))?;
    patch.apply(category);
    Ok(category.clone())
}

/// Remove a category and every task it owns.
///
/// Returns the number of tasks removed, or `None` when no such category
/// existed (deleting an absent id is not an error).
pub fn delete_category(doc: &mut Document, id: &str) -> Option<usize> {
    let before = doc.categories.len();
    doc.categories.retain(|c| c.id != id);
    if doc.categories.len() == before {
        return None;
    }
    let tasks_before = doc.tasks.len();
    doc.tasks.retain(|t| t.category_id != id);
    Some(tasks_before - doc.tasks.len())
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

/// Assign `order = position` to each listed category.
///
/// Best effort: unknown ids are skipped and categories missing from the list
/// keep their old rank, which may now tie with a reassigned one. Returns the
/// number of categories updated.
pub fn reorder_categories(doc: &mut Document, ordered_ids: &[String]) -> usize {
    let mut updated = 0;
    for (index, id) in ordered_ids.iter().enumerate() {
        if let Some(category) = doc.category_mut(id) {
            category.order = index as i64;
            updated += 1;
        }
    }
    updated
}

/// Categories sorted by ascending `order`; ties keep insertion sequence.
pub fn list_categories(doc: &Document) -> Vec<&Category> {
    let mut categories: Vec<&Category> = doc.categories.iter().collect();
    categories.sort_by_key(|c| c.order);
    categories
}

/// Look up a category by id.
pub fn find_category<'a>(doc: &'a Document, id: &str) -> Result<&'a Category, OpError> {
    doc.category(id).ok_or_else(|| OpError::category_not_found(id))
}

fn normalize_color(color: Option<&str>) -> Option<String> {
    color
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
