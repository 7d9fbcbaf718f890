use indexmap::IndexMap;

use super::OpError;
use super::category_ops::list_categories;
use crate::model::category::{Category, CategoryGroup};
use crate::model::document::Document;
use crate::model::progress::{CategoryProgress, GroupProgress, OverallProgress};

/// Round to 2 decimal places.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Weighted percentage; 0 when there is no weight at all.
pub fn weighted_percentage(completed_weight: u64, total_weight: u64) -> f64 {
    if total_weight == 0 {
        return 0.0;
    }
    round2(completed_weight as f64 / total_weight as f64 * 100.0)
}

fn progress_for(doc: &Document, category: &Category) -> CategoryProgress {
    let mut completed_weight = 0u64;
    let mut total_weight = 0u64;
    let mut task_count = 0;
    let mut completed_task_count = 0;

    for task in doc.tasks_in(&category.id) {
        total_weight += u64::from(task.weight);
        task_count += 1;
        if task.completed {
            completed_weight += u64::from(task.weight);
            completed_task_count += 1;
        }
    }

    CategoryProgress {
        category_id: category.id.clone(),
        category_name: category.name.clone(),
        category_group: category.group,
        progress_percentage: weighted_percentage(completed_weight, total_weight),
        completed_weight,
        total_weight,
        task_count,
        completed_task_count,
    }
}

/// Progress for every category, in category listing order.
pub fn compute_category_progress(doc: &Document) -> Vec<CategoryProgress> {
    list_categories(doc)
        .into_iter()
        .map(|c| progress_for(doc, c))
        .collect()
}

/// Progress for a single category.
pub fn category_progress(doc: &Document, category_id: &str) -> Result<CategoryProgress, OpError> {
    let category = doc
        .category(category_id)
        .ok_or_else(|| OpError::category_not_found(category_id))?;
    Ok(progress_for(doc, category))
}

/// Progress aggregated per group.
///
/// Every group is present, in display order, even when it has no
/// categories. The group percentage is weighted over the union of its
/// categories' tasks, not averaged across categories.
pub fn compute_grouped_progress(doc: &Document) -> IndexMap<CategoryGroup, GroupProgress> {
    let mut groups: IndexMap<CategoryGroup, GroupProgress> = CategoryGroup::ALL
        .iter()
        .map(|&group| {
            (
                group,
                GroupProgress {
                    group,
                    name: group.display_name().to_string(),
                    categories: Vec::new(),
                    completed_weight: 0,
                    total_weight: 0,
                    total_progress: 0.0,
                },
            )
        })
        .collect();

    for progress in compute_category_progress(doc) {
        if let Some(entry) = groups.get_mut(&progress.category_group) {
            entry.completed_weight += progress.completed_weight;
            entry.total_weight += progress.total_weight;
            entry.categories.push(progress);
        }
    }

    for entry in groups.values_mut() {
        entry.total_progress = weighted_percentage(entry.completed_weight, entry.total_weight);
    }
    groups
}

/// Weighted progress over every task in the document.
pub fn overall_progress(doc: &Document) -> OverallProgress {
    let total_weight: u64 = doc.tasks.iter().map(|t| u64::from(t.weight)).sum();
    let completed_weight: u64 = doc
        .tasks
        .iter()
        .filter(|t| t.completed)
        .map(|t| u64::from(t.weight))
        .sum();
    OverallProgress {
        category_count: doc.categories.len(),
        task_count: doc.tasks.len(),
        completed_task_count: doc.tasks.iter().filter(|t| t.completed).count(),
        completed_weight,
        total_weight,
        progress_percentage: weighted_percentage(completed_weight, total_weight),
    }
}
