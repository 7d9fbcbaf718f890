use serde::Serialize;

use super::category::CategoryGroup;

/// Weighted completion for one category. Derived, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryProgress {
    pub category_id: String,
    pub category_name: String,
    pub category_group: CategoryGroup,
    /// completed_weight / total_weight * 100, rounded to 2 decimals; 0 with no weight
    pub progress_percentage: f64,
    pub completed_weight: u64,
    pub total_weight: u64,
    pub task_count: usize,
    pub completed_task_count: usize,
}

/// Weighted completion for every category sharing a group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupProgress {
    pub group: CategoryGroup,
    pub name: String,
    pub categories: Vec<CategoryProgress>,
    pub completed_weight: u64,
    pub total_weight: u64,
    pub total_progress: f64,
}

/// Weighted completion across the whole document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverallProgress {
    pub category_count: usize,
    pub task_count: usize,
    pub completed_task_count: usize,
    pub completed_weight: u64,
    pub total_weight: u64,
    pub progress_percentage: f64,
}
