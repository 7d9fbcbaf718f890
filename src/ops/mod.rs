pub mod category_ops;
pub mod check;
pub mod import;
pub mod progress;
pub mod search;
pub mod task_ops;

use std::collections::HashSet;

use crate::model::document::Document;

/// Which kind of record an operation referred to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Category,
    Task,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKind::Category => write!(f, "category"),
            RecordKind::Task => write!(f, "task"),
        }
    }
}

/// Error type for record operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OpError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("{kind} not found: {id}")]
    NotFound { kind: RecordKind, id: String },
}

impl OpError {
    pub fn category_not_found(id: &str) -> Self {
        OpError::NotFound {
            kind: RecordKind::Category,
            id: id.to_string(),
        }
    }

    pub fn task_not_found(id: &str) -> Self {
        OpError::NotFound {
            kind: RecordKind::Task,
            id: id.to_string(),
        }
    }
}

/// Generate a record id that no category or task in `doc` uses yet
pub fn new_id(doc: &Document) -> String {
    loop {
        let id = uuid::Uuid::new_v4().to_string();
        if !doc.contains_id(&id) {
            return id;
        }
    }
}

/// Generate an id that is absent from `taken`, and reserve it
pub(crate) fn new_id_excluding(taken: &mut HashSet<String>) -> String {
    loop {
        let id = uuid::Uuid::new_v4().to_string();
        if taken.insert(id.clone()) {
            return id;
        }
    }
}

/// Largest magnitude of an imported `order`; larger values are clamped
pub const MAX_ORDER: i64 = (1 << 53) - 1;

/// Next rank after the highest existing one. Never below 0.
pub(crate) fn next_order(orders: impl Iterator<Item = i64>) -> i64 {
    orders.fold(-1, i64::max).saturating_add(1)
}

/// Trim a display string and reject it if nothing is left
pub(crate) fn require_text(value: &str, field: &str) -> Result<String, OpError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(OpError::Validation(format!("{} cannot be empty", field)));
    }
    Ok(trimmed.to_string())
}
