use std::collections::HashSet;
use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use super::{MAX_ORDER, OpError, new_id_excluding};
use crate::model::category::{Category, CategoryGroup};
use crate::model::document::{Document, Settings};
use crate::model::task::{Priority, Task};

pub const PLACEHOLDER_CATEGORY_NAME: &str = "Unnamed Category";
pub const PLACEHOLDER_TASK_TITLE: &str = "Unnamed Task";

/// Error type for import operations
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("could not read import file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("import file is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error(transparent)]
    Invalid(#[from] OpError),
}

/// What an import had to repair on the way in
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub categories: usize,
    pub tasks: usize,
    /// Individual fields replaced by a default
    pub repaired_fields: usize,
    /// Records whose id was missing or already taken
    pub regenerated_ids: usize,
    /// Tasks dropped because their category was not part of the import
    pub dropped_orphans: usize,
    /// Array entries that were not objects
    pub skipped_entries: usize,
}

impl ImportReport {
    pub fn is_clean(&self) -> bool {
        self.repaired_fields == 0
            && self.regenerated_ids == 0
            && self.dropped_orphans == 0
            && self.skipped_entries == 0
    }
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// The full document, verbatim.
pub fn export_document(doc: &Document) -> Document {
    doc.clone()
}

/// Pretty-printed JSON of the full document.
pub fn export_json(doc: &Document) -> Result<String, serde_json::Error> {
    let mut json = serde_json::to_string_pretty(doc)?;
    json.push('\n');
    Ok(json)
}

/// Download filename embedding the given date.
pub fn export_filename(date: NaiveDate) -> String {
    format!("progress-tracker-backup-{}.json", date.format("%Y-%m-%d"))
}

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

/// Parse JSON text and rebuild a document from it.
pub fn import_json(text: &str) -> Result<(Document, ImportReport), ImportError> {
    let value: Value = serde_json::from_str(text)?;
    Ok(import_value(&value)?)
}

/// Rebuild a document from a candidate value, repairing what it can.
///
/// Only a missing `categories`, `tasks` or `settings` section is fatal.
/// Every other defect is backfilled with a default and counted in the
/// report. The returned document is meant to replace the current one
/// wholesale; nothing is merged.
pub fn import_value(candidate: &Value) -> Result<(Document, ImportReport), OpError> {
    let invalid = || OpError::Validation("invalid import structure".into());
    let root = candidate.as_object().ok_or_else(invalid)?;
    let raw_categories = root.get("categories").and_then(Value::as_array).ok_or_else(invalid)?;
    let raw_tasks = root.get("tasks").and_then(Value::as_array).ok_or_else(invalid)?;
    if !root.get("settings").is_some_and(truthy) {
        return Err(invalid());
    }

    let now = Utc::now();
    let mut report = ImportReport::default();
    let mut taken: HashSet<String> = HashSet::new();

    let mut categories = Vec::with_capacity(raw_categories.len());
    for raw in raw_categories {
        let Some(obj) = raw.as_object() else {
            report.skipped_entries += 1;
            continue;
        };
        categories.push(backfill_category(obj, now, &mut taken, &mut report));
    }

    let category_ids: HashSet<&str> = categories.iter().map(|c| c.id.as_str()).collect();
    let mut tasks = Vec::with_capacity(raw_tasks.len());
    for raw in raw_tasks {
        let Some(obj) = raw.as_object() else {
            report.skipped_entries += 1;
            continue;
        };
        let category_id = id_field(obj, "category_id");
        match category_id {
            Some(ref id) if category_ids.contains(id.as_str()) => {}
            _ => {
                report.dropped_orphans += 1;
                continue;
            }
        }
        let mut task = backfill_task(obj, now, &mut taken, &mut report);
        task.category_id = category_id.unwrap_or_default();
        tasks.push(task);
    }

    report.categories = categories.len();
    report.tasks = tasks.len();
    let doc = Document {
        categories,
        tasks,
        settings: Settings {
            version: crate::model::document::SCHEMA_VERSION.to_string(),
            last_updated: now,
        },
    };
    Ok((doc, report))
}

fn backfill_category(
    obj: &Map<String, Value>,
    now: DateTime<Utc>,
    taken: &mut HashSet<String>,
    report: &mut ImportReport,
) -> Category {
    let group = match obj.get("group").and_then(Value::as_str) {
        Some(g) => CategoryGroup::parse_group(g).unwrap_or_else(|| {
            report.repaired_fields += 1;
            CategoryGroup::default()
        }),
        None => {
            report.repaired_fields += 1;
            CategoryGroup::default()
        }
    };
    Category {
        id: claim_id(obj, taken, report),
        name: text_field(obj, "name", PLACEHOLDER_CATEGORY_NAME, report),
        group,
        color: obj
            .get("color")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string),
        order: order_field(obj, report),
        created_at: timestamp_field(obj, now, report),
    }
}

fn backfill_task(
    obj: &Map<String, Value>,
    now: DateTime<Utc>,
    taken: &mut HashSet<String>,
    report: &mut ImportReport,
) -> Task {
    let weight = match obj.get("weight").and_then(positive_integer) {
        Some(w) => w,
        None => {
            report.repaired_fields += 1;
            1
        }
    };
    let priority = match obj.get("priority").and_then(Value::as_str) {
        Some(p) => Priority::parse_priority(p).unwrap_or_else(|| {
            report.repaired_fields += 1;
            Priority::default()
        }),
        None => {
            report.repaired_fields += 1;
            Priority::default()
        }
    };
    Task {
        id: claim_id(obj, taken, report),
        title: text_field(obj, "title", PLACEHOLDER_TASK_TITLE, report),
        weight,
        category_id: String::new(),
        priority,
        completed: obj.get("completed").is_some_and(truthy),
        pinned: obj.get("pinned").is_some_and(truthy),
        order: order_field(obj, report),
        created_at: timestamp_field(obj, now, report),
    }
}

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

/// Loose boolean coercion: null, false, 0, NaN and "" are false.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// A string or numeric id, as text.
fn id_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Keep the record's id if it is present and unused, otherwise mint one.
fn claim_id(
    obj: &Map<String, Value>,
    taken: &mut HashSet<String>,
    report: &mut ImportReport,
) -> String {
    if let Some(id) = id_field(obj, "id")
        && taken.insert(id.clone())
    {
        return id;
    }
    report.regenerated_ids += 1;
    new_id_excluding(taken)
}

fn text_field(
    obj: &Map<String, Value>,
    key: &str,
    placeholder: &str,
    report: &mut ImportReport,
) -> String {
    match obj.get(key).and_then(Value::as_str).map(str::trim) {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => {
            report.repaired_fields += 1;
            placeholder.to_string()
        }
    }
}

fn order_field(obj: &Map<String, Value>, report: &mut ImportReport) -> i64 {
    let value = obj.get("order");
    let order = match value.and_then(Value::as_i64) {
        Some(order) => order,
        None => match value.and_then(Value::as_f64) {
            Some(f) if f.is_finite() => f.trunc() as i64,
            _ => {
                report.repaired_fields += 1;
                return 0;
            }
        },
    };
    let clamped = order.clamp(-MAX_ORDER, MAX_ORDER);
    if clamped != order {
        report.repaired_fields += 1;
    }
    clamped
}

fn positive_integer(value: &Value) -> Option<u32> {
    if let Some(n) = value.as_u64() {
        return u32::try_from(n).ok().filter(|w| *w >= 1);
    }
    let f = value.as_f64()?;
    if f >= 1.0 && f.fract() == 0.0 && f <= f64::from(u32::MAX) {
        return Some(f as u32);
    }
    None
}

/// RFC 3339, or a naive ISO timestamp read as UTC.
fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn timestamp_field(
    obj: &Map<String, Value>,
    now: DateTime<Utc>,
    report: &mut ImportReport,
) -> DateTime<Utc> {
    match obj
        .get("created_at")
        .and_then(Value::as_str)
        .and_then(parse_timestamp)
    {
        Some(ts) => ts,
        None => {
            report.repaired_fields += 1;
            now
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
