use std::io::IsTerminal;
use std::ops::Range;

use serde::Serialize;

use crate::io::recovery::RecoveryEntry;
use crate::model::category::Category;
use crate::model::task::Task;
use crate::model::theme::Theme;
use crate::ops::search::{MatchField, SearchHit};
use crate::util::unicode::{display_width, pad_to_width, truncate_to_width};

/// Width of the progress bar in cells
pub const BAR_WIDTH: usize = 20;
/// Widest name column before titles get truncated
pub const MAX_NAME_WIDTH: usize = 32;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct TaskWithCategoryJson {
    #[serde(flatten)]
    pub task: Task,
    pub category_name: String,
}

#[derive(Serialize)]
pub struct SearchHitJson {
    pub id: String,
    pub category_id: String,
    pub field: &'static str,
    pub text: String,
}

#[derive(Serialize)]
pub struct ThemeListJson {
    pub current: String,
    pub themes: Vec<ThemeEntryJson>,
}

#[derive(Serialize)]
pub struct ThemeEntryJson {
    pub key: &'static str,
    pub name: &'static str,
    pub accent: &'static str,
    pub selected: bool,
}

#[derive(Serialize)]
pub struct ExportSummaryJson {
    pub path: String,
    pub categories: usize,
    pub tasks: usize,
}

#[derive(Serialize)]
pub struct RecoveryEntryJson {
    pub timestamp: String,
    pub category: String,
    pub description: String,
    pub fields: Vec<(String, String)>,
    pub body: String,
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

pub fn field_name(field: MatchField) -> &'static str {
    match field {
        MatchField::CategoryName => "category_name",
        MatchField::TaskTitle => "task_title",
    }
}

pub fn search_hit_to_json(hit: &SearchHit) -> SearchHitJson {
    SearchHitJson {
        id: hit.id.clone(),
        category_id: hit.category_id.clone(),
        field: field_name(hit.field),
        text: hit.text.clone(),
    }
}

pub fn recovery_entry_to_json(entry: &RecoveryEntry) -> RecoveryEntryJson {
    RecoveryEntryJson {
        timestamp: entry.timestamp.to_rfc3339(),
        category: entry.category.to_string(),
        description: entry.description.clone(),
        fields: entry.fields.clone(),
        body: entry.body.clone(),
    }
}

// ---------------------------------------------------------------------------
// Text formatting
// ---------------------------------------------------------------------------

/// First 8 characters of an id, enough to address it by prefix.
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((i, _)) => &id[..i],
        None => id,
    }
}

/// Width of the name column for a set of names, capped at `MAX_NAME_WIDTH`.
pub fn name_column_width<'a>(names: impl IntoIterator<Item = &'a str>) -> usize {
    names
        .into_iter()
        .map(display_width)
        .max()
        .unwrap_or(0)
        .min(MAX_NAME_WIDTH)
}

pub fn format_category_line(category: &Category, name_width: usize) -> String {
    let color = category
        .color
        .as_deref()
        .map(|c| format!("  ({})", c))
        .unwrap_or_default();
    format!(
        "{}  {}  {}{}",
        short_id(&category.id),
        pad_to_width(&category.name, name_width),
        category.group.key(),
        color
    )
    .trim_end()
    .to_string()
}

/// Format a task as a compact line:
/// `[x] ^! 1a2b3c4d  Title (w3)` with `^` for pinned and `!`/`.` for priority.
pub fn format_task_line(task: &Task) -> String {
    let check = if task.completed { 'x' } else { ' ' };
    let pin = if task.pinned { '^' } else { ' ' };
    format!(
        "[{}] {}{} {}  {} (w{})",
        check,
        pin,
        task.priority.marker(),
        short_id(&task.id),
        truncate_to_width(&task.title, MAX_NAME_WIDTH * 2),
        task.weight
    )
}

/// Paint the matched byte ranges of `text`.
pub fn highlight_spans(text: &str, spans: &[Range<usize>], style: &Style) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pos = 0;
    for span in spans {
        if span.start < pos || span.end > text.len() {
            continue;
        }
        out.push_str(&text[pos..span.start]);
        out.push_str(&style.paint(&text[span.clone()]));
        pos = span.end;
    }
    out.push_str(&text[pos..]);
    out
}

/// `[scope] 1a2b3c4d  matched text`, with the matches painted.
pub fn format_search_hit(hit: &SearchHit, scope: &str, style: &Style) -> String {
    format!(
        "[{}] {}  {}",
        scope,
        short_id(&hit.id),
        highlight_spans(&hit.text, &hit.spans, style)
    )
}

/// A bar of `width` cells, filled in proportion to `percentage`.
pub fn progress_bar(percentage: f64, width: usize) -> String {
    let ratio = (percentage / 100.0).clamp(0.0, 1.0);
    let filled = ((ratio * width as f64).round() as usize).min(width);
    let mut bar = "\u{2588}".repeat(filled);
    bar.push_str(&"\u{2591}".repeat(width - filled));
    bar
}

pub fn format_progress_line(
    label: &str,
    percentage: f64,
    completed_weight: u64,
    total_weight: u64,
    name_width: usize,
    style: &Style,
) -> String {
    format!(
        "{}  {} {:>6.2}%  ({}/{})",
        pad_to_width(label, name_width),
        style.paint(&progress_bar(percentage, BAR_WIDTH)),
        percentage,
        completed_weight,
        total_weight
    )
}

// ---------------------------------------------------------------------------
// Color
// ---------------------------------------------------------------------------

/// Accent coloring for terminal output. Disabled when stdout is not a
/// terminal or `NO_COLOR` is set.
pub struct Style {
    accent: Option<(u8, u8, u8)>,
}

impl Style {
    pub fn plain() -> Self {
        Style { accent: None }
    }

    pub fn for_theme(theme: &Theme) -> Self {
        if !std::io::stdout().is_terminal() || std::env::var_os("NO_COLOR").is_some() {
            return Style::plain();
        }
        Style {
            accent: parse_hex_color(theme.accent),
        }
    }

    pub fn paint(&self, text: &str) -> String {
        match self.accent {
            Some((r, g, b)) => format!("\x1b[38;2;{};{};{}m{}\x1b[0m", r, g, b, text),
            None => text.to_string(),
        }
    }
}

/// Parse `#rrggbb`.
pub fn parse_hex_color(hex: &str) -> Option<(u8, u8, u8)> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 || !digits.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::category::CategoryGroup;
    use crate::model::task::Priority;
    use chrono::Utc;

    fn task(completed: bool, pinned: bool, priority: Priority) -> Task {
        Task {
            id: "0123456789abcdef".to_string(),
            title: "Write report".to_string(),
            weight: 3,
            category_id: "c".to_string(),
            priority,
            completed,
            pinned,
            order: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_format_task_line() {
        insta::assert_snapshot!(
            format_task_line(&task(true, false, Priority::High)),
            @"[x]  ! 01234567  Write report (w3)"
        );
        insta::assert_snapshot!(
            format_task_line(&task(false, true, Priority::Low)),
            @"[ ] ^. 01234567  Write report (w3)"
        );
    }

    #[test]
    fn test_format_category_line() {
        let category = Category {
            id: "abcdef0123".to_string(),
            name: "Fitness".to_string(),
            group: CategoryGroup::Health,
            color: Some("green".to_string()),
            order: 0,
            created_at: Utc::now(),
        };
        insta::assert_snapshot!(
            format_category_line(&category, 10),
            @"abcdef01  Fitness     health  (green)"
        );
    }

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(0.0, 4), "\u{2591}\u{2591}\u{2591}\u{2591}");
        assert_eq!(progress_bar(50.0, 4), "\u{2588}\u{2588}\u{2591}\u{2591}");
        assert_eq!(progress_bar(100.0, 4), "\u{2588}\u{2588}\u{2588}\u{2588}");
        assert_eq!(progress_bar(250.0, 4), "\u{2588}\u{2588}\u{2588}\u{2588}");
    }

    #[test]
    fn test_format_progress_line() {
        let line = format_progress_line("Work", 33.33, 1, 3, 6, &Style::plain());
        assert!(line.starts_with("Work    "));
        assert!(line.ends_with(" 33.33%  (1/3)"));
    }

    #[test]
    fn test_highlight_spans() {
        let accent = Style {
            accent: Some((255, 0, 0)),
        };
        assert_eq!(
            highlight_spans("weekly report", &[7..13], &accent),
            "weekly \x1b[38;2;255;0;0mreport\x1b[0m"
        );
        assert_eq!(
            highlight_spans("a b a", &[0..1, 4..5], &Style::plain()),
            "a b a"
        );
    }

    #[test]
    fn test_format_search_hit() {
        let hit = SearchHit {
            id: "0123456789".to_string(),
            category_id: "c".to_string(),
            field: MatchField::TaskTitle,
            text: "Report broken tap".to_string(),
            spans: vec![14..17],
        };
        insta::assert_snapshot!(
            format_search_hit(&hit, "Home", &Style::plain()),
            @"[Home] 01234567  Report broken tap"
        );
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("abc"), "abc");
        assert_eq!(short_id("0123456789"), "01234567");
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#00d4ff"), Some((0, 212, 255)));
        assert_eq!(parse_hex_color("00d4ff"), None);
        assert_eq!(parse_hex_color("#zzzzzz"), None);
    }
}
