mod init;
pub use init::cmd_init;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io;
use crate::io::lock::StoreLock;
use crate::io::recovery;
use crate::io::store::{DataStore, DirBackend, StoreError};
use crate::io::store_io::{self, Tracker};
use crate::logging;
use crate::model::category::{CategoryGroup, CategoryPatch};
use crate::model::document::Document;
use crate::model::progress::{CategoryProgress, OverallProgress};
use crate::model::task::{Priority, Task, TaskPatch};
use crate::model::theme::{THEMES, resolve_theme};
use crate::ops::{OpError, RecordKind, category_ops, check, import, search, task_ops};

type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Global override for the tracker directory (set by -C flag)
static TRACKER_DIR_OVERRIDE: OnceLock<PathBuf> = OnceLock::new();

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CmdResult {
    let json = cli.json;

    // Store -C override for load_tracker_cwd()
    if let Some(ref dir) = cli.tracker_dir {
        let abs = fs::canonicalize(dir)
            .map_err(|e| format!("cannot resolve -C path '{}': {}", dir, e))?;
        let _ = TRACKER_DIR_OVERRIDE.set(abs);
    }

    match cli.command {
        // Init is handled in main.rs before store discovery
        Commands::Init(args) => cmd_init(args, cli.tracker_dir.as_deref().map(Path::new)),

        // Read commands
        Commands::Categories => cmd_categories(json),
        Commands::List(args) => cmd_list(args, json),
        Commands::Progress(args) => cmd_progress(args, json),
        Commands::Search(args) => cmd_search(args, json),
        Commands::Check => cmd_check(json),
        Commands::Export(args) => cmd_export(args, json),

        // Write commands
        Commands::Category(args) => cmd_category(args, json),
        Commands::Add(args) => cmd_add(args, json),
        Commands::Edit(args) => cmd_edit(args, json),
        Commands::Done(args) => cmd_toggle(args, json, DataStore::toggle_completed),
        Commands::Pin(args) => cmd_toggle(args, json, DataStore::toggle_pinned),
        Commands::Rm(args) => cmd_rm(args),
        Commands::Reorder(args) => cmd_reorder(args),
        Commands::Import(args) => cmd_import(args, json),
        Commands::Clear(args) => cmd_clear(args),

        // Preferences and maintenance
        Commands::Theme(args) => cmd_theme(args, json),
        Commands::Recovery(args) => cmd_recovery(args, json),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn load_tracker_cwd() -> Result<Tracker, StoreError> {
    let start = match TRACKER_DIR_OVERRIDE.get() {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()?,
    };
    let root = store_io::discover_store(&start)?;
    let tracker = store_io::open_tracker(&root)?;
    logging::init_logging(&tracker.config.log.level);
    Ok(tracker)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Resolve a full id or unique id prefix against `ids`.
fn resolve_prefix<'a>(
    ids: impl Iterator<Item = &'a str>,
    prefix: &str,
    kind: RecordKind,
) -> Result<String, Box<dyn std::error::Error>> {
    let mut matches = Vec::new();
    for id in ids {
        if id == prefix {
            return Ok(id.to_string());
        }
        if !prefix.is_empty() && id.starts_with(prefix) {
            matches.push(id);
        }
    }
    match matches.as_slice() {
        [only] => Ok(only.to_string()),
        [] => Err(OpError::NotFound {
            kind,
            id: prefix.to_string(),
        }
        .into()),
        many => Err(format!(
            "ambiguous {} id '{}': matches {}",
            kind,
            prefix,
            many.iter().map(|id| short_id(id)).collect::<Vec<_>>().join(", ")
        )
        .into()),
    }
}

fn resolve_category_id(doc: &Document, prefix: &str) -> Result<String, Box<dyn std::error::Error>> {
    resolve_prefix(
        doc.categories.iter().map(|c| c.id.as_str()),
        prefix,
        RecordKind::Category,
    )
}

fn resolve_task_id(doc: &Document, prefix: &str) -> Result<String, Box<dyn std::error::Error>> {
    resolve_prefix(
        doc.tasks.iter().map(|t| t.id.as_str()),
        prefix,
        RecordKind::Task,
    )
}

fn parse_group_arg(value: &str) -> Result<CategoryGroup, String> {
    CategoryGroup::parse_group(value)
        .ok_or_else(|| format!("invalid group '{}': expected work, personal, or health", value))
}

fn parse_priority_arg(value: &str) -> Result<Priority, String> {
    Priority::parse_priority(value)
        .ok_or_else(|| format!("invalid priority '{}': expected high, medium, or low", value))
}

fn category_name(doc: &Document, id: &str) -> String {
    doc.category(id).map(|c| c.name.clone()).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Read command handlers
// ---------------------------------------------------------------------------

fn cmd_categories(json: bool) -> CmdResult {
    let mut tracker = load_tracker_cwd()?;
    let categories = tracker.store.list_categories()?;

    if json {
        return print_json(&categories);
    }
    if categories.is_empty() {
        println!("no categories (add one with `pt category add <name>`)");
        return Ok(());
    }
    let width = name_column_width(categories.iter().map(|c| c.name.as_str()));
    for category in &categories {
        println!("{}", format_category_line(category, width));
    }
    Ok(())
}

fn cmd_list(args: ListArgs, json: bool) -> CmdResult {
    let mut tracker = load_tracker_cwd()?;
    let doc = tracker.store.load()?;

    let filter = match args.category {
        Some(ref prefix) => Some(resolve_category_id(&doc, prefix)?),
        None => None,
    };

    if json {
        let tasks = match filter {
            Some(ref id) => task_ops::list_tasks_in_category(&doc, id),
            None => task_ops::list_tasks(&doc),
        };
        let out: Vec<TaskWithCategoryJson> = tasks
            .into_iter()
            .map(|t| TaskWithCategoryJson {
                category_name: category_name(&doc, &t.category_id),
                task: t.clone(),
            })
            .collect();
        return print_json(&out);
    }

    let mut first = true;
    for category in category_ops::list_categories(&doc) {
        if filter.as_ref().is_some_and(|id| *id != category.id) {
            continue;
        }
        if !first {
            println!();
        }
        first = false;
        println!("{} ({})", category.name, category.group.key());
        let tasks = task_ops::list_tasks_in_category(&doc, &category.id);
        if tasks.is_empty() {
            println!("  (no tasks)");
        }
        for task in tasks {
            println!("  {}", format_task_line(task));
        }
    }
    if first {
        println!("no categories (add one with `pt category add <name>`)");
    }
    Ok(())
}

#[derive(Serialize)]
struct ProgressJson {
    overall: OverallProgress,
    categories: Vec<CategoryProgress>,
}

fn cmd_progress(args: ProgressArgs, json: bool) -> CmdResult {
    let mut tracker = load_tracker_cwd()?;
    let style = Style::for_theme(resolve_theme(&tracker.config.ui.theme));

    if args.grouped {
        let groups = tracker.store.grouped_progress()?;
        if json {
            return print_json(&groups);
        }
        let width = name_column_width(
            groups
                .values()
                .flat_map(|g| g.categories.iter().map(|c| c.category_name.as_str()))
                .chain(groups.values().map(|g| g.name.as_str())),
        )
        .max(8);
        for group in groups.values() {
            println!(
                "{}",
                format_progress_line(
                    &group.name,
                    group.total_progress,
                    group.completed_weight,
                    group.total_weight,
                    width + 2,
                    &style
                )
            );
            for category in &group.categories {
                println!(
                    "  {}",
                    format_progress_line(
                        &category.category_name,
                        category.progress_percentage,
                        category.completed_weight,
                        category.total_weight,
                        width,
                        &style
                    )
                );
            }
        }
        return Ok(());
    }

    let categories = tracker.store.category_progress()?;
    let overall = tracker.store.overall_progress()?;
    if json {
        return print_json(&ProgressJson {
            overall,
            categories,
        });
    }
    let width = name_column_width(categories.iter().map(|c| c.category_name.as_str())).max(7);
    for category in &categories {
        println!(
            "{}",
            format_progress_line(
                &category.category_name,
                category.progress_percentage,
                category.completed_weight,
                category.total_weight,
                width,
                &style
            )
        );
    }
    if !categories.is_empty() {
        println!();
    }
    println!(
        "{}",
        format_progress_line(
            "Overall",
            overall.progress_percentage,
            overall.completed_weight,
            overall.total_weight,
            width,
            &style
        )
    );
    Ok(())
}

fn cmd_search(args: SearchArgs, json: bool) -> CmdResult {
    let mut tracker = load_tracker_cwd()?;
    let doc = tracker.store.load()?;
    let re = Regex::new(&args.pattern)?;
    let filter = match args.category {
        Some(ref prefix) => Some(resolve_category_id(&doc, prefix)?),
        None => None,
    };
    let hits = search::search_document(&doc, &re, filter.as_deref());

    if json {
        let out: Vec<SearchHitJson> = hits.iter().map(search_hit_to_json).collect();
        return print_json(&out);
    }
    let style = Style::for_theme(resolve_theme(&tracker.config.ui.theme));
    for hit in &hits {
        let scope = match hit.field {
            search::MatchField::CategoryName => "category".to_string(),
            search::MatchField::TaskTitle => category_name(&doc, &hit.category_id),
        };
        println!("{}", format_search_hit(hit, &scope, &style));
    }
    Ok(())
}

fn cmd_check(json: bool) -> CmdResult {
    let mut tracker = load_tracker_cwd()?;
    let doc = tracker.store.load()?;
    let result = check::check_document(&doc);

    if json {
        return print_json(&result);
    }
    if !result.errors.is_empty() {
        println!("Errors:");
        for err in &result.errors {
            match err {
                check::CheckError::DuplicateId { id, count } => {
                    println!("  {} is used by {} records", id, count);
                }
                check::CheckError::OrphanedTask {
                    task_id,
                    category_id,
                } => {
                    println!(
                        "  task {} references missing category {}",
                        task_id, category_id
                    );
                }
                check::CheckError::ZeroWeight { task_id } => {
                    println!("  task {} has weight 0", task_id);
                }
                check::CheckError::EmptyText { id, field } => {
                    println!("  {} has an empty {}", id, field);
                }
            }
        }
    }
    if !result.warnings.is_empty() {
        if !result.errors.is_empty() {
            println!();
        }
        println!("Warnings:");
        for warn in &result.warnings {
            match warn {
                check::CheckWarning::CategoryOrderTie {
                    order,
                    category_ids,
                } => {
                    println!(
                        "  categories share order {}: {}",
                        order,
                        category_ids.join(", ")
                    );
                }
                check::CheckWarning::SchemaVersion { found, expected } => {
                    println!("  schema version {} (expected {})", found, expected);
                }
            }
        }
    }
    if result.valid {
        println!("✓ document is valid");
    } else {
        println!("✗ document has errors");
    }
    Ok(())
}

fn cmd_export(args: ExportArgs, json: bool) -> CmdResult {
    let mut tracker = load_tracker_cwd()?;
    let doc = tracker.store.export()?;
    let text = import::export_json(&doc)?;

    if args.stdout || (json && args.output.is_none()) {
        print!("{}", text);
        return Ok(());
    }
    let path = match args.output {
        Some(path) => PathBuf::from(path),
        None => PathBuf::from(import::export_filename(Utc::now().date_naive())),
    };
    fs::write(&path, text).map_err(|e| format!("could not write {}: {}", path.display(), e))?;
    if json {
        return print_json(&ExportSummaryJson {
            path: path.display().to_string(),
            categories: doc.categories.len(),
            tasks: doc.tasks.len(),
        });
    }
    println!(
        "exported {} categories and {} tasks to {}",
        doc.categories.len(),
        doc.tasks.len(),
        path.display()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Write command handlers
// ---------------------------------------------------------------------------

fn cmd_category(args: CategoryCmd, json: bool) -> CmdResult {
    let mut tracker = load_tracker_cwd()?;
    let _lock = StoreLock::acquire_default(&tracker.store_dir)?;

    match args.action {
        CategoryAction::Add(args) => {
            let group = match args.group {
                Some(ref g) => parse_group_arg(g)?,
                None => tracker.config.defaults.group,
            };
            let category = tracker
                .store
                .create_category(&args.name, group, args.color.as_deref())?;
            if json {
                return print_json(&category);
            }
            println!("{}", category.id);
        }
        CategoryAction::Edit(args) => {
            let doc = tracker.store.load()?;
            let id = resolve_category_id(&doc, &args.id)?;
            let color = if args.no_color {
                Some(None)
            } else {
                args.color.map(Some)
            };
            let patch = CategoryPatch {
                name: args.name,
                group: args.group.as_deref().map(parse_group_arg).transpose()?,
                color,
                order: args.order,
            };
            if patch.is_empty() {
                return Err("nothing to change (see `pt category edit --help`)".into());
            }
            let category = tracker.store.update_category(&id, patch)?;
            if json {
                return print_json(&category);
            }
            let width = name_column_width([category.name.as_str()]);
            println!("{}", format_category_line(&category, width));
        }
        CategoryAction::Rm(args) => {
            let doc = tracker.store.load()?;
            let id = resolve_category_id(&doc, &args.id)?;
            let cascaded = tracker.store.delete_category(&id)?.unwrap_or(0);
            println!(
                "deleted category {} and {} task{}",
                short_id(&id),
                cascaded,
                if cascaded == 1 { "" } else { "s" }
            );
        }
        CategoryAction::Reorder(args) => {
            let doc = tracker.store.load()?;
            let ids = args
                .ids
                .iter()
                .map(|p| resolve_category_id(&doc, p))
                .collect::<Result<Vec<_>, _>>()?;
            let moved = tracker.store.reorder_categories(&ids)?;
            println!("reordered {} categories", moved);
        }
    }
    Ok(())
}

fn cmd_add(args: AddArgs, json: bool) -> CmdResult {
    let mut tracker = load_tracker_cwd()?;
    let _lock = StoreLock::acquire_default(&tracker.store_dir)?;

    let doc = tracker.store.load()?;
    let category_id = resolve_category_id(&doc, &args.category)?;
    let priority = match args.priority {
        Some(ref p) => parse_priority_arg(p)?,
        None => tracker.config.defaults.priority,
    };
    let weight = args.weight.unwrap_or(tracker.config.defaults.weight);

    let task = tracker
        .store
        .create_task(&args.title, weight, &category_id, priority)?;
    if json {
        return print_json(&task);
    }
    println!("{}", task.id);
    Ok(())
}

fn cmd_edit(args: EditArgs, json: bool) -> CmdResult {
    let mut tracker = load_tracker_cwd()?;
    let _lock = StoreLock::acquire_default(&tracker.store_dir)?;

    let doc = tracker.store.load()?;
    let id = resolve_task_id(&doc, &args.id)?;
    let category_id = match args.category {
        Some(ref prefix) => Some(resolve_category_id(&doc, prefix)?),
        None => None,
    };
    let patch = TaskPatch {
        title: args.title,
        weight: args.weight,
        category_id,
        priority: args.priority.as_deref().map(parse_priority_arg).transpose()?,
        order: args.order,
        ..TaskPatch::default()
    };
    if patch.is_empty() {
        return Err("nothing to change (see `pt edit --help`)".into());
    }

    let task = tracker.store.update_task(&id, patch)?;
    if json {
        return print_json(&task);
    }
    println!("{}", format_task_line(&task));
    Ok(())
}

fn cmd_toggle(
    args: IdArg,
    json: bool,
    toggle: fn(&mut DataStore<DirBackend>, &str) -> Result<Task, StoreError>,
) -> CmdResult {
    let mut tracker = load_tracker_cwd()?;
    let _lock = StoreLock::acquire_default(&tracker.store_dir)?;

    let doc = tracker.store.load()?;
    let id = resolve_task_id(&doc, &args.id)?;
    let task = toggle(&mut tracker.store, &id)?;
    if json {
        return print_json(&task);
    }
    println!("{}", format_task_line(&task));
    Ok(())
}

fn cmd_rm(args: IdArg) -> CmdResult {
    let mut tracker = load_tracker_cwd()?;
    let _lock = StoreLock::acquire_default(&tracker.store_dir)?;

    let doc = tracker.store.load()?;
    let id = resolve_task_id(&doc, &args.id)?;
    tracker.store.delete_task(&id)?;
    println!("deleted task {}", short_id(&id));
    Ok(())
}

fn cmd_reorder(args: ReorderTasksArgs) -> CmdResult {
    let mut tracker = load_tracker_cwd()?;
    let _lock = StoreLock::acquire_default(&tracker.store_dir)?;

    let doc = tracker.store.load()?;
    let category_id = resolve_category_id(&doc, &args.category)?;
    let ids = args
        .ids
        .iter()
        .map(|p| resolve_task_id(&doc, p))
        .collect::<Result<Vec<_>, _>>()?;
    let moved = tracker.store.reorder_tasks(&category_id, &ids)?;
    println!("reordered {} tasks", moved);
    Ok(())
}

fn cmd_import(args: ImportArgs, json: bool) -> CmdResult {
    let mut tracker = load_tracker_cwd()?;
    let _lock = StoreLock::acquire_default(&tracker.store_dir)?;

    let report = tracker.store.import_file(Path::new(&args.file))?;
    if json {
        return print_json(&report);
    }
    println!(
        "imported {} categories and {} tasks",
        report.categories, report.tasks
    );
    if !report.is_clean() {
        println!(
            "repaired {} fields, regenerated {} ids, dropped {} orphaned tasks, skipped {} entries",
            report.repaired_fields,
            report.regenerated_ids,
            report.dropped_orphans,
            report.skipped_entries
        );
    }
    println!("previous document saved to the recovery log (`pt recovery`)");
    Ok(())
}

fn cmd_clear(args: ClearArgs) -> CmdResult {
    if !args.yes {
        return Err("refusing to delete every category and task without --yes".into());
    }
    let mut tracker = load_tracker_cwd()?;
    let _lock = StoreLock::acquire_default(&tracker.store_dir)?;

    tracker.store.clear_all()?;
    println!("cleared all categories and tasks");
    println!("previous document saved to the recovery log (`pt recovery`)");
    Ok(())
}

// ---------------------------------------------------------------------------
// Preferences
// ---------------------------------------------------------------------------

fn cmd_theme(args: ThemeArgs, json: bool) -> CmdResult {
    let tracker = load_tracker_cwd()?;

    if let Some(name) = args.name {
        let _lock = StoreLock::acquire_default(&tracker.store_dir)?;
        let (_, mut doc) = config_io::read_config(&tracker.store_dir)?;
        config_io::set_theme(&mut doc, &name)?;
        config_io::write_config(&tracker.store_dir, &doc)?;
        println!("theme: {}", name);
        return Ok(());
    }

    let current = resolve_theme(&tracker.config.ui.theme);
    if json {
        return print_json(&ThemeListJson {
            current: current.key.to_string(),
            themes: THEMES
                .iter()
                .map(|t| ThemeEntryJson {
                    key: t.key,
                    name: t.name,
                    accent: t.accent,
                    selected: t.key == current.key,
                })
                .collect(),
        });
    }
    if current.key != tracker.config.ui.theme {
        eprintln!(
            "warning: unknown theme '{}' in config.toml, using '{}'",
            tracker.config.ui.theme, current.key
        );
    }
    for theme in THEMES {
        let marker = if theme.key == current.key { '*' } else { ' ' };
        let style = Style::for_theme(theme);
        println!(
            "{} {:<8} {:<10} {}",
            marker,
            theme.key,
            theme.name,
            style.paint(&progress_bar(60.0, 10))
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Recovery log
// ---------------------------------------------------------------------------

fn cmd_recovery(args: RecoveryCmd, json: bool) -> CmdResult {
    let tracker = load_tracker_cwd()?;
    let dir = &tracker.store_dir;

    match args.action {
        Some(RecoveryAction::Path) => {
            println!("{}", recovery::recovery_log_path(dir).display());
        }
        Some(RecoveryAction::Prune(prune)) => {
            let before = if prune.all {
                None
            } else {
                Some(match prune.before {
                    Some(ref ts) => DateTime::parse_from_rfc3339(ts)
                        .map_err(|e| format!("invalid --before timestamp '{}': {}", ts, e))?
                        .with_timezone(&Utc),
                    None => Utc::now() - chrono::Duration::days(recovery::PRUNE_AGE_DAYS),
                })
            };
            let _lock = StoreLock::acquire_default(dir)?;
            let removed = recovery::prune_recovery(dir, before)?;
            println!("pruned {} recovery entries", removed);
        }
        None => {
            let entries = recovery::read_recovery_entries(dir, Some(args.limit.unwrap_or(10)));
            if json {
                let out: Vec<RecoveryEntryJson> =
                    entries.iter().map(recovery_entry_to_json).collect();
                return print_json(&out);
            }
            if entries.is_empty() {
                println!("recovery log is empty");
                return Ok(());
            }
            for (i, entry) in entries.iter().enumerate() {
                if i > 0 {
                    println!();
                }
                println!(
                    "{} {}: {}",
                    entry
                        .timestamp
                        .to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
                    entry.category,
                    entry.description
                );
                for (key, value) in &entry.fields {
                    println!("  {}: {}", key, value);
                }
                if !entry.body.is_empty() {
                    println!("{}", entry.body);
                }
            }
        }
    }
    Ok(())
}
