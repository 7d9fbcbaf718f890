use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "pt", about = concat!("pt v", env!("CARGO_PKG_VERSION"), " - weighted progress for your categories and tasks"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Run against a different tracker directory
    #[arg(short = 'C', long = "tracker-dir", global = true)]
    pub tracker_dir: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new tracker in the current directory
    Init(InitArgs),
    /// List categories
    Categories,
    /// Category management
    Category(CategoryCmd),
    /// Add a task to a category
    Add(AddArgs),
    /// Change task fields
    Edit(EditArgs),
    /// Toggle a task's completed flag
    Done(IdArg),
    /// Toggle a task's pinned flag
    Pin(IdArg),
    /// Delete a task
    Rm(IdArg),
    /// Reorder tasks within a category
    Reorder(ReorderTasksArgs),
    /// List tasks
    List(ListArgs),
    /// Show weighted progress
    Progress(ProgressArgs),
    /// Export the whole document as JSON
    Export(ExportArgs),
    /// Replace the whole document with an exported file
    Import(ImportArgs),
    /// Delete every category and task
    Clear(ClearArgs),
    /// Show or set the color theme
    Theme(ThemeArgs),
    /// Validate the stored document
    Check,
    /// Search category names and task titles by regex
    Search(SearchArgs),
    /// View or manage the recovery log
    Recovery(RecoveryCmd),
}

// ---------------------------------------------------------------------------
// Init args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct InitArgs {
    /// Tracker name (default: inferred from directory name)
    #[arg(long)]
    pub name: Option<String>,
    /// Reinitialize even if .tracker/ already exists
    #[arg(long)]
    pub force: bool,
}

// ---------------------------------------------------------------------------
// Category args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct CategoryCmd {
    #[command(subcommand)]
    pub action: CategoryAction,
}

#[derive(Subcommand)]
pub enum CategoryAction {
    /// Create a category
    Add(CategoryAddArgs),
    /// Change category fields
    Edit(CategoryEditArgs),
    /// Delete a category and all of its tasks
    Rm(IdArg),
    /// Reorder categories (listed IDs first, in the given order)
    Reorder(IdsArg),
}

#[derive(Args)]
pub struct CategoryAddArgs {
    /// Category name
    pub name: String,
    /// Group: work, personal, or health (default from config)
    #[arg(long, short = 'g')]
    pub group: Option<String>,
    /// Color hint, e.g. "blue"
    #[arg(long)]
    pub color: Option<String>,
}

#[derive(Args)]
pub struct CategoryEditArgs {
    /// Category ID (or unique prefix)
    pub id: String,
    /// New name
    #[arg(long)]
    pub name: Option<String>,
    /// New group
    #[arg(long, short = 'g')]
    pub group: Option<String>,
    /// New color hint
    #[arg(long, conflicts_with = "no_color")]
    pub color: Option<String>,
    /// Remove the color hint
    #[arg(long)]
    pub no_color: bool,
    /// New order value
    #[arg(long, allow_negative_numbers = true)]
    pub order: Option<i64>,
}

// ---------------------------------------------------------------------------
// Task args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct AddArgs {
    /// Task title
    pub title: String,
    /// Category ID (or unique prefix)
    #[arg(long, short = 'c')]
    pub category: String,
    /// Weight, a positive integer (default from config)
    #[arg(long, short = 'w')]
    pub weight: Option<u32>,
    /// Priority: high, medium, or low (default from config)
    #[arg(long, short = 'p')]
    pub priority: Option<String>,
}

#[derive(Args)]
pub struct EditArgs {
    /// Task ID (or unique prefix)
    pub id: String,
    /// New title
    #[arg(long)]
    pub title: Option<String>,
    /// New weight
    #[arg(long, short = 'w')]
    pub weight: Option<u32>,
    /// Move to another category
    #[arg(long, short = 'c')]
    pub category: Option<String>,
    /// New priority
    #[arg(long, short = 'p')]
    pub priority: Option<String>,
    /// New order value
    #[arg(long, allow_negative_numbers = true)]
    pub order: Option<i64>,
}

#[derive(Args)]
pub struct ReorderTasksArgs {
    /// Category ID (or unique prefix)
    pub category: String,
    /// Task IDs in the desired order
    #[arg(required = true)]
    pub ids: Vec<String>,
}

#[derive(Args)]
pub struct IdArg {
    /// ID (or unique prefix)
    pub id: String,
}

#[derive(Args)]
pub struct IdsArg {
    /// IDs in the desired order
    #[arg(required = true)]
    pub ids: Vec<String>,
}

// ---------------------------------------------------------------------------
// Read command args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ListArgs {
    /// Only tasks in this category
    #[arg(long, short = 'c')]
    pub category: Option<String>,
}

#[derive(Args)]
pub struct ProgressArgs {
    /// Aggregate by group (work, personal, health)
    #[arg(long)]
    pub grouped: bool,
}

#[derive(Args)]
pub struct SearchArgs {
    /// Regex pattern
    pub pattern: String,
    /// Only this category and its tasks
    #[arg(long, short = 'c')]
    pub category: Option<String>,
}

// ---------------------------------------------------------------------------
// Import / export
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ExportArgs {
    /// Write to this file (default: progress-tracker-backup-<date>.json)
    #[arg(long, short = 'o', conflicts_with = "stdout")]
    pub output: Option<String>,
    /// Write to stdout instead of a file
    #[arg(long)]
    pub stdout: bool,
}

#[derive(Args)]
pub struct ImportArgs {
    /// Previously exported JSON file
    pub file: String,
}

#[derive(Args)]
pub struct ClearArgs {
    /// Confirm deleting everything
    #[arg(long)]
    pub yes: bool,
}

#[derive(Args)]
pub struct ThemeArgs {
    /// Theme to select (omit to show the current theme and the list)
    pub name: Option<String>,
}

// ---------------------------------------------------------------------------
// Recovery log
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct RecoveryCmd {
    #[command(subcommand)]
    pub action: Option<RecoveryAction>,
    /// Maximum number of entries to show (default: 10)
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Subcommand)]
pub enum RecoveryAction {
    /// Remove old entries
    Prune(RecoveryPruneArgs),
    /// Print the absolute path to the recovery log
    Path,
}

#[derive(Args)]
pub struct RecoveryPruneArgs {
    /// Remove entries older than this timestamp (default: 30 days ago)
    #[arg(long)]
    pub before: Option<String>,
    /// Remove all entries
    #[arg(long)]
    pub all: bool,
}
