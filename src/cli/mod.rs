//! CLI argument definitions for sprintrecon.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// sprintrecon - Compare a sprint's plan with what was actually reported.
///
/// Open a sprint, record the planned tasks, record the reported status,
/// then `spr compare` to see what is in progress, not reported or new.
#[derive(Parser, Debug)]
#[command(name = "spr")]
#[command(author, version, about = "Reconcile planned sprint tasks against reported status", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Run as if spr was started in <path> instead of the current directory.
    /// Each workspace directory has its own record store.
    #[arg(short = 'C', long = "workspace", global = true, env = "SPR_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Sprint selection shared by every per-sprint command.
#[derive(Args, Debug, Clone)]
pub struct SprintArg {
    /// Sprint identifier (e.g., 2024-S3)
    #[arg(short = 's', long = "sprint", env = "SPR_SPRINT")]
    pub sprint: String,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Store management commands
    System {
        #[command(subcommand)]
        command: SystemCommands,
    },

    /// Sprint management commands
    Sprint {
        #[command(subcommand)]
        command: SprintCommands,
    },

    /// Planned task commands
    Planned {
        #[command(subcommand)]
        command: PlannedCommands,
    },

    /// Reported task commands
    Reported {
        #[command(subcommand)]
        command: ReportedCommands,
    },

    /// Preview the classification of a sprint's tasks (no changes are saved)
    Compare {
        #[command(flatten)]
        sprint: SprintArg,
    },

    /// Classify, attach reasons and save the sprint's final report
    Finalize {
        #[command(flatten)]
        sprint: SprintArg,

        /// Reason for a task, as CODE=TEXT (repeatable)
        #[arg(short = 'r', long = "reason")]
        reasons: Vec<String>,

        /// JSON object file mapping task code to reason ('-' for stdin)
        #[arg(long)]
        reasons_file: Option<PathBuf>,
    },

    /// Show the saved final report of a sprint
    Report {
        #[command(flatten)]
        sprint: SprintArg,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Store management subcommands
#[derive(Subcommand, Debug)]
pub enum SystemCommands {
    /// Initialize the record store for this workspace
    Init,

    /// Rebuild the query cache from the JSONL records
    RebuildCache,

    /// Show build and storage information
    Info,
}

/// Sprint subcommands
#[derive(Subcommand, Debug)]
pub enum SprintCommands {
    /// Open a sprint, creating it if it does not exist yet
    Open {
        /// Sprint identifier (e.g., 2024-S3)
        id: String,
    },

    /// List all sprints
    List,

    /// Show a sprint with its task counts
    Show {
        /// Sprint identifier
        id: String,
    },
}

/// Planned task subcommands
#[derive(Subcommand, Debug)]
pub enum PlannedCommands {
    /// Add planned tasks. Repeat each flag once per task; lists must line up.
    Add {
        #[command(flatten)]
        sprint: SprintArg,

        /// Planned start date
        #[arg(long = "start-date")]
        start_date: Vec<String>,

        /// Module or area
        #[arg(short = 'm', long)]
        module: Vec<String>,

        /// Task code
        #[arg(short = 'c', long)]
        code: Vec<String>,

        /// Task name
        #[arg(short = 'n', long)]
        name: Vec<String>,
    },

    /// Import planned tasks from a JSON array of records ('-' for stdin)
    Import {
        #[command(flatten)]
        sprint: SprintArg,

        /// Input file
        source: String,
    },

    /// List planned tasks in entry order
    List {
        #[command(flatten)]
        sprint: SprintArg,
    },
}

/// Reported task subcommands
#[derive(Subcommand, Debug)]
pub enum ReportedCommands {
    /// Add reported tasks. Repeat each flag once per task; lists must line up.
    Add {
        #[command(flatten)]
        sprint: SprintArg,

        /// Report date
        #[arg(long = "report-date")]
        report_date: Vec<String>,

        /// Module or area
        #[arg(short = 'm', long)]
        module: Vec<String>,

        /// Task code
        #[arg(short = 'c', long)]
        code: Vec<String>,

        /// Task name
        #[arg(short = 'n', long)]
        name: Vec<String>,

        /// Progress (free text, e.g. 50%)
        #[arg(short = 'p', long)]
        progress: Vec<String>,
    },

    /// Import reported tasks from a JSON array of records ('-' for stdin)
    Import {
        #[command(flatten)]
        sprint: SprintArg,

        /// Input file
        source: String,
    },

    /// List reported tasks in entry order
    List {
        #[command(flatten)]
        sprint: SprintArg,
    },
}

/// Configuration subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the resolved configuration and where each value comes from
    Show,

    /// Get a value from this workspace's config.kdl
    Get {
        /// Config key (output-format, action-log, action-log-path)
        key: String,
    },

    /// Set a value in this workspace's config.kdl
    Set {
        /// Config key (output-format, action-log, action-log-path)
        key: String,

        /// Value to set
        value: String,
    },
}
