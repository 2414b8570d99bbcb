//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum, ValueHint};

use crate::domain::{CreateAction, Position};

/// Hierarchical tree-table manager: lazy loading, validated moves and CRUD actions
#[derive(Parser, Debug)]
#[command(name = "treetable")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug output: -d info, -dd debug, -ddd trace
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub debug: u8,

    /// Project directory (default: cwd)
    #[arg(short = 'C', long, global = true, value_hint = ValueHint::DirPath)]
    pub project_dir: Option<PathBuf>,

    /// Data file (default: <project_dir>/treetable.json)
    #[arg(short, long, global = true, env = "TREETABLE_FILE", value_hint = ValueHint::FilePath)]
    pub file: Option<PathBuf>,

    /// Use the configured source_url/crud_url instead of the data file
    #[arg(long, global = true)]
    pub remote: bool,

    /// Locale for labels and messages (overrides config)
    #[arg(short, long, global = true)]
    pub locale: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the tree
    Show {
        /// Levels to expand (default: all)
        #[arg(long)]
        depth: Option<usize>,
    },

    /// List the children of a node
    Children {
        /// Node id, or the root id for the root level
        #[arg(default_value = "#")]
        node: String,
        /// Fetch again even if already loaded
        #[arg(long)]
        reload: bool,
    },

    /// Create a node relative to an anchor
    Create {
        /// Where the new node goes relative to the anchor
        #[arg(value_enum)]
        position: CreatePosition,
        /// Display name
        name: String,
        /// Anchor node id (root id for root-level inserts)
        #[arg(short, long, default_value = "#")]
        anchor: String,
        /// Node kind
        #[arg(short, long)]
        kind: Option<String>,
    },

    /// Rename a node or change its kind
    Update {
        id: String,
        name: String,
        /// Node kind (default: unchanged)
        #[arg(short, long)]
        kind: Option<String>,
    },

    /// Delete a node and everything below it
    Delete {
        id: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Move a node relative to a target
    Move {
        id: String,
        /// Target node id (root id for the root level)
        target: String,
        #[arg(value_enum, default_value_t = MovePosition::Into)]
        position: MovePosition,
    },

    /// List locales or show one
    Locales {
        /// Locale code to resolve and print
        code: Option<String>,
        /// Fail if the locale (or any, without CODE) lacks keys
        #[arg(long)]
        check: bool,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,
    /// Print a commented configuration template
    Template,
    /// Print config file locations
    Path,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreatePosition {
    Before,
    After,
    FirstChild,
    LastChild,
}

impl From<CreatePosition> for CreateAction {
    fn from(value: CreatePosition) -> Self {
        match value {
            CreatePosition::Before => CreateAction::CreateBefore,
            CreatePosition::After => CreateAction::CreateAfter,
            CreatePosition::FirstChild => CreateAction::CreateFirstChild,
            CreatePosition::LastChild => CreateAction::CreateLastChild,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovePosition {
    Before,
    After,
    Into,
}

impl From<MovePosition> for Position {
    fn from(value: MovePosition) -> Self {
        match value {
            MovePosition::Before => Position::Before,
            MovePosition::After => Position::After,
            MovePosition::Into => Position::Into,
        }
    }
}
