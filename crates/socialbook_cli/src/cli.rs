use clap::{Parser, Subcommand};
use socialbook_core::{BackendKind, SortMode, ThemeKey};
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "socialbook")]
#[command(about = "Organize people into groups")]
pub struct Cli {
    /// Config file (JSON); defaults apply when it does not exist
    #[arg(long, env = "SOCIALBOOK_CONFIG", default_value = "socialbook.json")]
    pub config: PathBuf,

    /// Storage backend, overriding the config file
    #[arg(long)]
    pub backend: Option<BackendKind>,

    /// Signed-in user for the remote backend
    #[arg(long)]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Group commands
    Group {
        #[command(subcommand)]
        group_cmd: GroupCommand,
    },
    /// Person commands
    Person {
        #[command(subcommand)]
        person_cmd: PersonCommand,
    },
    /// Case-insensitive search over names and notes
    Search {
        query: String,
    },
    /// Print an export document
    Export {
        /// Export one group
        #[arg(long)]
        group: Option<Uuid>,
        /// Export one person (requires --group)
        #[arg(long, requires = "group")]
        person: Option<Uuid>,
        /// Write to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Import an export document or a persisted dataset
    Import {
        path: PathBuf,
        /// Upsert by id instead of replacing everything
        #[arg(long)]
        merge: bool,
    },
    /// Show or set the theme
    Theme {
        key: Option<ThemeKey>,
    },
    /// Show or set the sort mode
    Sort {
        mode: Option<SortMode>,
    },
    /// Write the effective configuration to the config path
    InitConfig,
}

#[derive(Subcommand)]
pub enum GroupCommand {
    /// List groups and their people in the current sort order
    List,
    /// Create a group
    Add { name: String },
    /// Rename a group
    Rename { id: Uuid, name: String },
    /// Delete a group and everyone in it
    Rm { id: Uuid },
}

#[derive(Subcommand)]
pub enum PersonCommand {
    /// Add a person to a group
    Add {
        group: Uuid,
        name: String,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Edit name and/or notes
    Edit {
        group: Uuid,
        id: Uuid,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, conflicts_with = "clear_notes")]
        notes: Option<String>,
        #[arg(long)]
        clear_notes: bool,
    },
    /// Remove a person
    Rm { group: Uuid, id: Uuid },
    /// Move a person to another group
    Mv {
        id: Uuid,
        #[arg(long)]
        from: Uuid,
        #[arg(long)]
        to: Uuid,
    },
}
