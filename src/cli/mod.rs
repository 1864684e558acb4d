//! CLI argument definitions for abl.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("ABL_GIT_COMMIT"),
    ", built ",
    env!("ABL_BUILD_TIMESTAMP"),
    ")"
);

/// abl - Resolve ability documents into agent prompts.
///
/// Start with `abl list` to see the store, then `abl resolve <persona>`.
#[derive(Parser, Debug)]
#[command(name = "abl")]
#[command(author, version, long_version = LONG_VERSION, about = "Resolve persona, rule, policy and repo documents into deterministic agent prompts", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Store root directory (overrides ABL_DATA_DIR and config.kdl)
    #[arg(long = "store", global = true)]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List ability documents
    List {
        /// Only list documents of this type (persona, rule, policy, style, repo)
        #[arg(long = "type")]
        ability_type: Option<String>,
    },

    /// Show one document by exact id
    Show {
        /// Document id (e.g., rule.backend.base)
        id: String,
    },

    /// Resolve a persona into a prompt and manifest
    Resolve {
        /// Persona id, slug, or alias (e.g., engineer)
        persona: String,

        /// Request tag (repeatable)
        #[arg(short = 't', long = "tag")]
        tags: Vec<String>,

        /// Repository id, name, or alias
        #[arg(short = 'r', long = "repo")]
        repo: Option<String>,

        /// Include one trace row per selection attempt
        #[arg(long)]
        trace: bool,

        /// Print only the rendered prompt
        #[arg(long)]
        prompt_only: bool,
    },

    /// Write a new ability document
    Write(WriteArgs),

    /// Show document counts for the store
    Summary,

    /// Configuration commands
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Arguments for `abl write`
#[derive(clap::Args, Debug)]
pub struct WriteArgs {
    /// Document type (persona, rule, policy, style, repo)
    #[arg(long = "type")]
    pub ability_type: String,

    /// Document id (e.g., rule.backend.base)
    #[arg(long)]
    pub id: String,

    /// Body text
    #[arg(short = 'c', long = "content", group = "source")]
    pub content: Option<String>,

    /// Read the body from a file
    #[arg(long, group = "source")]
    pub file: Option<PathBuf>,

    /// Read the body from stdin
    #[arg(long, group = "source")]
    pub stdin: bool,

    /// Tag (repeatable)
    #[arg(short = 't', long = "tag")]
    pub tags: Vec<String>,

    /// Priority (higher wins, default 100)
    #[arg(short = 'p', long, allow_negative_numbers = true)]
    pub priority: Option<f64>,

    /// Display name
    #[arg(long)]
    pub name: Option<String>,

    /// Alias (repeatable)
    #[arg(long = "alias")]
    pub aliases: Vec<String>,

    /// Included document id (repeatable)
    #[arg(long = "include")]
    pub includes: Vec<String>,

    /// Mark the document deprecated
    #[arg(long)]
    pub deprecated: bool,

    /// Id of the document this one supersedes
    #[arg(long)]
    pub supersedes: Option<String>,

    /// File name to use instead of one derived from the id
    #[arg(long)]
    pub filename: Option<String>,

    /// Subdirectory under the type folder
    #[arg(long)]
    pub dir: Option<String>,

    /// Replace an existing file
    #[arg(long)]
    pub overwrite: bool,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show resolved configuration and where each value came from
    Show,
}
