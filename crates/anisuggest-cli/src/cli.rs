//! # CLI Structure and Argument Parsing
//!
//! The terminal stands in for a browser address bar: each subcommand replays
//! one or more input surface events against the suggestion engine.
//!
//! ## Usage Patterns
//!
//! ```bash
//! # One input change
//! anisuggest suggest onizuka
//! anisuggest suggest "bebop/c"      # character search
//! anisuggest suggest "bebop!"       # bypass the cache
//!
//! # Simulated typing, one input change per character
//! anisuggest type "great teacher" --interval-ms 60
//!
//! # Where submitting the text would navigate
//! anisuggest open "cowboy bebop"
//!
//! # Cache maintenance
//! anisuggest cache stats
//! anisuggest cache purge
//! ```

use crate::output::OutputFormat;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Main CLI structure for the `anisuggest` command
#[derive(Parser, Clone, Debug)]
#[command(name = "anisuggest")]
#[command(version)]
#[command(about = "anisuggest - Cached, ranked search suggestions", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Suppress informational messages (only show errors)
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable all ANSI colors in output (also respects `NO_COLOR` env)
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Path to configuration file. Also via `ANISUGGEST_CONFIG`.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Output selection shared by commands that print suggestions
#[derive(Args, Clone, Copy, Debug, Default)]
pub struct FormatArgs {
    /// Print descriptions with their markup untouched
    #[arg(long, conflicts_with = "json")]
    pub raw: bool,

    /// Print machine-readable JSON
    #[arg(long)]
    pub json: bool,
}

impl FormatArgs {
    /// Resolve the flags into an output format.
    pub const fn format(self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else if self.raw {
            OutputFormat::Raw
        } else {
            OutputFormat::Text
        }
    }
}

/// Available subcommands for the `anisuggest` CLI
#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Show suggestions for one input change
    Suggest {
        /// Input text, joined with spaces
        #[arg(value_name = "TEXT")]
        text: Vec<String>,

        #[command(flatten)]
        format: FormatArgs,
    },

    /// Type the text one character at a time and show what the last keystroke yields
    Type {
        /// Input text, joined with spaces
        #[arg(value_name = "TEXT")]
        text: Vec<String>,

        /// Delay between keystrokes in milliseconds
        #[arg(long, default_value_t = 80)]
        interval_ms: u64,

        #[command(flatten)]
        format: FormatArgs,
    },

    /// Print the URL that submitting the text would open
    Open {
        /// Input text, joined with spaces
        #[arg(value_name = "TEXT")]
        text: Vec<String>,
    },

    /// Inspect or maintain the result cache
    Cache {
        #[command(subcommand)]
        action: CacheCommands,
    },
}

/// Cache maintenance subcommands
#[derive(Subcommand, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheCommands {
    /// Show entry counts and size against the quota
    Stats {
        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove every cached entry
    Clear,
    /// Remove expired entries and dangling aliases
    Purge,
}

impl Cli {
    /// Whether the selected command prints JSON.
    pub const fn wants_json(&self) -> bool {
        match &self.command {
            Commands::Suggest { format, .. } | Commands::Type { format, .. } => format.json,
            Commands::Cache {
                action: CacheCommands::Stats { json },
            } => *json,
            _ => false,
        }
    }
}

/// Join positional words into one input text.
pub fn join_text(words: &[String]) -> String {
    words.join(" ")
}
