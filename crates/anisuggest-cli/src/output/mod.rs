//! # Output Formatting
//!
//! Suggestions carry a small markup language meant for an address bar
//! dropdown: `<url>`, `<match>` and `<dim>` tags around entity-escaped text.
//! This module turns it into terminal output.
//!
//! ## Supported Formats
//!
//! - **Text**: markup rendered as terminal styling (default)
//! - **Raw**: markup printed untouched
//! - **JSON**: the whole outcome as one JSON object

mod markup;

pub use markup::render;

use anisuggest_core::{BestMatch, Presenter, SuggestOutcome};
use anyhow::Result;
use colored::Colorize;
use std::io::Write;

/// Output format options supported by the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Styled, human-readable text
    #[default]
    Text,
    /// Markup as produced by the engine
    Raw,
    /// JSON
    Json,
}

/// Print one outcome in the requested format.
pub fn write_outcome<W: Write>(
    writer: &mut W,
    outcome: &SuggestOutcome,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *writer, outcome)?;
            writeln!(writer)?;
        },
        OutputFormat::Raw => {
            writeln!(writer, "{}", outcome.default_description)?;
            for suggestion in &outcome.suggestions {
                writeln!(writer, "{}\t{}", suggestion.description, suggestion.content)?;
            }
        },
        OutputFormat::Text => {
            writeln!(writer, "{}", render(&outcome.default_description))?;
            for (i, suggestion) in outcome.suggestions.iter().enumerate() {
                writeln!(writer, "{:>3}. {}", i + 1, render(&suggestion.description))?;
                writeln!(writer, "     {}", suggestion.content.dimmed())?;
            }
        },
    }
    Ok(())
}

/// Presenter printing the best match to stderr, standing in for a desktop
/// notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPresenter;

impl Presenter for TerminalPresenter {
    fn present_best(&self, best: &BestMatch) {
        let mut line = format!("{} {}", "★".yellow(), best.title.bold());
        if !best.text.is_empty() {
            line.push_str(&format!(" ({})", best.text));
        }
        if !best.note.is_empty() {
            line.push_str(&format!(" {}", best.note.cyan()));
        }
        eprintln!("{line}");
        eprintln!("  {}", best.image.dimmed());
    }
}
