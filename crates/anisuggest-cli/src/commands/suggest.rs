//! Single input change

use anisuggest_core::{Config, Suggester};
use anyhow::Result;
use std::io;
use std::sync::Arc;
use tracing::debug;

use crate::output::{OutputFormat, TerminalPresenter, write_outcome};

/// Build the engine used by the interactive commands.
///
/// The best-match presenter only runs for styled output.
pub(super) async fn open_suggester(config: &Config, format: OutputFormat) -> Result<Suggester> {
    let suggester = Suggester::open(config).await?;
    Ok(if format == OutputFormat::Text {
        suggester.with_presenter(Arc::new(TerminalPresenter))
    } else {
        suggester
    })
}

/// Show the suggestions for one input change.
///
/// # Errors
///
/// Returns an error if the cache cannot be opened or output fails.
pub async fn execute(config: &Config, text: &str, format: OutputFormat) -> Result<()> {
    let suggester = open_suggester(config, format).await?;
    debug!("Suggest for {:?}", text);

    match suggester.on_input_changed(text).await {
        Some(outcome) => write_outcome(&mut io::stdout().lock(), &outcome, format),
        None => Ok(()),
    }
}
