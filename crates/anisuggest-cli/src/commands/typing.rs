//! Simulated typing

use anisuggest_core::{Config, SuggestOutcome};
use anyhow::Result;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::debug;

use super::suggest::open_suggester;
use crate::output::{OutputFormat, write_outcome};

/// Every prefix of `text`, one per typed character.
fn keystrokes(text: &str) -> Vec<&str> {
    text.char_indices()
        .map(|(i, c)| &text[..i + c.len_utf8()])
        .collect()
}

/// Feed `text` one character at a time, `interval` apart, and print the
/// outcome of the final keystroke.
///
/// Earlier keystrokes are superseded the way they would be in an address
/// bar, so at most one outcome is printed.
///
/// # Errors
///
/// Returns an error if the cache cannot be opened, a keystroke task
/// panics, or output fails.
pub async fn execute(
    config: &Config,
    text: &str,
    interval: Duration,
    format: OutputFormat,
) -> Result<()> {
    let suggester = Arc::new(open_suggester(config, format).await?);
    let mut tasks = JoinSet::new();

    let prefixes = keystrokes(text);
    let last = prefixes.len().saturating_sub(1);
    for (i, prefix) in prefixes.into_iter().enumerate() {
        let suggester = Arc::clone(&suggester);
        let prefix = prefix.to_owned();
        tasks.spawn(async move { suggester.on_input_changed(&prefix).await });
        if i < last {
            tokio::time::sleep(interval).await;
        }
    }

    let mut latest: Option<SuggestOutcome> = None;
    while let Some(joined) = tasks.join_next().await {
        if let Some(outcome) = joined? {
            debug!("Keystroke {} finished as {:?}", outcome.token, outcome.origin);
            if outcome.token == suggester.current_token() {
                latest = Some(outcome);
            }
        }
    }

    if let Some(outcome) = latest {
        write_outcome(&mut io::stdout().lock(), &outcome, format)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keystrokes_are_char_prefixes() {
        assert_eq!(keystrokes("ab/c"), vec!["a", "ab", "ab/", "ab/c"]);
        assert_eq!(keystrokes("é!"), vec!["é", "é!"]);
        assert!(keystrokes("").is_empty());
    }
}
