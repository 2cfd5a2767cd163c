//! Rendering of suggestion markup.

use anisuggest_core::unescape;
use colored::{ColoredString, Colorize};

/// A run of text sharing one set of styles.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Segment {
    /// Decoded text.
    pub text: String,
    /// Inside `<url>`.
    pub url: bool,
    /// Inside `<match>`.
    pub matched: bool,
    /// Inside `<dim>`.
    pub dim: bool,
}

#[derive(Clone, Copy, Default)]
struct Styles {
    url: usize,
    matched: usize,
    dim: usize,
}

impl Styles {
    fn apply(&mut self, tag: &str) -> bool {
        let (name, closing) = tag
            .strip_prefix('/')
            .map_or((tag, false), |name| (name, true));
        let depth = match name {
            "url" => &mut self.url,
            "match" => &mut self.matched,
            "dim" => &mut self.dim,
            _ => return false,
        };
        if closing {
            *depth = depth.saturating_sub(1);
        } else {
            *depth += 1;
        }
        true
    }
}

fn decode(raw: &str) -> String {
    unescape(&raw.replace("&#x20;", " ")).into_owned()
}

fn flush(pending: &mut String, styles: Styles, out: &mut Vec<Segment>) {
    if !pending.is_empty() {
        out.push(Segment {
            text: decode(pending),
            url: styles.url > 0,
            matched: styles.matched > 0,
            dim: styles.dim > 0,
        });
        pending.clear();
    }
}

/// Split markup into styled segments.
///
/// Unknown tags and stray `<` are kept as text.
pub fn segments(markup: &str) -> Vec<Segment> {
    let mut out = Vec::new();
    let mut styles = Styles::default();
    let mut pending = String::new();
    let mut rest = markup;

    while let Some(open) = rest.find('<') {
        pending.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('>') {
            Some(close) if Styles::default().apply(&after[..close]) => {
                flush(&mut pending, styles, &mut out);
                styles.apply(&after[..close]);
                rest = &after[close + 1..];
            },
            _ => {
                pending.push('<');
                rest = after;
            },
        }
    }
    pending.push_str(rest);
    flush(&mut pending, styles, &mut out);
    out
}

fn style(segment: &Segment) -> ColoredString {
    let mut styled = segment.text.normal();
    if segment.url {
        styled = styled.cyan();
    }
    if segment.matched {
        styled = styled.bold();
    }
    if segment.dim {
        styled = styled.dimmed();
    }
    styled
}

/// Render markup as styled terminal text.
pub fn render(markup: &str) -> String {
    segments(markup).iter().map(|s| style(s).to_string()).collect()
}
