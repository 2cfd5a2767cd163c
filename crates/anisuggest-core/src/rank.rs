//! Ranking and formatting of search endpoint records.
//!
//! Every record is weighted against the query text and the selected category,
//! sorted, and rendered into a [`Suggestion`] whose description uses the
//! `<url>`, `<match>` and `<dim>` markup of the input surface.
//!
//! Query words are located in a record name by wrapping each match in a pair
//! of sentinels (`\r` before, `\n` after). The weight is then read off the
//! marked name:
//!
//! | pattern                   | points per occurrence |
//! |---------------------------|-----------------------|
//! | category matches          | 50 (once)             |
//! | match at the start        | 10                    |
//! | match after a space       | 4                     |
//! | match after anything else | 1                     |

use crate::category::WILDCARD_CATEGORY;
use crate::escape::{escape, reescape};
use crate::types::{BestMatch, CookedData, RawItem, Suggestion};
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

const MATCH_START: char = '\r';
const MATCH_END: char = '\n';

/// Regex for record descriptions: `Character, Score: 9.1`
///
/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static DESCRIPTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?), (?:Score: )?([\d.]+)[^,]*$").unwrap());

/// Regex for the asset path of a thumbnail URL
///
/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static THUMBNAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?(:.+?)thumbs/\d+x\d+/(.+?)-thumb").unwrap());

/// Regex for a match glued to a preceding non-space character
///
/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static GLUED_MATCH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\S\r").unwrap());

/// Regex for runs of non-word characters, ASCII word class only
///
/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static NON_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9A-Za-z_]+").unwrap());

/// Category phrase and score pulled out of a record description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptionParts<'a> {
    /// Category phrase, e.g. `Character`.
    pub kind: &'a str,
    /// Numeric score as written, e.g. `9.1`.
    pub score: &'a str,
}

/// Best-effort parse of a loosely formatted description.
pub fn parse_description(desc: &str) -> Option<DescriptionParts<'_>> {
    let caps = DESCRIPTION_RE.captures(desc)?;
    Some(DescriptionParts {
        kind: caps.get(1)?.as_str(),
        score: caps.get(2)?.as_str(),
    })
}

/// Case-insensitive alternation of the words in `text`.
///
/// Runs of non-word characters separate words. Returns `None` when the text
/// has no words, in which case nothing is highlighted.
pub fn words_pattern(text: &str) -> Option<Regex> {
    let words: Vec<String> = NON_WORD_RE
        .split(text)
        .filter(|w| !w.is_empty())
        .map(regex::escape)
        .collect();
    if words.is_empty() {
        return None;
    }
    Regex::new(&format!("(?i){}", words.join("|"))).ok()
}

/// Wrap every match of `pattern` in `name` with the match sentinels.
pub fn mark(name: &str, pattern: Option<&Regex>) -> String {
    pattern.map_or_else(
        || name.to_string(),
        |re| {
            re.replace_all(name, format!("{MATCH_START}${{0}}{MATCH_END}"))
                .into_owned()
        },
    )
}

/// Weight of a marked name.
pub fn weight(marked: &str, in_category: bool) -> u32 {
    let at_start = u32::from(marked.starts_with(MATCH_START));
    let after_space = marked.matches(" \r").count();
    let glued = GLUED_MATCH_RE.find_iter(marked).count();
    let counted = u32::try_from(4 * after_space + glued).unwrap_or(u32::MAX);
    50 * u32::from(in_category) + 10 * at_start + counted
}

/// Whether a record of `kind` belongs to the selected `category`.
fn in_category(category: &str, kind: &str) -> bool {
    category == WILDCARD_CATEGORY || kind.to_lowercase().starts_with(category)
}

/// Full-resolution image URL for a thumbnail URL.
///
/// `https://host/images/65/thumbs/150x225/229669.jpg-thumb.jpg` becomes
/// `https://host/images/65/229669.jpg`. Anything else is returned unchanged.
pub fn full_image_url(picurl: &str) -> String {
    THUMBNAIL_RE.captures(picurl).map_or_else(
        || picurl.to_string(),
        |caps| format!("https{}{}", &caps[1], &caps[2]),
    )
}

/// The site-search line shown while a query is active.
pub fn site_search_line(text: &str) -> String {
    format!(
        "<dim>Search for <match>{}</match> on site.</dim>",
        escape(text)
    )
}

fn dim(s: &str) -> String {
    let s = s.trim();
    if s.is_empty() {
        String::new()
    } else {
        format!("<dim>{s}</dim>")
    }
}

fn resolve_link(site_url: &Url, link: &str) -> String {
    if link.starts_with("http") {
        return link.to_string();
    }
    site_url
        .join(link)
        .map_or_else(|_| format!("{site_url}{link}"), String::from)
}

/// What ranking needs to know about the current query.
#[derive(Debug, Clone, Copy)]
pub struct RankContext<'a> {
    /// Selected category name.
    pub category: &'a str,
    /// Sanitized query text.
    pub text: &'a str,
    /// Site-search line the category histogram is appended to.
    pub site_link: &'a str,
    /// Base for relative record links.
    pub site_url: &'a Url,
}

struct Ranked {
    item: RawItem,
    kind: String,
    score: String,
    marked: String,
    weight: u32,
}

impl Ranked {
    fn format(&self, site_url: &Url) -> Suggestion {
        let name = reescape(&self.marked)
            .replace(MATCH_START, "<match>")
            .replace(MATCH_END, "</match>");
        let kind = if self.kind.is_empty() {
            String::new()
        } else {
            format!(", {}", reescape(&self.kind))
        };
        Suggestion {
            content: resolve_link(site_url, &self.item.link),
            description: format!(
                "{}&#x20;<url>{}</url>{}",
                dim(&self.score),
                name.trim(),
                dim(&kind)
            ),
        }
    }
}

/// Rank and format one endpoint response.
pub fn cook(ctx: &RankContext<'_>, items: Vec<RawItem>) -> CookedData {
    let pattern = words_pattern(ctx.text);
    let mut histogram: Vec<(String, usize)> = Vec::new();

    let mut ranked: Vec<Ranked> = items
        .into_iter()
        .map(|item| {
            let (kind, score) = parse_description(&item.desc)
                .map_or_else(Default::default, |p| (p.kind.to_string(), p.score.to_string()));
            if !kind.is_empty() {
                match histogram.iter_mut().find(|(k, _)| *k == kind) {
                    Some((_, hits)) => *hits += 1,
                    None => histogram.push((kind.clone(), 1)),
                }
            }
            let marked = mark(&item.name, pattern.as_ref());
            Ranked {
                weight: weight(&marked, in_category(ctx.category, &kind)),
                item,
                kind,
                score,
                marked,
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.weight
            .cmp(&a.weight)
            .then_with(|| a.item.name.cmp(&b.item.name))
    });

    let best = ranked.first().map(|top| BestMatch {
        title: top.item.name.clone(),
        text: top.kind.clone(),
        note: top.score.clone(),
        image: full_image_url(&top.item.picurl),
    });

    let site_link = if histogram.is_empty() {
        ctx.site_link.to_string()
    } else {
        let hits: Vec<String> = histogram
            .iter()
            .map(|(kind, n)| format!("{} ({n})", escape(kind)))
            .collect();
        format!("{} Found in categories: {}", ctx.site_link, hits.join(", "))
    };

    CookedData {
        suggestions: ranked.iter().map(|r| r.format(ctx.site_url)).collect(),
        site_link,
        best,
    }
}
