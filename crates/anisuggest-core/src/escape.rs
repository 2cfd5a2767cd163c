//! Markup escaping for suggestion descriptions.
//!
//! Only the five markup-significant characters are handled, each mapped to
//! its named entity. Both directions borrow the input untouched when none of
//! the significant characters is present.

use memchr::{memchr2, memchr3};
use std::borrow::Cow;

const ENTITIES: [(char, &str); 5] = [
    ('&', "&amp;"),
    ('"', "&quot;"),
    ('\'', "&apos;"),
    ('<', "&lt;"),
    ('>', "&gt;"),
];

fn has_markup(s: &str) -> bool {
    let bytes = s.as_bytes();
    memchr3(b'&', b'"', b'\'', bytes).is_some() || memchr2(b'<', b'>', bytes).is_some()
}

/// Replace `& " ' < >` with their named entities.
pub fn escape(s: &str) -> Cow<'_, str> {
    if !has_markup(s) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 16);
    for c in s.chars() {
        match ENTITIES.iter().find(|(ch, _)| *ch == c) {
            Some((_, entity)) => out.push_str(entity),
            None => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Exact inverse of [`escape`]; any other `&` sequence is kept literally.
pub fn unescape(s: &str) -> Cow<'_, str> {
    if !has_markup(s) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        match ENTITIES.iter().find(|(_, entity)| tail.starts_with(entity)) {
            Some((ch, entity)) => {
                out.push(*ch);
                rest = &tail[entity.len()..];
            },
            None => {
                out.push('&');
                rest = &tail[1..];
            },
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// Escape a string that may already mix literal and escaped markup.
pub fn reescape(s: &str) -> String {
    escape(&unescape(s)).into_owned()
}
