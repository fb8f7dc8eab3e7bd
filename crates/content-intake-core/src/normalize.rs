//! Canonical text representation used for duplicate detection.
//!
//! [`normalize`] lowercases, strips markup remnants left behind by
//! extractors (HTML tags and comments, entities, zero-width and control
//! characters), collapses whitespace runs to single spaces and trims.
//!
//! Markup removal is repeated until nothing changes, so decoded entities
//! that form new tags (`&lt;p&gt;`) are removed too. That loop is what
//! makes the function idempotent.

use std::sync::LazyLock;

use regex::{Captures, Regex};

static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid comment regex"));

// A tag must start with a letter, `/` or `!` so prose like "a < b" survives.
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?[a-z!][^<>]*>").expect("valid tag regex"));

static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[0-9]{1,7}|#x[0-9a-f]{1,6}|[a-z]{2,8});").expect("valid entity regex")
});

const INVISIBLE: [char; 6] = [
    '\u{200b}', '\u{200c}', '\u{200d}', '\u{2060}', '\u{feff}', '\u{ad}',
];

/// Produces the normalized form of `text`.
pub fn normalize(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let next = strip_pass(&current);
        if next == current {
            break;
        }
        current = next;
    }
    collapse_whitespace(&current)
}

/// Collapses every run of whitespace into one space and trims both ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_pass(text: &str) -> String {
    let lowered = text.to_lowercase();
    let no_comments = COMMENT_RE.replace_all(&lowered, " ");
    let no_tags = TAG_RE.replace_all(&no_comments, " ");
    let decoded = ENTITY_RE.replace_all(&no_tags, |caps: &Captures| decode_entity(caps));
    decoded
        .chars()
        .filter(|c| !INVISIBLE.contains(c) && !(c.is_control() && !c.is_whitespace()))
        .collect()
}

fn decode_entity(caps: &Captures) -> String {
    let body = &caps[1];
    let decoded = if let Some(hex) = body.strip_prefix("#x") {
        u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
    } else if let Some(dec) = body.strip_prefix('#') {
        dec.parse::<u32>().ok().and_then(char::from_u32)
    } else {
        match body {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some(' '),
            "ndash" => Some('–'),
            "mdash" => Some('—'),
            "hellip" => Some('…'),
            "lsquo" | "rsquo" => Some('\''),
            "ldquo" | "rdquo" => Some('"'),
            _ => None,
        }
    };
    match decoded {
        Some(c) => c.to_string(),
        None => caps[0].to_string(),
    }
}
