//! Final-content cleanup and paragraph chunking.
//!
//! Content that arrives in one block at completion time is cleaned up and
//! re-emitted as multiple ordered deltas so the renderer gets a progressive
//! reveal instead of one large flush.

use regex::Regex;
use std::sync::LazyLock;

use super::sanitize::{is_wholly_noise, strip_noise};

static EXCESS_NEWLINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());
static TRAILING_LINE_WS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)[ \t]+$").unwrap());
static HEADING_RUN_ON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([^\n])\n(#{1,6} )").unwrap());

/// Cleans one block of final text. Returns `None` when nothing meaningful
/// remains. The step order matters: noise stripping runs first so the
/// whitespace it leaves behind is collapsed with everything else.
pub fn clean_final_content(raw: &str) -> Option<String> {
    let stripped = strip_noise(raw);
    if is_wholly_noise(&stripped) {
        return None;
    }

    let text = EXCESS_NEWLINES.replace_all(&stripped, "\n\n").into_owned();
    let text = TRAILING_LINE_WS.replace_all(&text, "").into_owned();
    let text = drop_repeated_lines(&text);
    // Duplicated section headers sometimes arrive glued to the previous
    // paragraph; give every heading its own blank line, then re-collapse.
    let text = HEADING_RUN_ON.replace_all(&text, "$1\n\n$2").into_owned();
    let text = EXCESS_NEWLINES.replace_all(&text, "\n\n").into_owned();

    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Removes a line that exactly duplicates its immediately preceding line.
fn drop_repeated_lines(text: &str) -> String {
    let mut kept: Vec<&str> = Vec::new();
    for line in text.split('\n') {
        if let Some(prev) = kept.last() {
            if !line.trim().is_empty() && *prev == line {
                continue;
            }
        }
        kept.push(line);
    }
    kept.join("\n")
}

/// Splits cleaned text at paragraph breaks, keeping each delimiter attached
/// to the fragment before it, so concatenating the fragments in order
/// reconstructs the input byte-for-byte.
pub fn split_paragraphs(text: &str) -> Vec<String> {
    let mut fragments = Vec::new();
    let mut rest = text;
    while let Some(idx) = rest.find("\n\n") {
        fragments.push(rest[..idx + 2].to_string());
        rest = &rest[idx + 2..];
    }
    if !rest.is_empty() {
        fragments.push(rest.to_string());
    }
    fragments
}
