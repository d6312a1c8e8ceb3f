//! Strips orchestration-internal call-log artifacts out of free text before
//! it is forwarded downstream.

use regex::Regex;
use std::sync::LazyLock;

/// Tool names used internally to hand work to a team member. Calls to these
/// never surface as tool-call output.
const DELEGATION_TOOLS: &[&str] = &[
    "delegate_task_to_member",
    "delegate_task_to_members",
    "transfer_task_to_member",
    "forward_task_to_member",
];

pub fn is_delegation_tool(name: &str) -> bool {
    let normalized = name.trim().to_ascii_lowercase().replace('-', "_");
    DELEGATION_TOOLS.contains(&normalized.as_str())
}

// Call-log lines the backend leaks into content, e.g.
// "delegate_task_to_member(research) completed in 0.01s."
static NOISE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(
            r"(?i)[\w-]*(?:delegate|transfer|forward)[\w-]*\s*\([^)\n]*\)\s*(?:completed|failed)(?:\s+in\s+\d+(?:\.\d+)?\s*s)?\.?",
        )
        .unwrap(),
        Regex::new(r"(?i)(?:delegating|transferring|forwarding)\s+task\s+to\s+member\b[^\n]*")
            .unwrap(),
    ]
});

/// Removes every call-log artifact. The pattern list is applied repeatedly
/// until a fixpoint, since artifacts may be nested or repeated.
pub fn strip_noise(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let mut next = current.clone();
        for pattern in NOISE_PATTERNS.iter() {
            next = pattern.replace_all(&next, "").into_owned();
        }
        if next == current {
            return current;
        }
        current = next;
    }
}

/// True for empty/whitespace-only text and for text that is nothing but
/// call-log artifacts. Content classified as wholly noise is never forwarded.
pub fn is_wholly_noise(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return true;
    }
    strip_noise(trimmed).trim().is_empty()
}
