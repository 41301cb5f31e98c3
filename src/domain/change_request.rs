//! Change-request id extraction from commit subjects.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

/// How a matched number is rendered.
#[derive(Debug, Clone, Copy)]
enum Style {
    Bang,
    Hash,
    Pr,
}

/// Tried in order; the first match wins.
static PATTERNS: Lazy<Vec<(Regex, Style)>> = Lazy::new(|| {
    [
        (r"merge request !(\d+)", Style::Bang),
        (r"!(\d+)", Style::Bang),
        (r"pull request #(\d+)", Style::Hash),
        (r"#(\d+)", Style::Hash),
        (r"PR (\d+)", Style::Pr),
    ]
    .into_iter()
    .filter_map(|(pattern, style)| {
        RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .ok()
            .map(|re| (re, style))
    })
    .collect()
});

/// Extract `!N`, `#N` or `PR N` from a merge commit subject.
pub fn extract_change_request_id(subject: &str) -> Option<String> {
    PATTERNS.iter().find_map(|(re, style)| {
        let number = re.captures(subject)?.get(1)?.as_str();
        Some(match style {
            Style::Bang => format!("!{}", number),
            Style::Hash => format!("#{}", number),
            Style::Pr => format!("PR {}", number),
        })
    })
}

/// Numeric part of an extracted id, used for link building.
pub fn change_request_number(id: &str) -> Option<&str> {
    let digits = id.trim_start_matches(|c: char| !c.is_ascii_digit());
    (!digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())).then_some(digits)
}
