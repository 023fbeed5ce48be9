//! HTML escaping and allow-listing for backend-supplied text.
//!
//! Text shown in panels may carry a small markdown subset (`**bold**`,
//! `*italic*`, `` `code` ``) and newlines. [`sanitize`] escapes every angle
//! bracket first and only then introduces the allow-listed tags, so the only
//! markup that survives is markup this module produced.

#[cfg(test)]
#[path = "sanitize_test.rs"]
mod sanitize_test;

use std::sync::LazyLock;

use regex::Regex;

/// Tags that may appear in sanitized text.
pub const ALLOWED_TAGS: [&str; 7] = ["<br />", "<code>", "</code>", "<b>", "</b>", "<em>", "</em>"];

/// Line-break marker used in sanitized text.
pub const LINE_BREAK_TAG: &str = "<br />";

static BOLD: LazyLock<Regex> = LazyLock::new(|| pattern(r"\*\*(.+?)\*\*"));
static ITALIC: LazyLock<Regex> = LazyLock::new(|| pattern(r"\*(.+?)\*"));
static BACKTICKS: LazyLock<Regex> = LazyLock::new(|| pattern(r"`([^`]*)`"));
static ALLOWED: LazyLock<Regex> = LazyLock::new(|| pattern(r"<br />|</?code>|</?b>|</?em>"));

/// Compile a pattern that is a literal in this crate.
pub(crate) fn pattern(source: &'static str) -> Regex {
    Regex::new(source).expect("static regex pattern must compile")
}

/// Replace `<` and `>` with their HTML entities.
#[must_use]
pub fn escape_brackets(value: &str) -> String {
    value.replace('<', "&lt;").replace('>', "&gt;")
}

/// Undo [`escape_brackets`].
#[must_use]
pub fn unescape_brackets(value: &str) -> String {
    value.replace("&lt;", "<").replace("&gt;", ">")
}

#[must_use]
pub fn convert_bold(value: &str) -> String {
    BOLD.replace_all(value, "<b>${1}</b>").into_owned()
}

#[must_use]
pub fn convert_italic(value: &str) -> String {
    ITALIC.replace_all(value, "<em>${1}</em>").into_owned()
}

#[must_use]
pub fn convert_backticks(value: &str) -> String {
    BACKTICKS.replace_all(value, "<code>${1}</code>").into_owned()
}

#[must_use]
pub fn newlines_to_br(value: &str) -> String {
    value.replace('\n', LINE_BREAK_TAG)
}

/// Convert raw text into display-safe markup.
///
/// Order matters: brackets are escaped before any tag is introduced.
#[must_use]
pub fn sanitize(value: &str) -> String {
    let value = escape_brackets(value);
    let value = convert_bold(&value);
    let value = convert_italic(&value);
    let value = newlines_to_br(&value);
    convert_backticks(&value)
}

/// Sanitize each value of a list.
#[must_use]
pub fn sanitize_all<S: AsRef<str>>(values: &[S]) -> Vec<String> {
    values.iter().map(|v| sanitize(v.as_ref())).collect()
}

/// True when `value` contains no angle brackets besides the allow-listed tags.
///
/// Tags are stripped in a single pass, so text joined by removing one tag
/// is never itself read as a tag.
#[must_use]
pub fn is_sane(value: &str) -> bool {
    let stripped = ALLOWED.replace_all(value, "");
    !stripped.contains(['<', '>'])
}

/// Normalize an endpoint path: lowercase, no whitespace, leading `/`.
#[must_use]
pub fn sanitize_url(url: &str) -> String {
    let compact: String = url
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();
    if compact.starts_with('/') {
        compact
    } else {
        format!("/{compact}")
    }
}
