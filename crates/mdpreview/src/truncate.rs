//! Read-more truncation.
//!
//! Lengths are counted in `char`s so a cut never lands inside a UTF-8 sequence.

use std::borrow::Cow;

/// Appended to collapsed content.
pub const ELLIPSIS: &str = "...";

/// Whether and where content is cut while collapsed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TruncationPolicy {
    pub enabled: bool,
    pub limit: usize,
}

impl TruncationPolicy {
    pub fn new(enabled: bool, limit: usize) -> Self {
        Self { enabled, limit }
    }

    /// `true` when `content` is longer than the limit and truncation is on.
    pub fn has_overflow(&self, content: &str) -> bool {
        self.enabled && content.chars().count() > self.limit
    }

    /// The string handed to the viewer.
    pub fn display_text<'a>(&self, content: &'a str, expanded: bool) -> Cow<'a, str> {
        if expanded || !self.has_overflow(content) {
            return Cow::Borrowed(content);
        }
        let mut out = String::with_capacity(content.len().min(self.limit * 4) + ELLIPSIS.len());
        out.push_str(truncate_chars(content, self.limit));
        out.push_str(ELLIPSIS);
        Cow::Owned(out)
    }
}

/// The first `limit` chars of `s`.
pub fn truncate_chars(s: &str, limit: usize) -> &str {
    match s.char_indices().nth(limit) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
