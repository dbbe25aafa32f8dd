//! Bare URL detection for "extended autolinks" (`https://…`, `http://…`, `www.…`).

use std::ops::Range;

use url::Url;

/// A bare URL found in a text run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FoundLink {
    /// Byte range of the link text inside the scanned string.
    pub range: Range<usize>,
    /// Destination, with `http://` prepended for `www.` links.
    pub href: String,
}

/// Finds bare URLs in `text`.
///
/// A candidate starts at a word boundary with `http://`, `https://` or `www.` and runs until
/// whitespace or `<`. Trailing sentence punctuation and unbalanced closing parentheses are not
/// part of the link. Candidates that do not parse as a URL with a host are skipped.
pub fn find_links(text: &str) -> Vec<FoundLink> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < text.len() {
        let rest = &text[i..];
        let at_boundary = text[..i]
            .chars()
            .next_back()
            .is_none_or(|c| c.is_whitespace() || matches!(c, '(' | '[' | '"' | '\'' | '*' | '_'));
        let prefix_len = if !at_boundary {
            None
        } else if starts_with_ignore_ascii_case(rest, "https://") {
            Some(8)
        } else if starts_with_ignore_ascii_case(rest, "http://") {
            Some(7)
        } else if starts_with_ignore_ascii_case(rest, "www.") {
            Some(4)
        } else {
            None
        };

        let Some(prefix_len) = prefix_len else {
            i += rest.chars().next().map_or(1, char::len_utf8);
            continue;
        };

        let raw_end = rest
            .find(|c: char| c.is_whitespace() || c == '<')
            .unwrap_or(rest.len());
        let len = trim_link_end(&rest[..raw_end]);
        if len <= prefix_len {
            i += raw_end.max(1);
            continue;
        }

        let candidate = &rest[..len];
        let href = if starts_with_ignore_ascii_case(candidate, "www.") {
            format!("http://{candidate}")
        } else {
            candidate.to_string()
        };
        if Url::parse(&href).is_ok_and(|u| u.host_str().is_some_and(|h| h.contains('.') || h == "localhost")) {
            out.push(FoundLink {
                range: i..i + len,
                href,
            });
        }
        i += raw_end.max(1);
    }
    out
}

fn starts_with_ignore_ascii_case(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len()
        && s.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

/// Length of `candidate` once trailing punctuation and unmatched `)` are dropped.
fn trim_link_end(candidate: &str) -> usize {
    let mut end = candidate.len();
    loop {
        let Some(last) = candidate[..end].chars().next_back() else {
            return 0;
        };
        match last {
            '.' | ',' | ':' | ';' | '!' | '?' | '"' | '\'' | '*' | '_' | '~' => end -= 1,
            ')' => {
                let open = candidate[..end].matches('(').count();
                let close = candidate[..end].matches(')').count();
                if close > open {
                    end -= 1;
                } else {
                    return end;
                }
            }
            _ => return end,
        }
    }
}
