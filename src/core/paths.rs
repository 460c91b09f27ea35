//! Repository-relative path canonicalization and matching.
//!
//! Everything the gate compares is first pushed through [`normalize`], which
//! rejects anything that could escape the repository root. Rejection is
//! `None`, and callers treat `None` as a failed check.

use crate::core::error::GateError;
use regex::Regex;

/// Literal allow-list entry granting every path.
pub const ALLOW_ALL: &str = "**";

/// Canonicalize a repository-relative path.
///
/// Trims, converts `\` to `/`, strips leading `./`, collapses empty and `.`
/// segments and drops a trailing `/`. Returns `None` for empty input, any
/// `..` segment, absolute paths and drive-letter prefixes.
pub fn normalize(path: &str) -> Option<String> {
    let unified = path.trim().replace('\\', "/");
    if unified.is_empty() || unified.starts_with('/') || has_drive_prefix(&unified) {
        return None;
    }

    let mut rest = unified.as_str();
    while let Some(stripped) = rest.strip_prefix("./") {
        rest = stripped;
    }

    let mut segments = Vec::new();
    for segment in rest.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return None,
            s => segments.push(s),
        }
    }
    if segments.is_empty() {
        return None;
    }
    Some(segments.join("/"))
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Prefix allow-list check.
///
/// `**` anywhere in the list allows everything. Otherwise the normalized path
/// must equal an entry or sit beneath it (`entry/...`). An empty list denies.
pub fn is_allowed_by_prefix<S: AsRef<str>>(path: &str, allow_list: &[S]) -> bool {
    if allow_list.iter().any(|e| e.as_ref().trim() == ALLOW_ALL) {
        return true;
    }
    let Some(path) = normalize(path) else {
        return false;
    };
    allow_list
        .iter()
        .filter_map(|entry| normalize(entry.as_ref()))
        .any(|entry| path == entry || is_beneath(&path, &entry))
}

fn is_beneath(path: &str, dir: &str) -> bool {
    path.strip_prefix(dir)
        .is_some_and(|rest| rest.starts_with('/'))
}

/// Anchored matcher compiled from a restricted glob.
#[derive(Debug, Clone)]
pub struct GlobMatcher {
    pattern: String,
    regex: Regex,
}

impl GlobMatcher {
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Match a path; the candidate is normalized first and unsafe paths never match.
    pub fn is_match(&self, path: &str) -> bool {
        normalize(path).is_some_and(|p| self.regex.is_match(&p))
    }
}

/// Compile a restricted glob into an anchored matcher.
///
/// - `**` matches any suffix, separators included
/// - a leading `**/` matches zero or more leading segments
/// - `*` matches within one segment, `?` one non-separator character
/// - a trailing `/` covers the entry itself and everything beneath it
///
/// Everything else is escaped. The pattern goes through [`normalize`] like
/// every candidate does, so a pattern `normalize` rejects (absolute, drive
/// prefix, `..`) could never match and is a [`GateError::GlobError`].
pub fn glob_to_matcher(pattern: &str) -> Result<GlobMatcher, GateError> {
    let unified = pattern.trim().replace('\\', "/");
    let Some(normalized) = normalize(&unified) else {
        return Err(GateError::GlobError {
            pattern: pattern.to_string(),
            message: "pattern cannot match any repository-relative path".to_string(),
        });
    };
    let source = glob_to_regex(&normalized, unified.ends_with('/'));
    let regex = Regex::new(&source).map_err(|e| GateError::GlobError {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })?;
    Ok(GlobMatcher {
        pattern: pattern.to_string(),
        regex,
    })
}

/// Translate an already-normalized glob.
fn glob_to_regex(normalized: &str, dir_scope: bool) -> String {
    let mut rest = normalized;
    let mut out = String::with_capacity(rest.len() * 2 + 16);
    out.push('^');
    if let Some(tail) = rest.strip_prefix("**/") {
        out.push_str("(?:.*/)?");
        rest = tail;
    }

    let chars: Vec<char> = rest.chars().collect();
    let mut i = 0;
    let mut buf = [0u8; 4];
    while i < chars.len() {
        match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') => {
                out.push_str(".*");
                i += 2;
            }
            '*' => {
                out.push_str("[^/]*");
                i += 1;
            }
            '?' => {
                out.push_str("[^/]");
                i += 1;
            }
            c => {
                out.push_str(&regex::escape(c.encode_utf8(&mut buf)));
                i += 1;
            }
        }
    }
    if dir_scope {
        out.push_str("(?:/.*)?");
    }
    out.push('$');
    out
}
