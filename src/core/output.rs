//! Bounded rendering helpers for diagnostics.
//!
//! Verdict buckets and error summaries must stay bounded no matter how large a
//! task descriptor or registry gets.

/// Render one diagnostic on a single line of at most `max_chars` characters
/// (plus a `...` marker when cut).
///
/// Schema violations and registry issues may embed newlines from the
/// offending document; the error summary needs them flat.
pub fn diagnostic_line(input: &str, max_chars: usize) -> String {
    let mut line = String::with_capacity(input.len().min(max_chars));
    for word in input.split_whitespace() {
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    match line.char_indices().nth(max_chars) {
        Some((cut, _)) => {
            line.truncate(cut);
            line.push_str("...");
            line
        }
        None => line,
    }
}

/// Summarize a list of diagnostics as `first | second (+N more)`.
pub fn summarize<S: AsRef<str>>(messages: &[S], max_items: usize, max_chars: usize) -> String {
    let (shown, hidden) = messages.split_at(messages.len().min(max_items));
    let mut summary = shown
        .iter()
        .map(|m| diagnostic_line(m.as_ref(), max_chars))
        .collect::<Vec<_>>()
        .join(" | ");
    if !hidden.is_empty() {
        summary.push_str(&format!(" (+{} more)", hidden.len()));
    }
    summary
}

/// Append `item` unless an equal entry is already present. Keeps first-seen order.
pub fn push_unique(list: &mut Vec<String>, item: impl Into<String>) {
    let item = item.into();
    if !list.iter().any(|existing| *existing == item) {
        list.push(item);
    }
}

/// Truncate `list` to `cap` entries, returning how many were dropped.
pub fn cap_list(list: &mut Vec<String>, cap: usize) -> usize {
    if list.len() <= cap {
        return 0;
    }
    let dropped = list.len() - cap;
    list.truncate(cap);
    dropped
}
