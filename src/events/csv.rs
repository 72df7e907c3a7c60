//! Minimal delimited-line splitter.
//!
//! A `"` toggles quoted mode, `""` inside a quoted field is a literal quote,
//! and the delimiter only separates fields outside quotes. Field text is
//! returned untrimmed.

pub const DEFAULT_DELIMITER: char = ',';

pub fn split_line(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '"' {
            if in_quotes && chars.peek() == Some(&'"') {
                current.push('"');
                chars.next();
            } else {
                in_quotes = !in_quotes;
            }
        } else if c == delimiter && !in_quotes {
            fields.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }

    fields.push(current);
    fields
}

/// Trim whitespace and strip at most one pair of surrounding quotes.
pub fn clean_field(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(trimmed)
}
