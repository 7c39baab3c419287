//! File name sanitizing.

/// Replaces characters that are illegal or troublesome in file names with `-`.
pub fn escape_filename(value: &str) -> String {
    value
        .chars()
        .map(|c| if is_illegal(c) { '-' } else { c })
        .collect()
}

fn is_illegal(c: char) -> bool {
    matches!(c, '/' | '\\' | '?' | '%' | '*' | ':' | '|' | '"' | '<' | '>' | '\x7f') || c < ' '
}
