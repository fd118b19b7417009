//! String helpers shared by the renderer and block nodes
//!
//! This module provides the markup escaper and the line indentation
//! helpers. Helpers return `Cow` so inputs that need no change
//! are passed through without allocating.

use std::borrow::Cow;
use std::fmt::Write;

/// Whether a UTF-16 code unit may appear unescaped in output
///
/// The safe set is space, `!` and the printable range `#`..=`~`, except
/// for `<`, `>` and `&`.
#[inline]
fn is_safe_unit(unit: u16) -> bool {
    match unit {
        0x3C | 0x3E | 0x26 => false,
        0x20 | 0x21 => true,
        0x23..=0x7E => true,
        _ => false,
    }
}

/// Escape text for embedding into markup
///
/// Every UTF-16 code unit outside the safe set is replaced by a decimal
/// numeric character reference. Characters outside the Basic Multilingual
/// Plane are encoded as surrogate pairs, so they produce one reference per
/// surrogate: `"🚀"` becomes `"&#55357;&#56960;"`.
///
/// # Examples
///
/// ```rust,ignore
/// use block_template::escape;
///
/// assert_eq!(escape(r#"<img src="test.jpg">"#), "&#60;img src=&#34;test.jpg&#34;&#62;");
/// ```
pub fn escape(text: &str) -> String {
    escape_cow(text).into_owned()
}

/// Escape text, borrowing the input when nothing needs escaping
pub fn escape_cow(text: &str) -> Cow<'_, str> {
    if text.encode_utf16().all(is_safe_unit) {
        return Cow::Borrowed(text);
    }

    let mut result = String::with_capacity(text.len() + text.len() / 2);
    for unit in text.encode_utf16() {
        if is_safe_unit(unit) {
            // Safe units are ASCII
            result.push(unit as u8 as char);
        } else {
            let _ = write!(result, "&#{};", unit);
        }
    }
    Cow::Owned(result)
}

/// Prefix every line of `text`, the first line included
///
/// An empty input yields just the indent, and a trailing newline gets an
/// indented (empty) line after it.
pub fn indent_lines(text: &str, indent: &str) -> String {
    if indent.is_empty() {
        return text.to_string();
    }
    let mut result = String::with_capacity(text.len() + indent.len() * 2);
    result.push_str(indent);
    for ch in text.chars() {
        result.push(ch);
        if ch == '\n' {
            result.push_str(indent);
        }
    }
    result
}

/// Indent every line after the first of a multi-line value
///
/// Used for placeholders that sit on an indented line: the first line
/// already follows the template's own indentation.
pub fn reindent_continuation<'a>(text: &'a str, indent: &str) -> Cow<'a, str> {
    if indent.is_empty() || !text.contains('\n') {
        return Cow::Borrowed(text);
    }
    Cow::Owned(text.replace('\n', &format!("\n{}", indent)))
}

/// The run of spaces and tabs that ends at byte offset `at`
///
/// Empty when `at` is not directly preceded by whitespace.
pub fn indent_before(content: &str, at: usize) -> &str {
    let before = &content[..at];
    let start = before
        .trim_end_matches(|c: char| c == ' ' || c == '\t')
        .len();
    &before[start..]
}
