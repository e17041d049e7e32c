//! Best-effort structural repair of malformed JSON payloads.
//!
//! Editors, partial writes, and copy-paste accidents tend to leave garbage
//! before or after an otherwise intact document. Repair trims the text to
//! the outermost well-formed object; anything the trim cannot save (e.g. a
//! truncated file) goes down the backup-and-fallback path instead.

/// Returns the slice spanning the outermost brace-balanced object, or `None`
/// when no complete object exists in the text.
///
/// Braces inside JSON strings (including escaped quotes) are ignored.
pub(crate) fn trim_to_outermost_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}
