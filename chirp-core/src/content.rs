//! Message body sanitization and validation.
//!
//! Bodies are stored as plain text only: [`strip_markup`] removes every
//! HTML-style tag and decodes the common entities before a message is
//! allowed into the store. A body that is empty after sanitization never
//! enters the store at all.

/// Maximum allowed sanitized body size in bytes (64 KB).
pub const MAX_BODY_SIZE: usize = 64 * 1024;

/// Error returned when a message body fails sanitization.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContentError {
    /// The body is empty after markup stripping.
    #[error("message body is empty after sanitization")]
    Empty,
    /// The sanitized body exceeds the maximum allowed size.
    #[error("message body too large ({size} bytes, max {max} bytes)")]
    TooLarge {
        /// Actual size of the sanitized body in bytes.
        size: usize,
        /// Maximum allowed size in bytes.
        max: usize,
    },
}

/// Strips all markup from `raw`, returning trimmed plain text.
///
/// Tags are removed wholesale (`<b>hi</b>` becomes `hi`); a `<` only opens
/// a tag when followed by a letter, `/`, or `!`, so inequalities like
/// `1 < 2` survive intact. The common entities (`&amp;`, `&lt;`, `&gt;`,
/// `&quot;`, `&#39;`, `&apos;`, `&nbsp;`) are decoded; unrecognized
/// entities pass through unchanged.
#[must_use]
pub fn strip_markup(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    let mut in_tag = false;

    while let Some(c) = chars.next() {
        if in_tag {
            if c == '>' {
                in_tag = false;
            }
            continue;
        }
        match c {
            '<' if chars
                .peek()
                .is_some_and(|&next| next.is_ascii_alphabetic() || next == '/' || next == '!') =>
            {
                in_tag = true;
            }
            '&' => decode_entity(&mut chars, &mut out),
            _ => out.push(c),
        }
    }

    out.trim().to_string()
}

/// Longest recognized entity name, including the trailing `;` (`&quot;`).
const MAX_ENTITY_LEN: usize = 6;

/// Decodes one entity following a consumed `&`, appending the result to `out`.
///
/// Consumes up to the closing `;`. If no known entity matches within the
/// length bound, everything consumed is emitted verbatim.
fn decode_entity(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, out: &mut String) {
    let mut name = String::new();
    while name.len() < MAX_ENTITY_LEN {
        match chars.peek() {
            Some(&c) if c == ';' => {
                chars.next();
                let decoded = match name.as_str() {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "#39" | "apos" => Some('\''),
                    "nbsp" => Some(' '),
                    _ => None,
                };
                if let Some(c) = decoded {
                    out.push(c);
                } else {
                    out.push('&');
                    out.push_str(&name);
                    out.push(';');
                }
                return;
            }
            Some(&c) if c.is_ascii_alphanumeric() || c == '#' => {
                name.push(c);
                chars.next();
            }
            _ => break,
        }
    }
    // Not an entity — emit what was consumed.
    out.push('&');
    out.push_str(&name);
}

/// Sanitizes a raw message body for storage.
///
/// Strips markup, then rejects bodies that are empty or oversized.
///
/// # Errors
///
/// Returns [`ContentError::Empty`] if nothing remains after stripping, or
/// [`ContentError::TooLarge`] if the sanitized body exceeds
/// [`MAX_BODY_SIZE`].
pub fn sanitize_body(raw: &str) -> Result<String, ContentError> {
    let body = strip_markup(raw);
    if body.is_empty() {
        return Err(ContentError::Empty);
    }
    if body.len() > MAX_BODY_SIZE {
        return Err(ContentError::TooLarge {
            size: body.len(),
            max: MAX_BODY_SIZE,
        });
    }
    Ok(body)
}
