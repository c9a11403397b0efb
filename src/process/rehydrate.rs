//! Restoring sanitized substrings.

use crate::error::FormatError;
use crate::process::sanitize::PlaceholderTable;

/// Replace every placeholder token with its original text.
///
/// Tokens are substituted in ascending index order. Each must occur exactly
/// once in `text`; a missing or repeated token means the formatter lost or
/// duplicated part of the document, so the run fails instead of guessing.
pub fn rehydrate(text: &str, placeholders: &PlaceholderTable) -> Result<String, FormatError> {
    let mut out = text.to_string();
    for (index, (token, original)) in placeholders.iter().enumerate() {
        match out.matches(token.as_str()).count() {
            0 => return Err(FormatError::PlaceholderMissing { index }),
            1 => out = out.replacen(token.as_str(), original, 1),
            count => return Err(FormatError::PlaceholderDuplicated { index, count }),
        }
    }
    Ok(out)
}
