//! Front matter detection.
//!
//! A document may open with a YAML block fenced by `---` lines. The block is
//! formatted separately from the body because its indentation is meaningful.

/// A document split at its front matter fences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrontMatter<'a> {
    /// Text between the fences, including its final newline.
    pub content: &'a str,
    /// Everything after the closing fence line.
    pub body: &'a str,
}

pub const FENCE: &str = "---";

/// Split off the front matter, if the document has any.
///
/// The opening fence must be the very first line; the block ends at the next
/// line that is exactly `---`. Without a closing fence there is no front matter.
#[must_use]
pub fn split_front_matter(text: &str) -> Option<FrontMatter<'_>> {
    let rest = text.strip_prefix("---\n")?;
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.strip_suffix('\n').unwrap_or(line) == FENCE {
            return Some(FrontMatter {
                content: &rest[..offset],
                body: &rest[offset + line.len()..],
            });
        }
        offset += line.len();
    }
    None
}

/// Reassemble a document from formatted front matter and body.
#[must_use]
pub fn join_front_matter(content: &str, body: &str) -> String {
    let mut out = String::with_capacity(content.len() + body.len() + 8);
    out.push_str(FENCE);
    out.push('\n');
    out.push_str(content);
    if !content.is_empty() && !content.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(FENCE);
    out.push('\n');
    out.push_str(body);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splits_front_matter() {
        let text = "---\nproducts:\n    limit: {{n}}\n---\n<p>body</p>";
        let fm = split_front_matter(text).unwrap();
        assert_eq!(fm.content, "products:\n    limit: {{n}}\n");
        assert_eq!(fm.body, "<p>body</p>");
    }

    #[test]
    fn test_closing_fence_at_end_of_file() {
        let fm = split_front_matter("---\na: 1\n---").unwrap();
        assert_eq!(fm.content, "a: 1\n");
        assert_eq!(fm.body, "");
    }

    #[test]
    fn test_empty_front_matter() {
        let fm = split_front_matter("---\n---\nbody").unwrap();
        assert_eq!(fm.content, "");
        assert_eq!(fm.body, "body");
    }

    #[test]
    fn test_no_front_matter() {
        assert!(split_front_matter("<p>---</p>").is_none());
        assert!(split_front_matter("---\nunterminated: true\n").is_none());
        assert!(split_front_matter("--- \na\n---\n").is_none());
        assert!(split_front_matter("\n---\na\n---\n").is_none());
    }

    #[test]
    fn test_fence_must_be_whole_line() {
        let fm = split_front_matter("---\na: ---\n----\n---\nb").unwrap();
        assert_eq!(fm.content, "a: ---\n----\n");
        assert_eq!(fm.body, "b");
    }

    #[test]
    fn test_join_front_matter() {
        assert_eq!(join_front_matter("a: 1\n", "body\n"), "---\na: 1\n---\nbody\n");
        assert_eq!(join_front_matter("", "body"), "---\n---\nbody");
    }
}
