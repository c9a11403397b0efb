//! A small pretty-printing document algebra.
//!
//! The printer builds a [`Doc`] tree and [`render`] walks it with an explicit
//! work stack. Unlike a classic Wadler printer, text may contain newlines:
//! indentation is written lazily, right before the first character of each
//! non-empty line, so verbatim content is re-indented without introducing
//! whitespace-only lines. [`Doc::Verbatim`] text is the exception: lines it
//! starts are never indented.

/// Line-breaking behaviour of a [`Doc::Group`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupMode {
    /// Every soft line in the group is a space.
    Flat,
    /// Every soft line in the group is a newline.
    Break,
    /// Flat when the group fits in the remaining width, broken otherwise.
    Fit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Doc {
    Nil,
    Text(String),
    /// Text whose embedded newlines are written without indentation.
    Verbatim(String),
    /// Space when flat, newline when broken.
    Line,
    /// Always a newline.
    HardLine,
    /// Contents one indentation level deeper.
    Indent(Box<Doc>),
    Concat(Vec<Doc>),
    Group { contents: Box<Doc>, mode: GroupMode },
}

impl Doc {
    pub fn text(text: impl Into<String>) -> Self {
        Doc::Text(text.into())
    }

    /// Concatenate, flattening nested concatenations and dropping `Nil`.
    #[must_use]
    pub fn concat(items: Vec<Doc>) -> Self {
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Doc::Nil => {}
                Doc::Concat(inner) => out.extend(inner),
                other => out.push(other),
            }
        }
        match out.len() {
            0 => Doc::Nil,
            1 => out.pop().unwrap_or(Doc::Nil),
            _ => Doc::Concat(out),
        }
    }

    #[must_use]
    pub fn indent(self) -> Self {
        Doc::Indent(Box::new(self))
    }

    #[must_use]
    pub fn group(self, mode: GroupMode) -> Self {
        Doc::Group {
            contents: Box::new(self),
            mode,
        }
    }
}

/// Rendering parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Text written once per indentation level.
    pub indent_unit: String,
    /// Target line width used by [`GroupMode::Fit`].
    pub width: usize,
    /// Display width of a tab when measuring columns.
    pub tab_width: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Flat,
    Break,
}

struct Writer<'a> {
    options: &'a RenderOptions,
    out: String,
    column: usize,
    at_line_start: bool,
}

impl Writer<'_> {
    fn newline(&mut self) {
        self.out.push('\n');
        self.column = 0;
        self.at_line_start = true;
    }

    fn write(&mut self, text: &str, level: usize) {
        self.write_with(text, level, true);
    }

    /// Write `text`; with `reindent` unset, lines after its first newline
    /// start at column 0.
    fn write_with(&mut self, text: &str, level: usize, reindent: bool) {
        for c in text.chars() {
            if c == '\n' {
                self.newline();
                self.at_line_start = reindent;
                continue;
            }
            if self.at_line_start {
                for _ in 0..level {
                    self.out.push_str(&self.options.indent_unit);
                    self.column += text_width(&self.options.indent_unit, self.options.tab_width);
                }
                self.at_line_start = false;
            }
            self.out.push(c);
            self.column += if c == '\t' { self.options.tab_width } else { 1 };
        }
    }
}

fn text_width(text: &str, tab_width: usize) -> usize {
    text.chars()
        .map(|c| if c == '\t' { tab_width } else { 1 })
        .sum()
}

/// Render a document to a string.
#[must_use]
pub fn render(doc: &Doc, options: &RenderOptions) -> String {
    let mut writer = Writer {
        options,
        out: String::new(),
        column: 0,
        at_line_start: true,
    };
    // Work stack: (indent level, mode, doc)
    let mut stack: Vec<(usize, Mode, &Doc)> = vec![(0, Mode::Break, doc)];

    while let Some((level, mode, doc)) = stack.pop() {
        match doc {
            Doc::Nil => {}
            Doc::Text(text) => writer.write(text, level),
            Doc::Verbatim(text) => writer.write_with(text, level, false),
            Doc::Line => match mode {
                Mode::Flat => writer.write(" ", level),
                Mode::Break => writer.newline(),
            },
            Doc::HardLine => writer.newline(),
            Doc::Indent(inner) => stack.push((level + 1, mode, inner)),
            Doc::Concat(items) => {
                for item in items.iter().rev() {
                    stack.push((level, mode, item));
                }
            }
            Doc::Group { contents, mode: group_mode } => {
                let mode = match group_mode {
                    GroupMode::Flat => Mode::Flat,
                    GroupMode::Break => Mode::Break,
                    GroupMode::Fit => {
                        let remaining = options.width.saturating_sub(writer.column);
                        if fits(contents, remaining, options.tab_width) {
                            Mode::Flat
                        } else {
                            Mode::Break
                        }
                    }
                };
                stack.push((level, mode, contents));
            }
        }
    }

    writer.out
}

/// Whether `doc` laid out flat reaches its first newline within `remaining` columns.
fn fits(doc: &Doc, remaining: usize, tab_width: usize) -> bool {
    let mut remaining = remaining;
    let mut stack = vec![doc];
    while let Some(doc) = stack.pop() {
        match doc {
            Doc::Nil => {}
            Doc::Text(text) | Doc::Verbatim(text) => {
                let line = text.split('\n').next().unwrap_or("");
                let width = text_width(line, tab_width);
                if width > remaining {
                    return false;
                }
                if line.len() < text.len() {
                    return true;
                }
                remaining -= width;
            }
            Doc::Line => {
                if remaining == 0 {
                    return false;
                }
                remaining -= 1;
            }
            Doc::HardLine => return true,
            Doc::Indent(inner) => stack.push(inner),
            Doc::Concat(items) => stack.extend(items.iter().rev()),
            Doc::Group { contents, .. } => stack.push(contents),
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> RenderOptions {
        RenderOptions {
            indent_unit: "    ".to_string(),
            width: 20,
            tab_width: 4,
        }
    }

    fn attrs() -> Doc {
        Doc::concat(vec![
            Doc::text("<x a=\"1\""),
            Doc::concat(vec![Doc::Line, Doc::text("b=\"2\"")]).indent(),
            Doc::text(" />"),
        ])
    }

    #[test]
    fn test_flat_group() {
        let doc = attrs().group(GroupMode::Flat);
        assert_eq!(render(&doc, &options()), "<x a=\"1\" b=\"2\" />");
    }

    #[test]
    fn test_broken_group() {
        let doc = attrs().group(GroupMode::Break);
        assert_eq!(render(&doc, &options()), "<x a=\"1\"\n    b=\"2\" />");
    }

    #[test]
    fn test_fit_group() {
        let doc = attrs().group(GroupMode::Fit);
        assert_eq!(render(&doc, &options()), "<x a=\"1\" b=\"2\" />");
        let narrow = RenderOptions {
            width: 10,
            ..options()
        };
        assert_eq!(render(&doc, &narrow), "<x a=\"1\"\n    b=\"2\" />");
    }

    #[test]
    fn test_text_is_indented_lazily() {
        let doc = Doc::concat(vec![
            Doc::text("<a>"),
            Doc::concat(vec![Doc::HardLine, Doc::text("one\n\ntwo")]).indent(),
            Doc::HardLine,
            Doc::text("</a>"),
        ]);
        assert_eq!(render(&doc, &options()), "<a>\n    one\n\n    two\n</a>");
    }

    #[test]
    fn test_tab_indentation() {
        let tabs = RenderOptions {
            indent_unit: "\t".to_string(),
            ..options()
        };
        let doc = Doc::concat(vec![Doc::HardLine, Doc::text("x")]).indent();
        assert_eq!(render(&doc, &tabs), "\n\tx");
    }

    #[test]
    fn test_concat_flattens() {
        let doc = Doc::concat(vec![Doc::Nil, Doc::concat(vec![Doc::text("a")]), Doc::Nil]);
        assert_eq!(doc, Doc::text("a"));
    }

    #[test]
    fn test_verbatim_lines_are_not_indented() {
        let doc = Doc::concat(vec![
            Doc::HardLine,
            Doc::Verbatim("t \"a\n  b\"".to_string()),
            Doc::text(" x"),
        ])
        .indent();
        assert_eq!(render(&doc, &options()), "\n    t \"a\n  b\" x");
    }
}
