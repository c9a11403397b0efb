//! Tag parameter tokenizer.
//!
//! Splits the interior of a logic tag (everything between the sigil and the
//! closing braces) into positional values and `key=value` hash pairs.
//!
//! Rules:
//! - Single and double quotes both delimit a value; the quote characters
//!   themselves are not part of the value
//! - Inside quotes, a backslash escapes the delimiting quote; any other
//!   backslash is kept as written
//! - Whitespace and `=` only separate tokens outside quotes
//! - `( … )` sub-expressions, `[ … ]` segments and `| … |` block parameter
//!   lists are always one token
//!
//! The tokenizer never fails. Malformed input (an unterminated quote, a key
//! without a value) still produces tokens, and the tree builder reports it.

use std::ops::Range;

/// A value as written in the tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    /// Unquoted token, reproduced verbatim.
    Bare(String),
    /// Quoted string; holds the unescaped content.
    Quoted(String),
}

impl ParamValue {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            ParamValue::Bare(s) | ParamValue::Quoted(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    Positional(ParamValue),
    Hash(String, ParamValue),
}

/// A token together with its byte range in the tokenized string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamToken {
    pub param: Param,
    pub span: Range<usize>,
}

#[derive(Default)]
struct TokenBuilder {
    key: Option<String>,
    buf: String,
    quoted: bool,
    start: Option<usize>,
}

impl TokenBuilder {
    fn mark(&mut self, at: usize) {
        if self.start.is_none() {
            self.start = Some(at);
        }
    }

    fn is_empty(&self) -> bool {
        self.start.is_none()
    }

    fn value_is_empty(&self) -> bool {
        self.buf.is_empty() && !self.quoted
    }

    fn flush(&mut self, end: usize, out: &mut Vec<ParamToken>) {
        let Some(start) = self.start.take() else {
            return;
        };
        let text = std::mem::take(&mut self.buf);
        let value = if self.quoted {
            ParamValue::Quoted(text)
        } else {
            ParamValue::Bare(text)
        };
        let param = match self.key.take() {
            Some(key) => Param::Hash(key, value),
            None => Param::Positional(value),
        };
        self.quoted = false;
        out.push(ParamToken {
            param,
            span: start..end,
        });
    }
}

/// Tokenize a tag's parameter string.
#[must_use]
pub fn parse_params(input: &str) -> Vec<ParamToken> {
    let mut tokens = Vec::new();
    let mut current = TokenBuilder::default();
    let mut chars = input.char_indices().peekable();

    // Quote character of an open quoted value
    let mut quote: Option<char> = None;
    // Nesting state of verbatim groups
    let mut depth = 0usize;
    let mut raw_quote: Option<char> = None;
    let mut in_bracket = false;
    let mut in_pipes = false;

    while let Some((i, c)) = chars.next() {
        if let Some(q) = quote {
            if c == '\\' && chars.peek().is_some_and(|&(_, n)| n == q) {
                if let Some((_, escaped)) = chars.next() {
                    current.buf.push(escaped);
                }
            } else if c == q {
                quote = None;
                current.quoted = true;
            } else {
                current.buf.push(c);
            }
            continue;
        }

        if depth > 0 {
            current.buf.push(c);
            if let Some(q) = raw_quote {
                if c == '\\' {
                    if let Some(&(_, n)) = chars.peek() {
                        if n == q {
                            current.buf.push(n);
                            chars.next();
                        }
                    }
                } else if c == q {
                    raw_quote = None;
                }
            } else {
                match c {
                    '"' | '\'' => raw_quote = Some(c),
                    '(' => depth += 1,
                    ')' => depth -= 1,
                    _ => {}
                }
            }
            continue;
        }

        if in_bracket {
            current.buf.push(c);
            in_bracket = c != ']';
            continue;
        }

        if in_pipes {
            current.buf.push(c);
            in_pipes = c != '|';
            continue;
        }

        match c {
            ' ' | '\t' | '\n' | '\r' => {
                current.flush(i, &mut tokens);
            }
            '"' | '\'' if current.value_is_empty() => {
                current.mark(i);
                quote = Some(c);
            }
            '=' if current.key.is_none() && !current.buf.is_empty() && !current.quoted => {
                current.key = Some(std::mem::take(&mut current.buf));
            }
            '(' if current.value_is_empty() => {
                current.mark(i);
                current.buf.push(c);
                depth = 1;
            }
            '|' if current.is_empty() => {
                current.mark(i);
                current.buf.push(c);
                in_pipes = true;
            }
            '[' => {
                current.mark(i);
                current.buf.push(c);
                in_bracket = true;
            }
            _ => {
                current.mark(i);
                current.buf.push(c);
            }
        }
    }

    // Input ended inside a quote or group: keep what is there as a bare token
    if let Some(q) = quote {
        let content = std::mem::take(&mut current.buf);
        current.buf = format!("{q}{content}");
        current.quoted = false;
    }
    current.flush(input.len(), &mut tokens);
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(input: &str) -> Vec<Param> {
        parse_params(input).into_iter().map(|t| t.param).collect()
    }

    fn bare(s: &str) -> Param {
        Param::Positional(ParamValue::Bare(s.to_string()))
    }

    fn quoted(s: &str) -> Param {
        Param::Positional(ParamValue::Quoted(s.to_string()))
    }

    fn pair(k: &str, v: ParamValue) -> Param {
        Param::Hash(k.to_string(), v)
    }

    #[test]
    fn test_parses_key_value_pair() {
        assert_eq!(
            params(r#"foo="bar""#),
            vec![pair("foo", ParamValue::Quoted("bar".into()))]
        );
    }

    #[test]
    fn test_parses_multiple_pairs() {
        assert_eq!(
            params(r#"foo="bar" baz="qux""#),
            vec![
                pair("foo", ParamValue::Quoted("bar".into())),
                pair("baz", ParamValue::Quoted("qux".into())),
            ]
        );
    }

    #[test]
    fn test_single_quotes_are_normalized() {
        let tokens = params("foo='bar'");
        assert_eq!(tokens, vec![pair("foo", ParamValue::Quoted("bar".into()))]);
        let Param::Hash(_, value) = &tokens[0] else {
            panic!("expected a hash pair");
        };
        assert_eq!(value.as_str(), "bar");
    }

    #[test]
    fn test_opposite_quote_is_content() {
        let tokens = params(r#"foo='b"a"r'"#);
        let Param::Hash(key, value) = &tokens[0] else {
            panic!("expected a hash pair");
        };
        assert_eq!(key, "foo");
        assert_eq!(value, &ParamValue::Quoted(r#"b"a"r"#.to_string()));
    }

    #[test]
    fn test_backslash_escapes_delimiting_quote() {
        assert_eq!(params(r#""some\"value""#), vec![quoted(r#"some"value"#)]);
        assert_eq!(params(r"'it\'s'"), vec![quoted("it's")]);
    }

    #[test]
    fn test_other_backslashes_are_kept() {
        assert_eq!(params(r#""a\nb""#), vec![quoted(r"a\nb")]);
    }

    #[test]
    fn test_bare_values_keep_slashes_and_dots() {
        assert_eq!(
            params("../foo/bar.baz key=this.that"),
            vec![
                bare("../foo/bar.baz"),
                pair("key", ParamValue::Bare("this.that".into())),
            ]
        );
    }

    #[test]
    fn test_collapses_whitespace_and_newlines() {
        assert_eq!(
            params("test\n    key1=value1\n\t key2=value2  "),
            vec![
                bare("test"),
                pair("key1", ParamValue::Bare("value1".into())),
                pair("key2", ParamValue::Bare("value2".into())),
            ]
        );
    }

    #[test]
    fn test_subexpression_is_one_token() {
        assert_eq!(
            params(r#"helper (sub a "b c" (inner d)) x"#),
            vec![bare("helper"), bare(r#"(sub a "b c" (inner d))"#), bare("x")]
        );
    }

    #[test]
    fn test_subexpression_as_hash_value() {
        assert_eq!(
            params("k=(concat a 'x)')"),
            vec![pair("k", ParamValue::Bare("(concat a 'x)')".into()))]
        );
    }

    #[test]
    fn test_bracket_segment_and_block_params() {
        assert_eq!(
            params("each [weird key] as |item index|"),
            vec![
                bare("each"),
                bare("[weird key]"),
                bare("as"),
                bare("|item index|"),
            ]
        );
    }

    #[test]
    fn test_equals_inside_quotes_is_content() {
        assert_eq!(params(r#""a=b""#), vec![quoted("a=b")]);
        assert_eq!(
            params("k=a=b"),
            vec![pair("k", ParamValue::Bare("a=b".into()))]
        );
    }

    #[test]
    fn test_empty_quoted_value() {
        assert_eq!(
            params(r#"k="""#),
            vec![pair("k", ParamValue::Quoted(String::new()))]
        );
    }

    #[test]
    fn test_unterminated_quote_flushes_as_bare() {
        assert_eq!(params(r#"x "abc"#), vec![bare("x"), bare("\"abc")]);
    }

    #[test]
    fn test_key_without_value() {
        assert_eq!(
            params("k="),
            vec![pair("k", ParamValue::Bare(String::new()))]
        );
    }

    #[test]
    fn test_token_spans() {
        let tokens = parse_params("if  a.b k='v'");
        let spans: Vec<_> = tokens.iter().map(|t| t.span.clone()).collect();
        assert_eq!(spans, vec![0..2, 4..7, 8..13]);
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_params("").is_empty());
        assert!(parse_params("   \n ").is_empty());
    }
}
