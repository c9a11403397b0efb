//! Lifting laid-out synthetic markup back to template syntax.
//!
//! Text between synthetic tags is copied unchanged. Each synthetic tag is
//! rewritten to its logic tag; the whitespace the layout engine put between
//! attributes is kept between arguments, so a broken argument list stays
//! broken in the output.

use crate::config::Config;
use crate::error::FormatError;
use crate::layout::markup::ElementKind;
use crate::parser::ast::Strip;
use crate::parser::patterns::{ATTRIBUTE_RE, SYNTHETIC_TAG_RE};

/// Quote `value` with `quote`, escaping that quote character.
#[must_use]
pub fn quote_string(value: &str, quote: char) -> String {
    let escaped = value.replace(quote, &format!("\\{quote}"));
    format!("{quote}{escaped}{quote}")
}

/// Undo attribute escaping: `&quot;` first, then `&amp;`.
#[must_use]
pub fn decode_attribute(value: &str) -> String {
    value.replace("&quot;", "\"").replace("&amp;", "&")
}

struct Argument {
    /// Whitespace written before the attribute.
    space: String,
    name: String,
    value: String,
}

impl Argument {
    fn render(&self, quote: char) -> String {
        let value = decode_attribute(&self.value);
        if self.name == "bp" {
            return format!("as |{value}|");
        }
        let (key, value) = match self.name.strip_prefix("__") {
            Some(key) => (key, quote_string(&value, quote)),
            None => (self.name.trim_start_matches('_'), value),
        };
        if key.bytes().all(|b| b.is_ascii_digit()) {
            value
        } else {
            format!("{key}={value}")
        }
    }
}

/// Attributes of one synthetic tag, split into flags and arguments.
struct SyntheticTag {
    flags: Vec<(String, String)>,
    arguments: Vec<Argument>,
}

impl SyntheticTag {
    fn parse(list: &str) -> Self {
        let mut flags = Vec::new();
        let mut arguments = Vec::new();
        for caps in ATTRIBUTE_RE.captures_iter(list) {
            let name = caps[2].to_string();
            if name.starts_with('_') || name == "bp" {
                arguments.push(Argument {
                    space: caps[1].to_string(),
                    name,
                    value: caps[3].to_string(),
                });
            } else {
                flags.push((name, caps[3].to_string()));
            }
        }
        Self { flags, arguments }
    }

    fn flag(&self, name: &str) -> Option<&str> {
        self.flags
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    fn strip(&self, name: &str) -> Strip {
        self.flag(name).map(Strip::from_code).unwrap_or_default()
    }

    /// Path and arguments. The first argument gets no leading whitespace;
    /// the caller writes the sigil in front of it.
    fn call(&self, quote: char) -> String {
        let mut out = String::new();
        for (i, argument) in self.arguments.iter().enumerate() {
            if i > 0 {
                out.push_str(&argument.space);
            }
            out.push_str(&argument.render(quote));
        }
        out
    }

    /// Name repeated by the block's close tag.
    fn close_name(&self) -> String {
        let Some(path) = self
            .arguments
            .iter()
            .find(|a| a.name == "_0" || a.name == "__0")
        else {
            return String::new();
        };
        let path = decode_attribute(&path.value);
        match path.strip_prefix('(') {
            Some(inner) => inner
                .split(|c: char| c.is_whitespace() || c == ')')
                .next()
                .unwrap_or("")
                .to_string(),
            None => path,
        }
    }
}

fn tilde(on: bool) -> &'static str {
    if on {
        "~"
    } else {
        ""
    }
}

/// `{{` strip sigil body strip `}}`
fn logic_tag(strip: Strip, sigil: &str, body: &str) -> String {
    format!(
        "{{{{{}{sigil}{body}{}}}}}",
        tilde(strip.open),
        tilde(strip.close)
    )
}

struct Frame {
    kind: ElementKind,
    /// Text written when the element closes.
    close: String,
    /// An else marker continuing an `{{else if …}}` chain.
    chained: bool,
}

/// Rewrite synthetic markup as template text.
pub fn lift(text: &str, config: &Config) -> Result<String, FormatError> {
    let quote = config.quote_char();
    let mut out = String::with_capacity(text.len());
    let mut stack: Vec<Frame> = Vec::new();
    let mut last = 0;

    for caps in SYNTHETIC_TAG_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        out.push_str(&text[last..whole.start()]);
        last = whole.end();

        let name = &caps[2];
        let kind = ElementKind::from_name(name)
            .ok_or_else(|| FormatError::UnknownConstruct(format!("hbs:{name}")))?;

        if &caps[1] == "/" {
            let frame = stack
                .pop()
                .filter(|frame| frame.kind == kind)
                .ok_or_else(|| {
                    FormatError::Markup(format!(
                        "unexpected `</hbs:{name}>` at byte {}",
                        whole.start()
                    ))
                })?;
            out.push_str(&frame.close);
            continue;
        }

        let tag = SyntheticTag::parse(&caps[3]);
        let strip = tag.strip("s");
        let call = tag.call(quote);
        let mut frame = Frame {
            kind,
            close: String::new(),
            chained: false,
        };

        match kind {
            ElementKind::Mustache => out.push_str(&logic_tag(strip, "", &call)),
            ElementKind::Partial => out.push_str(&logic_tag(strip, "> ", &call)),
            ElementKind::Raw => {
                out.push_str(&format!(
                    "{{{{{}{{{call}}}{}}}}}",
                    tilde(strip.open),
                    tilde(strip.close)
                ));
            }
            ElementKind::Comment => {
                let long = tag.flag("f") != Some("short");
                out.push_str("{{");
                out.push_str(tilde(strip.open));
                out.push_str(if long { "!--" } else { "!" });
                frame.close = format!(
                    "{}{}}}}}",
                    if long { "--" } else { "" },
                    tilde(strip.close)
                );
            }
            ElementKind::Else => {
                if tag.flag("ch").is_some() {
                    frame.chained = true;
                } else {
                    out.push_str(&logic_tag(strip, "else", ""));
                }
            }
            ElementKind::Block => {
                let in_chain = stack.last().is_some_and(|f| f.chained);
                if in_chain {
                    out.push_str(&logic_tag(strip, "else ", &call));
                } else {
                    let sigil = if tag.flag("i").is_some() { "^" } else { "#" };
                    out.push_str(&logic_tag(strip, sigil, &call));
                    let sigil = format!("/{}", tag.close_name());
                    frame.close = logic_tag(tag.strip("sc"), &sigil, "");
                }
            }
            ElementKind::PartialBlock | ElementKind::DecoratorBlock => {
                let sigil = if kind == ElementKind::PartialBlock {
                    "#> "
                } else {
                    "#*"
                };
                out.push_str(&logic_tag(strip, sigil, &call));
                let sigil = format!("/{}", tag.close_name());
                frame.close = logic_tag(tag.strip("sc"), &sigil, "");
            }
        }

        if &caps[4] != "/" {
            stack.push(frame);
        }
    }

    if let Some(frame) = stack.last() {
        return Err(FormatError::Markup(format!(
            "unclosed `<hbs:{}>`",
            frame.kind.name()
        )));
    }
    out.push_str(&text[last..]);
    Ok(out)
}
