//! Everything opened by `<`: comments, `<nowiki>`, `<ref>`, inline HTML,
//! inclusion control, registered extension tags, and the generic passthrough
//! for unknown tags.

use memchr::memmem;
use phf::phf_set;

use crate::ast::{AstList, Node};
use crate::codemap::Span;
use crate::context::Context;
use crate::dispatch::Stop;
use crate::error::{DiagnosticKind, Failure};
use crate::registry::{ConstructKind, TagInvocation};

/// HTML5 tags allowed in wiki markup.
static HTML5_TAGS: phf::Set<&str> = phf_set! {
    // Explicit `<a>` tags are forbidden.
    "abbr",
    "bdi", "bdo", "big", "blockquote",
    "caption", "center", "cite", "code",
    "data", "dd", "del", "dfn", "div", "dl", "dt",
    "em",
    "font",
    "h1", "h2", "h3", "h4", "h5", "h6", "hr",
    "ins",
    "kbd",
    "li",
    "mark",
    "ol",
    "p", "pre",
    "q",
    "rb", "rp", "rt", "rtc", "ruby",
    "s", "samp", "small", "span", "strike", "strong", "sub", "sup",
    "table", "td", "th", "time", "tr", "tt",
    "ul",
    "var",
    "wbr",
};

/// Tags with no content and no close tag.
static VOID_TAGS: phf::Set<&str> = phf_set! {
    "hr", "wbr",
};

/// Parses the construct at a `<` marker.
///
/// A `<` that does not form a well-shaped tag is a mismatch, not an error,
/// so prose like `a < b` stays literal without any diagnostic.
pub(crate) fn tag(ctx: &mut Context<'_>) -> Result<AstList, Failure> {
    if ctx.scanner_ref().starts_with("<!--") {
        return comment(ctx);
    }

    let start = ctx.scanner_ref().offset();
    if !ctx.scanner().eat("<") {
        return Err(Failure::Mismatch);
    }
    // A bare close tag has nothing to close; it is handled as literal text.
    if ctx.scanner_ref().peek() == Some('/') {
        return Err(Failure::Mismatch);
    }
    let name = tag_name(ctx).ok_or(Failure::Mismatch)?.to_owned();

    let mut attrs = Vec::new();
    let self_closing = loop {
        ctx.scanner().skip_whitespace();
        match ctx.scanner_ref().peek() {
            None => return Err(Failure::Mismatch),
            Some('>') => {
                ctx.scanner().eat(">");
                break false;
            }
            Some('/') => {
                ctx.scanner().bump();
                ctx.scanner().skip_whitespace();
                if !ctx.scanner().eat(">") {
                    return Err(Failure::Mismatch);
                }
                break true;
            }
            Some(_) => attrs.push(attribute(ctx).ok_or(Failure::Mismatch)?),
        }
    };

    ctx.push(ConstructKind::Tag, start);
    let result = dispatch_tag(ctx, start, &name, attrs, self_closing);
    ctx.pop(ConstructKind::Tag)?;
    result
}

/// Builds the node for a parsed start tag.
fn dispatch_tag(
    ctx: &mut Context<'_>,
    start: usize,
    name: &str,
    attrs: Vec<(String, Option<String>)>,
    self_closing: bool,
) -> Result<AstList, Failure> {
    let lower = name.to_ascii_lowercase();

    // Registered extension tags win over everything built in.
    if let Some(handler) = ctx.registry().tag_handler(&lower) {
        let handler = handler.clone();
        let body = if self_closing {
            None
        } else {
            Some(raw_body(ctx, start, name)?)
        };
        let node = handler(&TagInvocation {
            name,
            attrs: &attrs,
            body,
        });
        return Ok(node.into());
    }

    match lower.as_str() {
        "nowiki" => {
            let mut node = Node::new("nowiki");
            if !self_closing {
                node.children.push_text(raw_body(ctx, start, name)?);
            }
            Ok(node.into())
        }
        "ref" => {
            let mut node = Node::new("ref");
            set_attrs(&mut node, attrs);
            if !self_closing {
                node.children = ctx.dispatch(&Stop::CloseTag("ref"))?;
                if !ctx.scanner().eat_close_tag("ref") {
                    return Err(missing_close(ctx, start, name));
                }
            }
            Ok(node.into())
        }
        "b" | "i" | "u" => {
            let styled = match lower.as_str() {
                "b" => "bold",
                "i" => "italic",
                _ => "underline",
            };
            let mut node = Node::new(styled);
            if !self_closing {
                node.children = ctx.dispatch(&Stop::CloseTag(&lower))?;
                if !ctx.scanner().eat_close_tag(&lower) {
                    return Err(missing_close(ctx, start, name));
                }
            }
            Ok(node.into())
        }
        "br" => Ok(Node::new("linebreak").into()),
        "noinclude" | "includeonly" | "onlyinclude" => {
            let mut node = Node::new(lower.clone());
            if !self_closing {
                node.children = ctx.dispatch(&Stop::CloseTag(&lower))?;
                if !ctx.scanner().eat_close_tag(&lower) {
                    return Err(missing_close(ctx, start, name));
                }
            }
            Ok(node.into())
        }
        tag if HTML5_TAGS.contains(tag) => {
            let mut node = Node::new("html").with_attr("tag", lower.clone());
            set_attrs(&mut node, attrs);
            if !self_closing && !VOID_TAGS.contains(tag) {
                // Speculative: with no close tag in sight the element keeps
                // its attributes but loses its content, staying an empty
                // inline element rather than swallowing the document.
                let saved = ctx.scanner_ref().checkpoint();
                let children = ctx.dispatch(&Stop::CloseTag(&lower))?;
                if ctx.scanner().eat_close_tag(&lower) {
                    node.children = children;
                } else {
                    ctx.scanner().rewind(saved);
                }
            }
            Ok(node.into())
        }
        _ => {
            // Unknown tags pass through with their body raw, so downstream
            // extensions can pick them up unmangled.
            let mut node = Node::new("tag").with_attr("tag", name);
            set_attrs(&mut node, attrs);
            if !self_closing {
                node.children.push_text(raw_body(ctx, start, name)?);
            }
            Ok(node.into())
        }
    }
}

/// Parses `<!-- … -->`. Decorative dash runs and padding inside the markers
/// trim away. An unclosed comment runs to the end of input with a
/// diagnostic.
fn comment(ctx: &mut Context<'_>) -> Result<AstList, Failure> {
    let start = ctx.scanner_ref().offset();
    ctx.scanner().eat("<!--");

    let rest = ctx.scanner_ref().rest();
    let (body, closed) = match memmem::find(rest.as_bytes(), b"-->") {
        Some(end) => (&rest[..end], true),
        None => (rest, false),
    };
    let consumed = body.len() + if closed { "-->".len() } else { 0 };
    let body = body
        .trim_start_matches('-')
        .trim_start()
        .trim_end_matches(['-', ' ']);
    let body = body.to_owned();
    ctx.scanner().eat(&rest[..consumed]);

    if !closed {
        let span = Span::new(start, ctx.scanner_ref().offset());
        ctx.diagnose(DiagnosticKind::UnclosedComment, span)?;
    }

    let mut node = Node::new("comment");
    node.children.push_text(&body);
    Ok(node.into())
}

/// Parses a tag name: an optional `:` prefix, a letter, then letters,
/// digits, `-`, `_`, or `:`.
fn tag_name<'a>(ctx: &mut Context<'a>) -> Option<&'a str> {
    if !ctx.scanner_ref().peek().is_some_and(|c| c.is_ascii_alphabetic() || c == ':') {
        return None;
    }
    let name = ctx
        .scanner()
        .bump_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':'));
    let stripped = name.strip_prefix(':').unwrap_or(name);
    if stripped.is_empty() || !stripped.chars().next().is_some_and(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    Some(stripped)
}

/// Parses one `name`, `name=value`, `name="value"`, or `name='value'`
/// attribute inside a start tag.
fn attribute(ctx: &mut Context<'_>) -> Option<(String, Option<String>)> {
    let name = ctx
        .scanner()
        .bump_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':'));
    if name.is_empty() {
        return None;
    }
    let name = name.to_owned();

    let saved = ctx.scanner_ref().checkpoint();
    ctx.scanner().skip_whitespace();
    if !ctx.scanner().eat("=") {
        ctx.scanner().rewind(saved);
        return Some((name, None));
    }
    ctx.scanner().skip_whitespace();

    let value = if ctx.scanner().eat("\"") {
        let value = ctx.scanner().bump_while(|c| c != '"');
        ctx.scanner().eat("\"").then_some(value)?
    } else if ctx.scanner().eat("'") {
        let value = ctx.scanner().bump_while(|c| c != '\'');
        ctx.scanner().eat("'").then_some(value)?
    } else {
        ctx.scanner()
            .bump_while(|c| !c.is_whitespace() && !matches!(c, '>' | '/'))
    };
    Some((name, Some(value.to_owned())))
}

/// Consumes the raw text up to `</name>`, and the close tag itself.
fn raw_body<'a>(ctx: &mut Context<'a>, start: usize, name: &str) -> Result<&'a str, Failure> {
    let scanner = ctx.scanner_ref();
    let Some((end, after)) = scanner.find_close_tag(name) else {
        return Err(missing_close(ctx, start, name));
    };
    let body = &scanner.source()[scanner.offset()..end];
    *ctx.scanner() = after;
    Ok(body)
}

/// The failure for an open tag whose close tag never arrives.
fn missing_close(ctx: &Context<'_>, start: usize, name: &str) -> Failure {
    ctx.malformed(
        DiagnosticKind::MissingCloseTag {
            tag: name.to_owned(),
        },
        start,
    )
}

/// Moves parsed start-tag attributes onto a node.
fn set_attrs(node: &mut Node, attrs: Vec<(String, Option<String>)>) {
    for (name, value) in attrs {
        node.set_attr(name, value.unwrap_or_default());
    }
}
