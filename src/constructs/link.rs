//! Internal `[[Page|Label]]` and external `[scheme://… label]` links.

use phf::phf_set;

use crate::ast::{AstList, Node};
use crate::context::Context;
use crate::dispatch::Stop;
use crate::error::{DiagnosticKind, Failure};
use crate::registry::ConstructKind;

/// Protocols that can begin an external link, lowercased.
static PROTOCOLS: phf::Set<&str> = phf_set! {
    "//",
    "ftp://",
    "ftps://",
    "http://",
    "https://",
    "irc://",
    "ircs://",
    "mailto:",
    "news:",
    "nntp://",
    "telnet://",
};

/// Parses `[[target]]` or `[[target|text]]`. With no `|`, the text is a copy
/// of the target, so consumers can always read children as `[target, text]`.
pub(crate) fn wikilink(ctx: &mut Context<'_>) -> Result<AstList, Failure> {
    let start = ctx.scanner_ref().offset();
    if !ctx.scanner().eat("[[") {
        return Err(Failure::Mismatch);
    }
    ctx.push(ConstructKind::Link, start);

    // Targets cannot span lines.
    let target = ctx.dispatch(&Stop::Chars("|]\n"))?;
    let text = if ctx.scanner().eat("|") {
        ctx.dispatch(&Stop::Seq("]]"))?
    } else {
        target.clone()
    };

    if !ctx.scanner().eat("]]") {
        ctx.pop(ConstructKind::Link)?;
        return Err(ctx.malformed(DiagnosticKind::Unterminated(ConstructKind::Link), start));
    }
    ctx.pop(ConstructKind::Link)?;

    let mut node = Node::new("link");
    node.children.push_node(Node::with_children("target", target));
    node.children.push_node(Node::with_children("text", text));
    Ok(node.into())
}

/// Parses `[url]` or `[url label]`. A `[` not followed by a known protocol
/// is not a construct.
pub(crate) fn extlink(ctx: &mut Context<'_>) -> Result<AstList, Failure> {
    let start = ctx.scanner_ref().offset();
    if !ctx.scanner().eat("[") {
        return Err(Failure::Mismatch);
    }
    if !PROTOCOLS
        .iter()
        .any(|protocol| ctx.scanner_ref().starts_with_ignore_case(protocol))
    {
        return Err(Failure::Mismatch);
    }
    ctx.push(ConstructKind::ExternalLink, start);

    // The URL itself is literal text, never nested markup.
    let url = ctx
        .scanner()
        .bump_while(|c| !c.is_whitespace() && c != ']' && c != '|');
    let url = url.to_owned();
    ctx.scanner().skip_hspace();
    let mut text = ctx.dispatch(&Stop::Chars("]\n"))?;
    text.trim();

    if !ctx.scanner().eat("]") {
        ctx.pop(ConstructKind::ExternalLink)?;
        return Err(ctx.malformed(
            DiagnosticKind::Unterminated(ConstructKind::ExternalLink),
            start,
        ));
    }
    ctx.pop(ConstructKind::ExternalLink)?;

    let mut target = AstList::new();
    target.push_text(&url);
    let mut node = Node::new("extlink");
    node.children.push_node(Node::with_children("target", target));
    node.children.push_node(Node::with_children("text", text));
    Ok(node.into())
}
