//! Everything opened by `{{`: templates, `{{{parameters}}}`, and
//! `{{#parser functions}}`.
//!
//! The three forms share one trigger and are disambiguated by speculative
//! parsing: a `{{{` run is first tried as a parameter and falls back to a
//! template with a nested construct in name position (`{{{{foo}}}}` is a
//! template whose name is the template `{{foo}}`).

use crate::ast::{AstList, Node};
use crate::context::Context;
use crate::dispatch::Stop;
use crate::error::{DiagnosticKind, Failure};
use crate::registry::ConstructKind;
use crate::visit;

/// What may nest inside a name position.
#[derive(Clone, Copy)]
enum Nested {
    /// Only `{{{parameters}}}`, as in parameter names and argument keys.
    ParameterOnly,
    /// Any braced construct, as in template names.
    Braces,
}

/// Parses the construct at a `{{` marker.
pub(crate) fn braces(ctx: &mut Context<'_>) -> Result<AstList, Failure> {
    if !ctx.scanner_ref().starts_with("{{") {
        return Err(Failure::Mismatch);
    }

    if ctx.scanner_ref().starts_with("{{{") {
        match ctx.attempt(parameter) {
            Ok(values) => return Ok(values),
            Err(fatal @ Failure::Fatal(_)) => return Err(fatal),
            Err(_) => {}
        }
    }

    if at_function(ctx) {
        function(ctx)
    } else {
        template(ctx)
    }
}

/// Parses `{{{name}}}` or `{{{name|default}}}`.
fn parameter(ctx: &mut Context<'_>) -> Result<AstList, Failure> {
    let start = ctx.scanner_ref().offset();
    ctx.enter(start)?;
    let result = parameter_body(ctx, start);
    ctx.leave();
    result
}

fn parameter_body(ctx: &mut Context<'_>, start: usize) -> Result<AstList, Failure> {
    if !ctx.scanner().eat("{{{") {
        return Err(Failure::Mismatch);
    }
    ctx.push(ConstructKind::Parameter, start);

    let name = name_list(ctx, "|}", Nested::ParameterOnly, ConstructKind::Parameter)?;
    let default = if ctx.scanner().eat("|") {
        Some(ctx.dispatch(&Stop::Chars("}"))?)
    } else {
        None
    };

    if !ctx.scanner().eat("}}}") {
        ctx.pop(ConstructKind::Parameter)?;
        return Err(ctx.malformed(
            DiagnosticKind::Unterminated(ConstructKind::Parameter),
            start,
        ));
    }
    ctx.pop(ConstructKind::Parameter)?;

    let mut node = Node::new("parameter");
    node.children.push_node(Node::with_children("name", name));
    if let Some(default) = default {
        node.children
            .push_node(Node::with_children("default", default));
    }
    Ok(node.into())
}

/// Returns true if the marker opens `{{ #name: … }}` rather than a template.
fn at_function(ctx: &Context<'_>) -> bool {
    let mut probe = *ctx.scanner_ref();
    probe.eat("{{");
    probe.skip_whitespace();
    probe.peek() == Some('#')
}

/// Parses `{{#name:arg|arg|…}}`. The function is not evaluated; `#if`,
/// `#switch`, and the rest all become the same generic `function` node whose
/// first child names the function. Branch arguments written `key=value`
/// carry a `key` attribute like template arguments, which is how `#switch`
/// cases come out.
fn function(ctx: &mut Context<'_>) -> Result<AstList, Failure> {
    let start = ctx.scanner_ref().offset();
    ctx.scanner().eat("{{");
    ctx.push(ConstructKind::Function, start);
    ctx.scanner().skip_whitespace();
    ctx.scanner().eat("#");
    ctx.scanner().skip_whitespace();

    let name = ctx
        .scanner()
        .bump_while(|c| c.is_ascii_alphanumeric() || c == '_')
        .to_owned();
    if name.is_empty() || !ctx.scanner().eat(":") {
        ctx.pop(ConstructKind::Function)?;
        return Err(ctx.malformed(DiagnosticKind::MalformedFunction, start));
    }

    let mut node = Node::new("function");
    let mut name_list = AstList::new();
    name_list.push_text(&name);
    node.children.push_node(Node::with_children("name", name_list));

    loop {
        node.children.push_node(argument(ctx)?);
        if !eat_pipe(ctx) {
            break;
        }
    }

    if !ctx.scanner().eat("}}") {
        ctx.pop(ConstructKind::Function)?;
        return Err(ctx.malformed(
            DiagnosticKind::Unterminated(ConstructKind::Function),
            start,
        ));
    }
    ctx.pop(ConstructKind::Function)?;
    Ok(node.into())
}

/// Parses `{{name}}` or `{{name|arg|key=value|…}}`.
fn template(ctx: &mut Context<'_>) -> Result<AstList, Failure> {
    let start = ctx.scanner_ref().offset();
    ctx.enter(start)?;
    let result = template_body(ctx, start);
    ctx.leave();
    result
}

fn template_body(ctx: &mut Context<'_>, start: usize) -> Result<AstList, Failure> {
    ctx.scanner().eat("{{");
    ctx.push(ConstructKind::Template, start);

    let name = name_list(ctx, "|}", Nested::Braces, ConstructKind::Template)?;
    let mut node = Node::new("template");
    node.children.push_node(Node::with_children("name", name));

    while eat_pipe(ctx) {
        node.children.push_node(argument(ctx)?);
    }

    if !ctx.scanner().eat("}}") {
        ctx.pop(ConstructKind::Template)?;
        return Err(ctx.malformed(
            DiagnosticKind::Unterminated(ConstructKind::Template),
            start,
        ));
    }
    ctx.pop(ConstructKind::Template)?;
    Ok(node.into())
}

/// Parses one template or function argument, trying the keyed `key=value`
/// form first.
fn argument(ctx: &mut Context<'_>) -> Result<Node, Failure> {
    let keyed = ctx.attempt(|ctx| {
        let key = name_list(ctx, "=|}", Nested::ParameterOnly, ConstructKind::Template)?;
        if !ctx.scanner().eat("=") {
            return Err(Failure::Mismatch);
        }
        let mut value = ctx.dispatch(&Stop::TemplateEnd)?;
        value.trim();
        Ok(Node::with_children("arg", value).with_attr("key", visit::text_of(&key)))
    });
    match keyed {
        Ok(node) => return Ok(node),
        Err(fatal @ Failure::Fatal(_)) => return Err(fatal),
        Err(_) => {}
    }

    let mut value = ctx.dispatch(&Stop::TemplateEnd)?;
    value.trim();
    Ok(Node::with_children("arg", value))
}

/// Consumes a `|` separator together with surrounding whitespace. Consumes
/// nothing if the next token is not a pipe.
fn eat_pipe(ctx: &mut Context<'_>) -> bool {
    let saved = ctx.scanner_ref().checkpoint();
    ctx.scanner().skip_whitespace();
    if ctx.scanner().eat("|") {
        ctx.scanner().skip_whitespace();
        true
    } else {
        ctx.scanner().rewind(saved);
        false
    }
}

/// Parses a name position: literal text with optional nested braced
/// constructs, up to one of `delims`. Any other `{` is reserved and fails
/// the construct.
fn name_list(
    ctx: &mut Context<'_>,
    delims: &str,
    nested: Nested,
    kind: ConstructKind,
) -> Result<AstList, Failure> {
    let start = ctx.scanner_ref().offset();
    let mut out = AstList::new();
    loop {
        let Some(c) = ctx.scanner_ref().peek() else {
            return Err(ctx.malformed(DiagnosticKind::Unterminated(kind), start));
        };
        if delims.contains(c) {
            break;
        }
        if c == '{' {
            let nestable = match nested {
                Nested::ParameterOnly => ctx.scanner_ref().starts_with("{{{"),
                Nested::Braces => ctx.scanner_ref().starts_with("{{"),
            };
            if !nestable {
                return Err(ctx.malformed(DiagnosticKind::ReservedBrace, start));
            }
            let values = match nested {
                Nested::ParameterOnly => parameter(ctx)?,
                Nested::Braces => braces(ctx)?,
            };
            out.append(values);
        } else {
            ctx.scanner().bump();
            out.push_char(c);
        }
    }
    out.trim();
    Ok(out)
}
