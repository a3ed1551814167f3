//! Quote-run text styling: `''italic''`, `'''bold'''`, `'''''both'''''`.

use crate::ast::{AstList, Node};
use crate::context::Context;
use crate::dispatch::Stop;
use crate::error::{DiagnosticKind, Failure};
use crate::registry::ConstructKind;

/// Parses a run of `'` markers. The run length picks the style:
///
/// * 2: italic
/// * 3: bold
/// * 4: one literal `'` followed by bold
/// * 5 or more: bold containing italic
///
/// A single `'` is not a construct at all.
pub(crate) fn quotes(ctx: &mut Context<'_>) -> Result<AstList, Failure> {
    match ctx.scanner_ref().run_len('\'') {
        0 | 1 => Err(Failure::Mismatch),
        2 => style(ctx, "italic", 2),
        3 => style(ctx, "bold", 3),
        4 => {
            ctx.scanner().eat_run('\'', 1);
            let mut out = AstList::new();
            out.push_text("'");
            out.append(style(ctx, "bold", 3)?);
            Ok(out)
        }
        _ => bold_italic(ctx),
    }
}

/// Parses one style whose opening and closing markers are `marker_len`
/// quotes. The interior nests recursively, so bold may contain italic,
/// links, or templates.
fn style(ctx: &mut Context<'_>, name: &str, marker_len: usize) -> Result<AstList, Failure> {
    let start = ctx.scanner_ref().offset();
    ctx.scanner().eat_run('\'', marker_len);
    ctx.push(ConstructKind::Style, start);

    let interior = ctx.dispatch(&Stop::QuoteRun(marker_len))?;

    if ctx.scanner_ref().run_len('\'') < marker_len {
        ctx.pop(ConstructKind::Style)?;
        return Err(ctx.malformed(DiagnosticKind::Unterminated(ConstructKind::Style), start));
    }
    ctx.scanner().eat_run('\'', marker_len);
    ctx.pop(ConstructKind::Style)?;
    Ok(Node::with_children(name, interior).into())
}

/// Parses `'''''…'''''` as bold wrapping italic.
fn bold_italic(ctx: &mut Context<'_>) -> Result<AstList, Failure> {
    let start = ctx.scanner_ref().offset();
    ctx.scanner().eat_run('\'', 5);
    ctx.push(ConstructKind::Style, start);

    let interior = ctx.dispatch(&Stop::QuoteRun(5))?;

    if ctx.scanner_ref().run_len('\'') < 5 {
        ctx.pop(ConstructKind::Style)?;
        return Err(ctx.malformed(DiagnosticKind::Unterminated(ConstructKind::Style), start));
    }
    ctx.scanner().eat_run('\'', 5);
    ctx.pop(ConstructKind::Style)?;
    Ok(Node::with_children("bold", Node::with_children("italic", interior).into()).into())
}
