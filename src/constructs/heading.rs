//! `== Heading ==` parsing.

use crate::ast::{AstList, Node};
use crate::context::Context;
use crate::dispatch::Stop;
use crate::error::{DiagnosticKind, Failure};
use crate::registry::ConstructKind;

/// The deepest heading MediaWiki knows about.
const MAX_LEVEL: usize = 6;

/// Parses a heading line. The level is the smaller of the opening and
/// closing `=` runs, and surplus markers on either side become literal text
/// inside the title, so `=== T ==` is a level-2 heading titled `= T`.
pub(crate) fn heading(ctx: &mut Context<'_>) -> Result<AstList, Failure> {
    let start = ctx.scanner_ref().offset();
    let open = ctx.scanner_ref().run_len('=');
    if open == 0 {
        return Err(Failure::Mismatch);
    }
    ctx.scanner().eat_run('=', open);
    ctx.push(ConstructKind::Heading, start);

    let mut interior = ctx.dispatch(&Stop::Chars("=\n"))?;

    let close = ctx.scanner_ref().run_len('=');
    if close == 0 {
        ctx.pop(ConstructKind::Heading)?;
        return Err(ctx.malformed(DiagnosticKind::Unterminated(ConstructKind::Heading), start));
    }
    ctx.scanner().eat_run('=', close);

    // Only trailing spaces may follow the closing markers.
    ctx.scanner().skip_hspace();
    if !ctx.scanner_ref().is_empty() && !ctx.scanner_ref().starts_with("\n") {
        ctx.pop(ConstructKind::Heading)?;
        return Err(ctx.malformed(DiagnosticKind::Unterminated(ConstructKind::Heading), start));
    }

    let level = open.min(close);
    if level > MAX_LEVEL {
        ctx.pop(ConstructKind::Heading)?;
        return Err(ctx.malformed(DiagnosticKind::HeadingTooDeep, start));
    }
    if open > level {
        interior.prepend_text(&"=".repeat(open - level));
    }
    if close > level {
        interior.push_text(&"=".repeat(close - level));
    }
    interior.trim();

    ctx.pop(ConstructKind::Heading)?;
    let node = Node::with_children("heading", interior)
        .with_attr("level", i64::try_from(level).unwrap_or(i64::MAX));
    Ok(node.into())
}
