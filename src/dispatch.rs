//! The grammar dispatcher.
//!
//! [`dispatch`] is the single engine loop. At each position it checks the
//! caller's stop condition, offers the position to every matching registry
//! candidate, and otherwise consumes literal text. Construct parsers call
//! back into it for their interiors, so the whole grammar is this one loop
//! plus the construct parsers it dispatches to.

use crate::ast::AstList;
use crate::codemap::Span;
use crate::context::Context;
use crate::error::{Diagnostic, DiagnosticKind, Failure};
use crate::registry::ConstructKind;
use crate::scanner::{ByteSet, Scanner};

/// Where a dispatch frame ends, beyond end of input.
#[derive(Clone, Copy, Debug)]
pub enum Stop<'a> {
    /// Only end of input.
    None,
    /// Any one of these characters.
    Chars(&'a str),
    /// This exact sequence.
    Seq(&'a str),
    /// A run of at least this many `'` characters.
    QuoteRun(usize),
    /// `</name>`, matched case-insensitively.
    CloseTag(&'a str),
    /// A template argument boundary: `|` or `}}`.
    TemplateEnd,
    /// A table cell boundary: inline `||` or `!!`, or `|`/`!` at the start
    /// of a line.
    TableCell,
}

impl Stop<'_> {
    /// Returns true if the scanner is positioned at this stop.
    pub(crate) fn is_match(&self, scanner: &Scanner<'_>) -> bool {
        match *self {
            Stop::None => false,
            Stop::Chars(chars) => scanner.peek().is_some_and(|c| chars.contains(c)),
            Stop::Seq(seq) => scanner.starts_with(seq),
            Stop::QuoteRun(len) => scanner.run_len('\'') >= len,
            Stop::CloseTag(name) => scanner.peek_close_tag(name),
            Stop::TemplateEnd => scanner.peek() == Some('|') || scanner.starts_with("}}"),
            Stop::TableCell => {
                scanner.starts_with("||")
                    || scanner.starts_with("!!")
                    || (scanner.is_line_start()
                        && matches!(scanner.peek(), Some('|' | '!')))
            }
        }
    }

    /// Adds the bytes at which this stop could begin to a stop table.
    fn add_bytes(&self, stops: &mut ByteSet) {
        match *self {
            Stop::None => {}
            Stop::Chars(chars) => {
                for c in chars.chars() {
                    debug_assert!(c.is_ascii());
                    stops.insert(c as u8);
                }
            }
            Stop::Seq(seq) => stops.insert(seq.as_bytes()[0]),
            Stop::QuoteRun(_) => stops.insert(b'\''),
            Stop::CloseTag(_) => stops.insert(b'<'),
            Stop::TemplateEnd => {
                stops.insert(b'|');
                stops.insert(b'}');
            }
            Stop::TableCell => {
                stops.insert(b'|');
                stops.insert(b'!');
            }
        }
    }
}

/// Closing markers that, with no matching construct open, indicate broken
/// markup worth a diagnostic before degrading to literal text.
const STRAY_CLOSERS: [(&str, ConstructKind, &[ConstructKind]); 3] = [
    ("]]", ConstructKind::Link, &[ConstructKind::Link]),
    (
        "}}",
        ConstructKind::Template,
        &[
            ConstructKind::Template,
            ConstructKind::Parameter,
            ConstructKind::Function,
        ],
    ),
    ("|}", ConstructKind::Table, &[ConstructKind::Table]),
];

/// Parses content at the current position until `stop` matches, end of
/// input, or a fatal error. Returns the parsed values with adjacent literal
/// text coalesced. The stop itself is not consumed.
pub(crate) fn dispatch(ctx: &mut Context<'_>, stop: &Stop<'_>) -> Result<AstList, Failure> {
    ctx.enter(ctx.scanner_ref().offset())?;
    let result = run(ctx, stop);
    ctx.leave();
    result
}

fn run(ctx: &mut Context<'_>, stop: &Stop<'_>) -> Result<AstList, Failure> {
    let registry = ctx.registry();
    let mut stops = ctx.base_stops().clone();
    stop.add_bytes(&mut stops);

    let mut out = AstList::new();
    'input: while !ctx.scanner_ref().is_empty() {
        if stop.is_match(ctx.scanner_ref()) {
            break;
        }

        // Try every construct whose trigger matches here; block-level
        // entries only match at line start, and longer triggers are offered
        // before shorter ones.
        let candidates = registry
            .candidates(ctx.scanner_ref())
            .map(|(trigger, kind, parse)| (trigger, kind, parse.clone()))
            .collect::<Vec<_>>();
        let mut broken: Option<Diagnostic> = None;
        for (trigger, kind, parse) in candidates {
            match ctx.attempt(|ctx| parse(ctx)) {
                Ok(values) => {
                    log::trace!(
                        "{kind} via `{trigger}` at {}",
                        ctx.scanner_ref().offset()
                    );
                    out.append(values);
                    continue 'input;
                }
                Err(Failure::Mismatch) => {}
                Err(Failure::Malformed(diagnostic)) => {
                    broken = Some(diagnostic);
                    break;
                }
                Err(fatal @ Failure::Fatal(_)) => {
                    ctx.merge_salvage(out);
                    return Err(fatal);
                }
            }
        }

        if let Some(diagnostic) = broken {
            if let Err(fatal) = ctx.diagnose(diagnostic.kind, diagnostic.span) {
                ctx.merge_salvage(out);
                return Err(fatal);
            }
            // Degrade just the first character and rescan; the construct may
            // reopen further in.
        } else if let Some((closer, kind)) = stray_closer(ctx) {
            let start = ctx.scanner_ref().offset();
            ctx.scanner().eat(closer);
            if let Err(fatal) = ctx.diagnose(
                DiagnosticKind::MismatchedCloser { closer, kind },
                Span::new(start, ctx.scanner_ref().offset()),
            ) {
                ctx.merge_salvage(out);
                return Err(fatal);
            }
            out.push_text(closer);
            continue;
        }

        let run = ctx.scanner().literal_run(&stops);
        if run.is_empty() {
            if let Some(c) = ctx.scanner().bump() {
                out.push_char(c);
            }
        } else {
            out.push_text(run);
        }
    }

    Ok(out)
}

/// Returns the closing marker at the current position whose construct is not
/// open, if any.
fn stray_closer(ctx: &Context<'_>) -> Option<(&'static str, ConstructKind)> {
    STRAY_CLOSERS
        .iter()
        .find(|(closer, _, kinds)| {
            ctx.scanner_ref().starts_with(closer) && !ctx.any_open(kinds)
        })
        .map(|&(closer, kind, _)| (closer, kind))
}
