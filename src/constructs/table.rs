//! `{| … |}` table parsing.

use memchr::memchr;

use crate::ast::{AstList, Node};
use crate::context::Context;
use crate::dispatch::Stop;
use crate::error::{DiagnosticKind, Failure};
use crate::registry::ConstructKind;

/// Parses a table. Rows are separated by `|-` lines, data cells open with
/// `|` (or inline `||`), header cells with `!` (or inline `!!`), and `|+`
/// adds a caption. A table that runs off the end of input keeps the
/// structure recovered so far and records a diagnostic, unlike inline
/// constructs which degrade to literal text.
pub(crate) fn table(ctx: &mut Context<'_>) -> Result<AstList, Failure> {
    let start = ctx.scanner_ref().offset();
    if !ctx.scanner().eat("{|") {
        return Err(Failure::Mismatch);
    }
    ctx.push(ConstructKind::Table, start);

    let mut node = Node::new("table");
    set_attrs(&mut node, rest_of_line(ctx));

    let mut caption = None;
    let mut rows = Vec::new();
    let mut row = Node::new("row");
    let mut terminated = false;

    loop {
        // Advance past line boundaries and indentation to the next control
        // marker.
        loop {
            if ctx.scanner().eat("\n") {
                continue;
            }
            if ctx.scanner_ref().is_line_start() && ctx.scanner().skip_hspace() {
                continue;
            }
            break;
        }
        if ctx.scanner_ref().is_empty() {
            break;
        }

        if ctx.scanner().eat("|}") {
            terminated = true;
            break;
        }
        if ctx.scanner().eat("|-") {
            finish_row(&mut rows, row);
            row = Node::new("row");
            set_attrs(&mut row, rest_of_line(ctx));
        } else if ctx.scanner().eat("|+") {
            let mut content = ctx.dispatch(&Stop::Chars("\n"))?;
            content.trim();
            caption = Some(Node::with_children("caption", content));
        } else if matches!(ctx.scanner_ref().peek(), Some('|' | '!')) {
            cells(ctx, &mut row)?;
        } else {
            // A line with no cell marker continues the previous cell, or
            // opens an implicit one at the start of the table.
            let mut content = ctx.dispatch(&Stop::TableCell)?;
            content.trim();
            if content.is_empty() {
                continue;
            }
            match row.children.last_mut() {
                Some(crate::ast::Value::Node(cell)) => {
                    cell.children.push_text(" ");
                    cell.children.append(content);
                }
                _ => row.children.push_node(Node::with_children("cell", content)),
            }
        }
    }

    if !terminated {
        let span = crate::codemap::Span::new(start, ctx.scanner_ref().offset());
        ctx.diagnose(DiagnosticKind::Unterminated(ConstructKind::Table), span)?;
    }
    finish_row(&mut rows, row);
    ctx.pop(ConstructKind::Table)?;

    if let Some(caption) = caption {
        node.children.push_node(caption);
    }
    for row in rows {
        node.children.push_node(row);
    }
    Ok(node.into())
}

/// Parses the run of cells beginning at a `|` or `!` marker, through the end
/// of their (possibly multi-line) content.
fn cells(ctx: &mut Context<'_>, row: &mut Node) -> Result<(), Failure> {
    let mut header = ctx.scanner_ref().peek() == Some('!');
    loop {
        if !ctx.scanner().eat("||") && !ctx.scanner().eat("!!") {
            ctx.scanner().bump();
        }

        let mut cell = Node::new("cell");
        if header {
            cell.set_attr("header", 1);
        }
        if let Some(attrs) = cell_attrs(ctx) {
            set_attrs(&mut cell, &attrs);
        }
        let mut content = ctx.dispatch(&Stop::TableCell)?;
        content.trim();
        cell.children = content;
        row.children.push_node(cell);

        // More cells on the same line?
        if ctx.scanner_ref().starts_with("!!") {
            header = true;
        } else if ctx.scanner_ref().starts_with("||") {
            header = false;
        } else {
            return Ok(());
        }
    }
}

/// Splits a leading `attrs|` segment off a cell, MediaWiki style: if a lone
/// `|` occurs on the opening line before any markup, the text before it is
/// the cell's attribute string.
fn cell_attrs(ctx: &mut Context<'_>) -> Option<String> {
    let rest = ctx.scanner_ref().rest();
    let line = &rest[..memchr(b'\n', rest.as_bytes()).unwrap_or(rest.len())];
    let at = memchr(b'|', line.as_bytes())?;
    if line[at..].starts_with("||") {
        return None;
    }
    let attrs = &line[..at];
    if attrs.contains(['[', '{', '<', '\'']) {
        return None;
    }
    let attrs = attrs.trim().to_owned();
    let eaten = ctx.scanner().eat(&line[..=at]);
    debug_assert!(eaten);
    Some(attrs)
}

/// Consumes the remainder of the current line, not including the break.
fn rest_of_line<'a>(ctx: &mut Context<'a>) -> &'a str {
    ctx.scanner().bump_while(|c| c != '\n')
}

/// Stores a raw attribute string on a node, if it is not blank.
fn set_attrs(node: &mut Node, attrs: &str) {
    let attrs = attrs.trim();
    if !attrs.is_empty() {
        node.set_attr("attrs", attrs);
    }
}

/// Moves a finished row into the row list, unless it is empty.
fn finish_row(rows: &mut Vec<Node>, row: Node) {
    if !row.children.is_empty() || !row.attrs.is_empty() {
        rows.push(row);
    }
}
