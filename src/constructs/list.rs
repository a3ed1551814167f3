//! `*` / `#` / `:` list lines.

use crate::ast::{AstList, Node};
use crate::constructs::table;
use crate::context::Context;
use crate::dispatch::Stop;
use crate::error::Failure;

/// One parsed marker line, before nesting is resolved.
struct Item {
    /// The marker run length.
    depth: usize,
    /// The last marker character, which decides the list kind at this depth.
    marker: char,
    content: AstList,
}

/// Parses a run of consecutive list lines into nested `list` > `item`
/// nodes. The marker run length is the nesting depth; lines at the same
/// depth share one `list`, and a deeper line opens a child `list` inside the
/// preceding `item`.
pub(crate) fn list(ctx: &mut Context<'_>) -> Result<AstList, Failure> {
    let mut items = Vec::new();
    loop {
        let markers = ctx
            .scanner()
            .bump_while(|c| matches!(c, '*' | '#' | ':'));
        if markers.is_empty() {
            if items.is_empty() {
                return Err(Failure::Mismatch);
            }
            break;
        }
        let depth = markers.chars().count();
        let marker = markers.chars().last().unwrap_or('*');
        ctx.scanner().skip_hspace();

        // A table may open directly after the markers, giving a table nested
        // in a list item.
        let mut content = if ctx.scanner_ref().starts_with("{|") {
            table::table(ctx)?
        } else {
            ctx.dispatch(&Stop::Chars("\n"))?
        };
        content.trim();
        items.push(Item {
            depth,
            marker,
            content,
        });

        // The list continues while the next line begins with a marker,
        // allowing leading indentation.
        let saved = ctx.scanner_ref().checkpoint();
        if !ctx.scanner().eat("\n") {
            break;
        }
        ctx.scanner().skip_hspace();
        if !matches!(ctx.scanner_ref().peek(), Some('*' | '#' | ':')) {
            ctx.scanner().rewind(saved);
            break;
        }
    }
    Ok(build(items).into())
}

/// The list kind for a marker character.
fn kind(marker: char) -> &'static str {
    match marker {
        '#' => "number",
        ':' => "indent",
        _ => "bullet",
    }
}

/// Resolves marker depths into a nested `list` tree.
fn build(items: Vec<Item>) -> Node {
    /// An unfinished list at one nesting depth.
    struct Level {
        depth: usize,
        node: Node,
    }

    /// Closes the innermost level, attaching it inside the last item of the
    /// level above (adding a bare item when the line jumped straight to a
    /// deeper level).
    fn collapse(stack: &mut Vec<Level>) {
        let inner = match stack.pop() {
            Some(level) => level.node,
            None => return,
        };
        let Some(outer) = stack.last_mut() else {
            unreachable!("collapse below the outermost list");
        };
        match outer.node.children.last_mut() {
            Some(crate::ast::Value::Node(item)) if item.name == "item" => {
                item.children.push_node(inner);
            }
            _ => {
                let mut item = Node::new("item");
                item.children.push_node(inner);
                outer.node.children.push_node(item);
            }
        }
    }

    let mut stack: Vec<Level> = Vec::new();
    for item in items {
        while stack.last().is_some_and(|level| level.depth > item.depth) {
            collapse(&mut stack);
        }
        let current = stack.last().map_or(0, |level| level.depth);
        for depth in current + 1..=item.depth {
            stack.push(Level {
                depth,
                node: Node::new("list").with_attr("kind", kind(item.marker)),
            });
        }
        let node = Node::with_children("item", item.content);
        match stack.last_mut() {
            Some(level) => level.node.children.push_node(node),
            None => unreachable!("list line with no marker depth"),
        }
    }
    while stack.len() > 1 {
        collapse(&mut stack);
    }
    match stack.pop() {
        Some(level) => level.node,
        None => Node::new("list").with_attr("kind", "bullet"),
    }
}
