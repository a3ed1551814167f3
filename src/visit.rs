//! Syntax tree traversal.

use core::fmt;

use crate::ast::{AstList, Node, Value};

/// A visitor over a syntax tree.
///
/// Every method has a default implementation that walks into children, so an
/// implementation only needs to override the values it cares about. `Text`
/// is always delivered whole as an atomic leaf.
pub trait Visitor<E> {
    /// Visits a node. The default walks the node's children.
    fn visit_node(&mut self, node: &Node) -> Result<(), E> {
        walk_node(self, node)
    }

    /// Visits a text leaf.
    fn visit_text(&mut self, text: &str) -> Result<(), E> {
        let _ = text;
        Ok(())
    }

    /// Visits a number leaf.
    fn visit_number(&mut self, value: i64) -> Result<(), E> {
        let _ = value;
        Ok(())
    }

    /// Visits a list of values. The default visits each element.
    fn visit_list(&mut self, list: &AstList) -> Result<(), E> {
        walk_list(self, list)
    }
}

/// Walks into a node's children.
pub fn walk_node<V: Visitor<E> + ?Sized, E>(visitor: &mut V, node: &Node) -> Result<(), E> {
    visitor.visit_list(&node.children)
}

/// Visits each element of a list.
pub fn walk_list<V: Visitor<E> + ?Sized, E>(visitor: &mut V, list: &AstList) -> Result<(), E> {
    for value in list {
        match value {
            Value::Node(node) => visitor.visit_node(node)?,
            Value::Text(text) => visitor.visit_text(text)?,
            Value::Number(number) => visitor.visit_number(*number)?,
        }
    }
    Ok(())
}

/// Extracts all text from a tree.
pub struct TextContent<W>
where
    W: fmt::Write,
{
    /// The accumulated text.
    content: W,
}

impl<W> TextContent<W>
where
    W: fmt::Write,
{
    /// Creates a new text content extractor with the given output.
    pub fn new(content: W) -> Self {
        Self { content }
    }

    /// Returns the text content, consuming the extractor.
    pub fn finish(self) -> W {
        self.content
    }
}

impl<W> Visitor<fmt::Error> for TextContent<W>
where
    W: fmt::Write,
{
    fn visit_text(&mut self, text: &str) -> fmt::Result {
        self.content.write_str(text)
    }

    fn visit_number(&mut self, value: i64) -> fmt::Result {
        write!(self.content, "{value}")
    }
}

/// The concatenated text leaves of a list.
#[must_use]
pub fn text_of(list: &AstList) -> String {
    let mut extractor = TextContent::new(String::new());
    // Writing into a `String` cannot fail.
    let _ = extractor.visit_list(list);
    extractor.finish()
}
