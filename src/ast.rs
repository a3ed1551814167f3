//! The generic syntax tree model.
//!
//! The tree deliberately carries no wiki semantics: a node is a `name` tag,
//! an attribute map, and an ordered list of children, nothing more. Renderers
//! and analyzers dispatch on `name` alone, so the parser can emit new node
//! kinds without changing any type definitions. Conformance is structural,
//! not nominal, which is what [`TreeLike`] expresses.

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

/// A single element of an [`AstList`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Value {
    /// A nested node.
    Node(Node),
    /// A run of literal text. Always an atomic leaf; traversals must never
    /// treat it as a nested sequence of characters.
    Text(String),
    /// A bare number.
    Number(i64),
}

impl Value {
    /// Returns the inner node, if this value is a node.
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Value::Node(node) => Some(node),
            _ => None,
        }
    }

    /// Returns the inner text, if this value is a text run.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the inner number, if this value is a number.
    pub fn as_number(&self) -> Option<i64> {
        match self {
            Value::Number(value) => Some(*value),
            _ => None,
        }
    }
}

impl From<Node> for Value {
    fn from(node: Node) -> Self {
        Value::Node(node)
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Text(text.to_owned())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::Text(text)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(value)
    }
}

/// An ordered sequence of [`Value`]s.
///
/// Invariant: no two adjacent `Text` elements. Every push operation coalesces
/// trailing text, so consumers can rely on unmatched marker characters from
/// adjacent positions arriving as a single text run.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AstList(Vec<Value>);

impl AstList {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends a node.
    pub fn push_node(&mut self, node: Node) {
        self.0.push(Value::Node(node));
    }

    /// Appends a number.
    pub fn push_number(&mut self, value: i64) {
        self.0.push(Value::Number(value));
    }

    /// Appends text, merging into a trailing text element if one exists.
    /// Empty text is discarded.
    pub fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Value::Text(last)) = self.0.last_mut() {
            last.push_str(text);
        } else {
            self.0.push(Value::Text(text.to_owned()));
        }
    }

    /// Appends a single character of text.
    pub fn push_char(&mut self, c: char) {
        if let Some(Value::Text(last)) = self.0.last_mut() {
            last.push(c);
        } else {
            self.0.push(Value::Text(c.to_string()));
        }
    }

    /// Appends any value, maintaining the text coalescing invariant.
    pub fn push_value(&mut self, value: Value) {
        match value {
            Value::Text(text) => self.push_text(&text),
            other => self.0.push(other),
        }
    }

    /// Appends every element of `other`, coalescing text at the boundary.
    pub fn append(&mut self, other: AstList) {
        for value in other.0 {
            self.push_value(value);
        }
    }

    /// Prepends text, merging into a leading text element if one exists.
    pub fn prepend_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Value::Text(first)) = self.0.first_mut() {
            first.insert_str(0, text);
        } else {
            self.0.insert(0, Value::Text(text.to_owned()));
        }
    }

    /// The last element, mutably. Mutating an element in place cannot
    /// introduce adjacent text elements.
    pub fn last_mut(&mut self) -> Option<&mut Value> {
        self.0.last_mut()
    }

    /// Trims whitespace from the boundary text leaves on both ends,
    /// dropping leaves that become empty.
    pub fn trim(&mut self) {
        self.trim_start();
        self.trim_end();
    }

    /// Trims leading whitespace from the first text leaf, dropping it if it
    /// becomes empty. Stops at the first non-text element.
    pub fn trim_start(&mut self) {
        while let Some(Value::Text(first)) = self.0.first_mut() {
            let trimmed = first.trim_start();
            if trimmed.is_empty() {
                self.0.remove(0);
            } else {
                if trimmed.len() != first.len() {
                    *first = trimmed.to_owned();
                }
                break;
            }
        }
    }

    /// Trims trailing whitespace from the last text leaf, dropping it if it
    /// becomes empty. Stops at the first non-text element.
    pub fn trim_end(&mut self) {
        while let Some(Value::Text(last)) = self.0.last_mut() {
            let trimmed = last.trim_end();
            if trimmed.is_empty() {
                self.0.pop();
            } else {
                if trimmed.len() != last.len() {
                    last.truncate(trimmed.len());
                }
                break;
            }
        }
    }
}

impl core::ops::Deref for AstList {
    type Target = [Value];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Node> for AstList {
    fn from(node: Node) -> Self {
        Self(vec![Value::Node(node)])
    }
}

impl FromIterator<Value> for AstList {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        let mut list = Self::new();
        for value in iter {
            list.push_value(value);
        }
        list
    }
}

impl IntoIterator for AstList {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a AstList {
    type Item = &'a Value;
    type IntoIter = core::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A node attribute value.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Attr {
    /// A numeric attribute, e.g. a heading level.
    Number(i64),
    /// A string attribute, e.g. an argument key or a tag name.
    Text(String),
}

impl Attr {
    /// Returns the numeric value, if this attribute is a number.
    pub fn as_number(&self) -> Option<i64> {
        match self {
            Attr::Number(value) => Some(*value),
            Attr::Text(_) => None,
        }
    }

    /// Returns the string value, if this attribute is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Attr::Number(_) => None,
            Attr::Text(text) => Some(text),
        }
    }
}

impl From<i64> for Attr {
    fn from(value: i64) -> Self {
        Attr::Number(value)
    }
}

impl From<&str> for Attr {
    fn from(text: &str) -> Self {
        Attr::Text(text.to_owned())
    }
}

impl From<String> for Attr {
    fn from(text: String) -> Self {
        Attr::Text(text)
    }
}

/// A syntax tree node.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Node {
    /// The node kind, e.g. `"heading"` or `"template"`.
    pub name: String,
    /// Optional attributes. Insertion-ordered so serialization is
    /// deterministic.
    pub attrs: IndexMap<String, Attr>,
    /// The node contents.
    pub children: AstList,
}

impl Node {
    /// Creates a new childless node.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: IndexMap::new(),
            children: AstList::new(),
        }
    }

    /// Creates a new node with the given children.
    #[must_use]
    pub fn with_children(name: impl Into<String>, children: AstList) -> Self {
        Self {
            name: name.into(),
            attrs: IndexMap::new(),
            children,
        }
    }

    /// Adds an attribute, builder style.
    #[must_use]
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<Attr>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    /// Sets an attribute.
    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<Attr>) {
        self.attrs.insert(key.into(), value.into());
    }

    /// Gets an attribute by key.
    pub fn attr(&self, key: &str) -> Option<&Attr> {
        self.attrs.get(key)
    }
}

/// The structural contract every tree value satisfies: a name and an ordered
/// list of children. Consumers that only walk the shape should take
/// `impl TreeLike` instead of [`Node`].
pub trait TreeLike {
    /// The node kind.
    fn name(&self) -> &str;
    /// The node contents.
    fn children(&self) -> &AstList;
}

impl TreeLike for Node {
    fn name(&self) -> &str {
        &self.name
    }

    fn children(&self) -> &AstList {
        &self.children
    }
}

// The serialized shape is the structural contract itself: a node becomes a
// map of `name`, the attributes by their own keys, then `children`. Text and
// numbers serialize as bare values.

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Node(node) => node.serialize(serializer),
            Value::Text(text) => serializer.serialize_str(text),
            Value::Number(value) => serializer.serialize_i64(*value),
        }
    }
}

impl Serialize for Attr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Attr::Number(value) => serializer.serialize_i64(*value),
            Attr::Text(text) => serializer.serialize_str(text),
        }
    }
}

impl Serialize for AstList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for value in &self.0 {
            seq.serialize_element(value)?;
        }
        seq.end()
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2 + self.attrs.len()))?;
        map.serialize_entry("name", &self.name)?;
        for (key, value) in &self.attrs {
            // Markup attributes may be called anything; ones that would
            // shadow the structural entries stay API-only.
            if key != "name" && key != "children" {
                map.serialize_entry(key, value)?;
            }
        }
        map.serialize_entry("children", &self.children)?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_coalescing() {
        let mut list = AstList::new();
        list.push_text("a");
        list.push_char('b');
        list.push_text("c");
        assert_eq!(&*list, &[Value::Text("abc".into())]);

        list.push_node(Node::new("x"));
        list.push_text("d");
        let mut other = AstList::new();
        other.push_text("e");
        other.push_node(Node::new("y"));
        list.append(other);
        assert_eq!(list.len(), 4);
        assert_eq!(list[2].as_text(), Some("de"));
    }

    #[test]
    fn empty_text_is_discarded() {
        let mut list = AstList::new();
        list.push_text("");
        assert!(list.is_empty());
    }

    #[test]
    fn trim_drops_blank_leaves() {
        let mut list = AstList::new();
        list.push_text("  ");
        list.push_node(Node::new("x"));
        list.push_text("  tail  ");
        list.trim();
        assert_eq!(list.len(), 2);
        assert!(list[0].as_node().is_some());
        assert_eq!(list[1].as_text(), Some("  tail"));

        let mut blank = AstList::new();
        blank.push_text(" \t\n ");
        blank.trim();
        assert!(blank.is_empty());
    }

    #[test]
    fn prepend_merges_leading_text() {
        let mut list = AstList::new();
        list.push_text("b");
        list.prepend_text("a");
        assert_eq!(list[0].as_text(), Some("ab"));
    }

    #[test]
    fn serialized_shape() {
        let mut node = Node::new("heading").with_attr("level", 2);
        node.children.push_text("Title");
        assert_eq!(
            serde_json::to_value(&node).unwrap(),
            serde_json::json!({ "name": "heading", "level": 2, "children": ["Title"] })
        );
    }
}
