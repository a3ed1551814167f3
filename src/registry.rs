//! The construct registry.
//!
//! The dispatcher never hard-codes the construct set. It consults a
//! [`Registry`], an owned table mapping trigger markers to construct
//! parsers, so callers can add constructs or replace the built-in ones
//! without touching the engine. A registry is immutable during parsing and
//! `Send + Sync`, so one instance can serve concurrent parses.

use indexmap::IndexMap;
use std::borrow::Cow;
use std::sync::Arc;

use crate::ast::{AstList, Node};
use crate::constructs;
use crate::context::Context;
use crate::error::Failure;
use crate::scanner::ByteSet;

/// The kinds of construct tracked on the open-construct stack.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConstructKind {
    /// `== … ==`
    Heading,
    /// `''…''`, `'''…'''`
    Style,
    /// `[[…]]`
    Link,
    /// `[scheme://… …]`
    ExternalLink,
    /// `{{…}}`
    Template,
    /// `{{{…}}}`
    Parameter,
    /// `{{#name:…}}`
    Function,
    /// `{|…|}`
    Table,
    /// `*`/`#`/`:` lines
    List,
    /// `<…>`
    Tag,
    /// A caller-registered construct.
    Custom,
}

impl core::fmt::Display for ConstructKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            ConstructKind::Heading => "heading",
            ConstructKind::Style => "text style",
            ConstructKind::Link => "link",
            ConstructKind::ExternalLink => "external link",
            ConstructKind::Template => "template",
            ConstructKind::Parameter => "parameter",
            ConstructKind::Function => "parser function",
            ConstructKind::Table => "table",
            ConstructKind::List => "list",
            ConstructKind::Tag => "tag",
            ConstructKind::Custom => "custom construct",
        })
    }
}

/// A construct parser.
///
/// Called with the scanner positioned at the trigger marker. On success it
/// returns the values to splice into the surrounding list. On failure the
/// dispatcher rewinds all input the parser consumed; see
/// [`Failure`](crate::Failure) for the recovery behavior per variant.
pub type ConstructFn =
    Arc<dyn Fn(&mut Context<'_>) -> Result<AstList, Failure> + Send + Sync>;

/// An extension tag invocation, passed to a [`TagHandler`].
#[derive(Debug)]
pub struct TagInvocation<'a> {
    /// The tag name as written.
    pub name: &'a str,
    /// The attributes from the start tag, in source order.
    pub attrs: &'a [(String, Option<String>)],
    /// The raw, unparsed body, or `None` for a self-closing tag.
    pub body: Option<&'a str>,
}

/// A handler for a registered extension tag, e.g. `<gallery>`.
///
/// The returned node is spliced into the tree verbatim.
pub type TagHandler = Arc<dyn Fn(&TagInvocation<'_>) -> Node + Send + Sync>;

/// One registry entry.
#[derive(Clone)]
struct Entry {
    trigger: Cow<'static, str>,
    kind: ConstructKind,
    line_start: bool,
    parse: ConstructFn,
}

/// The table of constructs the dispatcher recognizes.
#[derive(Clone)]
pub struct Registry {
    /// Entries in dispatch order: block-level first, then longest trigger
    /// first, so `[[` is tried before `[` at the same position.
    entries: Vec<Entry>,
    /// Extension tag handlers, keyed by lowercased tag name.
    tags: IndexMap<String, TagHandler>,
}

impl core::fmt::Debug for Registry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Registry")
            .field(
                "triggers",
                &self
                    .entries
                    .iter()
                    .map(|entry| &*entry.trigger)
                    .collect::<Vec<_>>(),
            )
            .field("tags", &self.tags.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for Registry {
    /// The full built-in construct set.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("=", ConstructKind::Heading, true, Arc::new(constructs::heading::heading));
        registry.register("*", ConstructKind::List, true, Arc::new(constructs::list::list));
        registry.register("#", ConstructKind::List, true, Arc::new(constructs::list::list));
        registry.register(":", ConstructKind::List, true, Arc::new(constructs::list::list));
        registry.register("{|", ConstructKind::Table, true, Arc::new(constructs::table::table));
        registry.register("''", ConstructKind::Style, false, Arc::new(constructs::format::quotes));
        registry.register("{{", ConstructKind::Template, false, Arc::new(constructs::braces::braces));
        registry.register("[[", ConstructKind::Link, false, Arc::new(constructs::link::wikilink));
        registry.register("[", ConstructKind::ExternalLink, false, Arc::new(constructs::link::extlink));
        registry.register("<", ConstructKind::Tag, false, Arc::new(constructs::tag::tag));
        registry
    }
}

impl Registry {
    /// A registry with no constructs at all. Parsing with it yields one big
    /// text run.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            tags: IndexMap::new(),
        }
    }

    /// Registers a construct parser for a trigger marker, replacing any
    /// existing entry with the same trigger.
    ///
    /// `line_start` entries are only tried when nothing but horizontal
    /// whitespace has been consumed on the current line.
    pub fn register(
        &mut self,
        trigger: impl Into<Cow<'static, str>>,
        kind: ConstructKind,
        line_start: bool,
        parse: ConstructFn,
    ) {
        let trigger = trigger.into();
        debug_assert!(trigger.is_ascii() && !trigger.is_empty());
        self.entries.retain(|entry| entry.trigger != trigger);
        self.entries.push(Entry {
            trigger,
            kind,
            line_start,
            parse,
        });
        self.entries.sort_by_key(|entry| {
            (!entry.line_start, core::cmp::Reverse(entry.trigger.len()))
        });
    }

    /// Looks up the construct parser for a trigger marker.
    #[must_use]
    pub fn lookup(&self, trigger: &str) -> Option<&ConstructFn> {
        self.entries
            .iter()
            .find(|entry| entry.trigger == trigger)
            .map(|entry| &entry.parse)
    }

    /// Registers an extension tag handler, e.g. for `<gallery>`. The name is
    /// matched case-insensitively.
    pub fn register_tag(&mut self, name: &str, handler: TagHandler) {
        self.tags.insert(name.to_ascii_lowercase(), handler);
    }

    /// Looks up an extension tag handler. `name` must already be lowercased.
    pub(crate) fn tag_handler(&self, name: &str) -> Option<&TagHandler> {
        self.tags.get(name)
    }

    /// The candidate constructs for the current scanner position, in
    /// dispatch order.
    pub(crate) fn candidates<'r>(
        &'r self,
        scanner: &crate::Scanner<'_>,
    ) -> impl Iterator<Item = (&'r str, ConstructKind, &'r ConstructFn)> {
        let line_start = scanner.is_line_start();
        self.entries.iter().filter_map(move |entry| {
            ((!entry.line_start || line_start) && scanner.starts_with(&entry.trigger))
                .then_some((&*entry.trigger, entry.kind, &entry.parse))
        })
    }

    /// The set of bytes that can begin a registered trigger.
    pub(crate) fn trigger_bytes(&self) -> ByteSet {
        let mut bytes = ByteSet::new();
        for entry in &self.entries {
            bytes.insert(entry.trigger.as_bytes()[0]);
        }
        bytes
    }
}
