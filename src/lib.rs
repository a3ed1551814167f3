//! A tolerant WikiText parser that produces a generic `{name, children}`
//! syntax tree.
//!
//! The parser turns wiki markup (headings, `'''bold'''`, `[[links]]`,
//! `{{templates}}`, tables, lists, extension tags) into a uniform tree of
//! [`Node`]s that carry no wiki semantics of their own, so renderers and
//! analyzers dispatch on node names alone. Real wiki pages are full of
//! broken markup, so the engine never rejects input: markup that fails to
//! parse degrades to literal text and the problem is reported as a
//! [`Diagnostic`] alongside the tree.
//!
//! The grammar itself is open. Construct parsers live in a [`Registry`]
//! keyed by trigger markers, and callers may register their own constructs
//! or extension tag handlers without touching the engine.
//!
//! ```
//! use wikitext_tree::{Options, Parser};
//!
//! let parser = Parser::new(Options::default());
//! let output = parser.parse("== Heading ==").unwrap();
//! let heading = output.root.children[0].as_node().unwrap();
//! assert_eq!(heading.name, "heading");
//! assert_eq!(heading.attr("level").and_then(|a| a.as_number()), Some(2));
//! ```

pub mod ast;
pub mod codemap;
mod constructs;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod registry;
pub mod scanner;
pub mod visit;

#[cfg(test)]
mod tests;

pub use ast::{AstList, Attr, Node, TreeLike, Value};
pub use codemap::{LineCol, Span};
pub use context::Context;
pub use dispatch::Stop;
pub use error::{Diagnostic, DiagnosticKind, Error, Failure, Fatal};
pub use registry::{ConstructFn, ConstructKind, Registry, TagHandler, TagInvocation};
pub use scanner::Scanner;

/// Parser options.
#[derive(Clone)]
pub struct Options {
    /// How deep construct nesting may go before the parse aborts with
    /// [`Error::RecursionLimit`]. Counted in dispatch frames, so one
    /// construct usually costs a couple of levels.
    pub max_recursion_depth: usize,

    /// Promote every recoverable diagnostic to [`Error::Strict`] instead of
    /// degrading the markup to literal text.
    pub strict: bool,

    /// Extension tag handlers to install on top of the registry, by tag
    /// name. Names match case-insensitively.
    pub extensions: Vec<(String, TagHandler)>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            max_recursion_depth: 256,
            strict: false,
            extensions: Vec::new(),
        }
    }
}

impl core::fmt::Debug for Options {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Options")
            .field("max_recursion_depth", &self.max_recursion_depth)
            .field("strict", &self.strict)
            .field(
                "extensions",
                &self
                    .extensions
                    .iter()
                    .map(|(name, _)| name)
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// The result of a successful (or tolerantly degraded) parse.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Output {
    /// The document tree. Its name is `"root"` and its children are the
    /// top-level content.
    pub root: Node,

    /// Recoverable problems found along the way, in source order. The tree
    /// is complete regardless; the markup each diagnostic describes was
    /// degraded to literal text.
    pub diagnostics: Vec<Diagnostic>,
}

impl Output {
    /// The flattened text content of the document.
    #[must_use]
    pub fn text(&self) -> String {
        visit::text_of(&self.root.children)
    }
}

/// A reusable parser: a registry plus options.
///
/// Configuration happens up front; parsing takes `&self`, so one parser can
/// serve many documents, including concurrently.
#[derive(Clone, Debug)]
pub struct Parser {
    registry: Registry,
    options: Options,
}

impl Parser {
    /// Creates a parser with the default construct set and the given
    /// options.
    #[must_use]
    pub fn new(options: Options) -> Self {
        Self::with_registry(Registry::default(), options)
    }

    /// Creates a parser with a caller-built registry. Extension handlers
    /// from the options are installed into it.
    #[must_use]
    pub fn with_registry(mut registry: Registry, options: Options) -> Self {
        for (name, handler) in &options.extensions {
            registry.register_tag(name, handler.clone());
        }
        Self { registry, options }
    }

    /// The registry, for registering further constructs before parsing.
    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Parses one document.
    ///
    /// Identical input always produces an identical tree. Broken markup
    /// degrades to literal text and surfaces in
    /// [`diagnostics`](Output::diagnostics); the only errors are the
    /// recursion limit and strict mode promotions.
    pub fn parse(&self, source: &str) -> Result<Output, Error> {
        log::debug!("parsing {} bytes", source.len());
        let mut ctx = Context::new(source, &self.registry, &self.options);
        match ctx.dispatch(&Stop::None) {
            Ok(children) => {
                let (_, diagnostics) = ctx.finish();
                log::debug!("parsed with {} diagnostics", diagnostics.len());
                Ok(Output {
                    root: Node::with_children("root", children),
                    diagnostics,
                })
            }
            Err(Failure::Fatal(Fatal::RecursionLimit { offset })) => {
                let at = ctx.line_col(offset);
                let (salvage, diagnostics) = ctx.finish();
                Err(Error::RecursionLimit {
                    partial: Output {
                        root: Node::with_children("root", salvage),
                        diagnostics,
                    },
                    at,
                })
            }
            Err(Failure::Fatal(Fatal::Strict(diagnostic))) => {
                Err(Error::Strict(diagnostic))
            }
            Err(Failure::Mismatch | Failure::Malformed(_)) => {
                // The top-level dispatch frame converts these itself.
                unreachable!()
            }
        }
    }
}

/// Parses one document with the default construct set.
pub fn parse(source: &str, options: Options) -> Result<Output, Error> {
    Parser::new(options).parse(source)
}
