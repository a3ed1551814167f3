//! The per-parse state shared by every construct parser.

use crate::Options;
use crate::ast::AstList;
use crate::codemap::{FileMap, LineCol, Span};
use crate::dispatch::{self, Stop};
use crate::error::{Diagnostic, DiagnosticKind, Failure, Fatal};
use crate::registry::{ConstructKind, Registry};
use crate::scanner::{ByteSet, Scanner};

/// An entry on the open-construct stack.
#[derive(Clone, Copy, Debug)]
pub(crate) struct OpenConstruct {
    pub kind: ConstructKind,
    /// Where the opening marker begins.
    pub offset: usize,
}

/// Everything a construct parser needs while parsing one document: the
/// scanner, the open-construct stack, accumulated diagnostics, the depth
/// counter, and read-only access to the registry and options.
pub struct Context<'a> {
    scanner: Scanner<'a>,
    map: FileMap<'a>,
    registry: &'a Registry,
    options: &'a Options,
    stack: Vec<OpenConstruct>,
    diagnostics: Vec<Diagnostic>,
    depth: usize,
    /// Values recovered from abandoned dispatch frames when a fatal error
    /// unwinds the parse, outermost content first.
    salvage: AstList,
    /// Bytes that may begin a construct or closer, shared by every dispatch
    /// frame as the base of its stop table.
    base_stops: ByteSet,
}

impl<'a> Context<'a> {
    /// Creates a context for one parse.
    pub(crate) fn new(source: &'a str, registry: &'a Registry, options: &'a Options) -> Self {
        let mut base_stops = registry.trigger_bytes();
        // Closing markers and line breaks always interrupt literal runs,
        // as do header cell markers inside tables.
        for b in [b']', b'}', b'|', b'!', b'\n'] {
            base_stops.insert(b);
        }

        Self {
            scanner: Scanner::new(source),
            map: FileMap::new(source),
            registry,
            options,
            stack: Vec::new(),
            diagnostics: Vec::new(),
            depth: 0,
            salvage: AstList::new(),
            base_stops,
        }
    }

    /// The scanner.
    pub fn scanner(&mut self) -> &mut Scanner<'a> {
        &mut self.scanner
    }

    /// The scanner, read-only.
    #[must_use]
    pub fn scanner_ref(&self) -> &Scanner<'a> {
        &self.scanner
    }

    /// The registry driving this parse.
    #[must_use]
    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    /// The options driving this parse.
    #[must_use]
    pub fn options(&self) -> &'a Options {
        self.options
    }

    /// Parses nested content at the current position until `stop` matches,
    /// end of input, or a fatal error.
    pub fn dispatch(&mut self, stop: &Stop<'_>) -> Result<AstList, Failure> {
        dispatch::dispatch(self, stop)
    }

    /// Runs a speculative parse. On any failure the scanner, the open stack,
    /// and the diagnostics are restored to their state before the attempt.
    pub fn attempt<T>(
        &mut self,
        body: impl FnOnce(&mut Self) -> Result<T, Failure>,
    ) -> Result<T, Failure> {
        let scanner = self.scanner.checkpoint();
        let stack_len = self.stack.len();
        let diagnostics_len = self.diagnostics.len();
        match body(self) {
            Ok(value) => Ok(value),
            Err(failure) => {
                self.scanner.rewind(scanner);
                self.stack.truncate(stack_len);
                self.diagnostics.truncate(diagnostics_len);
                Err(failure)
            }
        }
    }

    /// Pushes a construct onto the open stack. Call after consuming the
    /// opening marker.
    pub fn push(&mut self, kind: ConstructKind, offset: usize) {
        self.stack.push(OpenConstruct { kind, offset });
    }

    /// Pops a construct from the open stack, which must be `kind` on top.
    /// A mismatch is recorded as a diagnostic rather than panicking, since a
    /// custom construct parser may pair these incorrectly.
    pub fn pop(&mut self, kind: ConstructKind) -> Result<(), Failure> {
        match self.stack.pop() {
            Some(open) if open.kind == kind => Ok(()),
            open => {
                log::warn!("popped {kind} but the stack top was {open:?}");
                let offset = self.scanner.offset();
                self.diagnose(
                    DiagnosticKind::StackMismatch { kind },
                    Span::new(offset, offset),
                )
            }
        }
    }

    /// Returns true if any of `kinds` is on the open stack.
    #[must_use]
    pub fn any_open(&self, kinds: &[ConstructKind]) -> bool {
        self.stack.iter().any(|open| kinds.contains(&open.kind))
    }

    /// Records a recoverable problem, or fails the parse with
    /// [`Fatal::Strict`] when strict mode is enabled.
    pub fn diagnose(&mut self, kind: DiagnosticKind, span: Span) -> Result<(), Failure> {
        let diagnostic = Diagnostic {
            at: self.map.find_line_col(span.start),
            kind,
            span,
        };
        if self.options.strict {
            log::debug!("strict mode aborting on {diagnostic}");
            return Err(Failure::Fatal(Fatal::Strict(diagnostic)));
        }
        log::trace!("diagnostic: {diagnostic}");
        self.diagnostics.push(diagnostic);
        Ok(())
    }

    /// Builds a [`Failure::Malformed`] spanning from `start` to the current
    /// position. The dispatcher records the diagnostic when it unwinds the
    /// construct.
    #[must_use]
    pub fn malformed(&self, kind: DiagnosticKind, start: usize) -> Failure {
        Failure::Malformed(Diagnostic {
            at: self.map.find_line_col(start),
            kind,
            span: Span::new(start, self.scanner.offset()),
        })
    }

    /// Enters one level of construct nesting.
    pub fn enter(&mut self, offset: usize) -> Result<(), Failure> {
        if self.depth >= self.options.max_recursion_depth {
            log::debug!("recursion limit {} hit at {offset}", self.depth);
            return Err(Failure::Fatal(Fatal::RecursionLimit { offset }));
        }
        self.depth += 1;
        Ok(())
    }

    /// Leaves one level of construct nesting.
    pub fn leave(&mut self) {
        self.depth -= 1;
    }

    /// The line and column of a byte offset.
    #[must_use]
    pub fn line_col(&self, offset: usize) -> LineCol {
        self.map.find_line_col(offset)
    }

    /// Folds a dispatch frame's output into the salvage list during fatal
    /// unwinding, keeping outer content before inner content.
    pub(crate) fn merge_salvage(&mut self, mut frame: AstList) {
        frame.append(core::mem::take(&mut self.salvage));
        self.salvage = frame;
    }

    /// The base stop table for literal runs.
    pub(crate) fn base_stops(&self) -> &ByteSet {
        &self.base_stops
    }

    /// Consumes the context, returning the salvaged values and diagnostics.
    pub(crate) fn finish(self) -> (AstList, Vec<Diagnostic>) {
        (self.salvage, self.diagnostics)
    }
}
