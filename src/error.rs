//! Error and diagnostic types.
//!
//! Two layers: recoverable problems accumulate as [`Diagnostic`]s on the
//! parse output while the broken markup degrades to literal text; fatal
//! problems abort the parse with an [`Error`]. Construct parsers report
//! through the internal [`Failure`] taxonomy, which additionally separates
//! "this is not my construct" from "my construct is broken".

use crate::codemap::{LineCol, Span};
use crate::registry::ConstructKind;

/// What went wrong at one place in the source.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum DiagnosticKind {
    /// A construct opened but its closing marker never arrived.
    #[error("unterminated {0}")]
    Unterminated(ConstructKind),

    /// A closing marker with no matching construct on the open stack.
    #[error("`{closer}` with no open {kind}")]
    MismatchedCloser {
        /// The stray closing marker.
        closer: &'static str,
        /// The construct kind the marker would have closed.
        kind: ConstructKind,
    },

    /// A comment with no `-->`.
    #[error("unclosed comment")]
    UnclosedComment,

    /// More than six `=` on both sides of a heading.
    #[error("heading level deeper than 6")]
    HeadingTooDeep,

    /// A lone `{` where a template, parameter, or argument name was expected.
    #[error("reserved `{{` in name")]
    ReservedBrace,

    /// An open tag whose close tag never arrived.
    #[error("missing `</{tag}>`")]
    MissingCloseTag {
        /// The tag name from the open tag.
        tag: String,
    },

    /// `{{#` that does not form `{{#name:`.
    #[error("malformed parser function")]
    MalformedFunction,

    /// A construct parser closed a construct other than the innermost open
    /// one. This indicates a bug in a custom construct parser.
    #[error("mismatched construct nesting while closing {kind}")]
    StackMismatch {
        /// The construct kind the parser tried to close.
        kind: ConstructKind,
    },
}

/// A recoverable problem found during parsing.
///
/// The markup it describes has already been degraded to literal text (or, for
/// partially parseable constructs like tables, to the structure recovered so
/// far), so the output tree is complete regardless.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("{at}: {kind}")]
pub struct Diagnostic {
    /// What went wrong.
    pub kind: DiagnosticKind,
    /// The affected source bytes.
    pub span: Span,
    /// The line and column of the start of the span.
    pub at: LineCol,
}

/// A fatal parse error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Construct nesting exceeded
    /// [`max_recursion_depth`](crate::Options::max_recursion_depth).
    #[error("recursion limit exceeded at {at}")]
    RecursionLimit {
        /// The tree built before the limit was hit.
        partial: crate::Output,
        /// Where the limit was hit.
        at: LineCol,
    },

    /// A recoverable problem promoted to an error by
    /// [`strict`](crate::Options::strict) mode.
    #[error("{0}")]
    Strict(Diagnostic),
}

/// Why a construct parser did not produce a value.
///
/// Returned by construct parsers registered with
/// [`Registry::register`](crate::Registry::register). The dispatcher rewinds
/// the scanner in every case; the variants differ in what happens next.
#[derive(Clone, Debug)]
pub enum Failure {
    /// The input does not begin this construct. The dispatcher silently
    /// tries the next candidate, then falls back to literal text.
    Mismatch,

    /// The construct definitely opened but is broken, e.g. its closer is
    /// missing. The dispatcher records the diagnostic and degrades the
    /// opening marker to literal text, or aborts in strict mode.
    Malformed(Diagnostic),

    /// Abort the whole parse.
    Fatal(Fatal),
}

/// A condition that aborts the whole parse.
#[derive(Clone, Debug)]
pub enum Fatal {
    /// The depth counter passed the configured limit.
    RecursionLimit {
        /// The byte offset where the limit was hit.
        offset: usize,
    },

    /// A recoverable problem under strict mode.
    Strict(Diagnostic),
}
