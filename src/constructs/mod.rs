//! The built-in construct parsers.
//!
//! Each module holds the parser(s) for one construct family, wired to their
//! trigger markers by [`Registry::default`](crate::Registry::default). Every
//! parser follows the same shape: consume the opening marker, push the
//! construct onto the open stack, dispatch the interior with the right stop
//! condition, then require the closing marker or fail `Malformed`.

pub(crate) mod braces;
pub(crate) mod format;
pub(crate) mod heading;
pub(crate) mod link;
pub(crate) mod list;
pub(crate) mod table;
pub(crate) mod tag;
