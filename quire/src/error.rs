//! Error types.

use core::fmt;
use quire_syntax::{FilterError, ObjRef, ParseError};

/// A specialized [`Result`] type for graph operations.
pub type Result<T> = core::result::Result<T, Error>;

/// An error encountered while reading, editing or writing a document.
#[derive(Debug)]
pub enum Error {
    /// An object could not be parsed.
    Parse(ObjRef, ParseError),
    /// The reference points to data that doesn't contain the object, for
    /// example an offset outside of the file or an object with another
    /// identifier.
    BrokenReference(ObjRef),
    /// The reference points to a free entry, an unknown object number or an
    /// outdated generation.
    FreedReference(ObjRef),
    /// A value that can only appear inline was about to become an indirect
    /// object.
    DirectOnlyViolation,
    /// The writer has already been finalized.
    AlreadyClosed,
    /// The document was closed.
    UseAfterClose,
    /// Copying visited more objects than the source graph contains.
    CyclicCopyOverflow,
    /// The object was written and released, it can't be accessed anymore.
    Flushed(ObjRef),
    /// A stream filter failed.
    Filter(FilterError),
    /// The document lacks a required structure, like a cross-reference
    /// section or a catalog.
    Structure(&'static str),
    /// Writing the output failed.
    Io(std::io::Error),
}

impl Error {
    /// Whether the error is caused by damage to a single object, which the
    /// tolerant policy replaces by `null`.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Parse(..) | Self::BrokenReference(_) | Self::FreedReference(_)
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(r, e) => write!(f, "failed to parse object {r}: {e}"),
            Self::BrokenReference(r) => write!(f, "broken reference {r}"),
            Self::FreedReference(r) => write!(f, "reference {r} points to a free object"),
            Self::DirectOnlyViolation => {
                f.write_str("a direct-only value can't become an indirect object")
            }
            Self::AlreadyClosed => f.write_str("the writer was already finalized"),
            Self::UseAfterClose => f.write_str("the document was closed"),
            Self::CyclicCopyOverflow => {
                f.write_str("copying visited more objects than the source contains")
            }
            Self::Flushed(r) => write!(f, "object {r} was already flushed"),
            Self::Filter(e) => write!(f, "filter error: {e}"),
            Self::Structure(what) => write!(f, "invalid document structure: {what}"),
            Self::Io(e) => write!(f, "i/o error: {e}"),
        }
    }
}

impl core::error::Error for Error {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Parse(_, e) => Some(e),
            Self::Filter(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<FilterError> for Error {
    fn from(err: FilterError) -> Self {
        Self::Filter(err)
    }
}
