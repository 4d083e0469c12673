//! Error types for parsing.

use core::fmt;

/// The reason why an object could not be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// The `n g obj` header is missing or malformed.
    InvalidHeader,
    /// The header was fine, but the object after it isn't.
    InvalidObject,
    /// The data ended before the object did.
    UnexpectedEnd,
}

/// An error encountered while parsing a single object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseError {
    /// The offset of the object in the data it was parsed from.
    pub offset: usize,
    /// What went wrong.
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub(crate) fn new(offset: usize, kind: ParseErrorKind) -> Self {
        Self { offset, kind }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self.kind {
            ParseErrorKind::InvalidHeader => "invalid object header",
            ParseErrorKind::InvalidObject => "invalid object",
            ParseErrorKind::UnexpectedEnd => "unexpected end of data",
        };

        write!(f, "{reason} at offset {}", self.offset)
    }
}

impl core::error::Error for ParseError {}

/// An error encountered while applying a filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// No filter with this name is registered.
    Unknown(String),
    /// The filter exists but can't encode data.
    NoEncoder(String),
    /// The data is not valid for the filter.
    Corrupt(String),
    /// `/Filter` or `/DecodeParms` have an invalid shape.
    InvalidParameters,
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(name) => write!(f, "unknown filter {name}"),
            Self::NoEncoder(name) => write!(f, "filter {name} does not support encoding"),
            Self::Corrupt(name) => write!(f, "failed to apply filter {name}"),
            Self::InvalidParameters => f.write_str("invalid filter parameters"),
        }
    }
}

impl core::error::Error for FilterError {}
