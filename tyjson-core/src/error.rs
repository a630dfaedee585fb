//! Error type surfaced by a parse.
//!
//! One error type carrying enough context to report a useful message plus a
//! source position, derived via `#[derive(thiserror::Error)]` rather than a
//! hand-written `Display` impl.

use crate::location::Location;
use core::fmt;

/// Failure kinds reported by the reader (`CharSource`) rather than by parsing
/// logic itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IoErrorKind {
    UnexpectedEof,
    InvalidUtf8,
    Other(&'static str),
}

impl fmt::Display for IoErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IoErrorKind::UnexpectedEof => write!(f, "unexpected end of input"),
            IoErrorKind::InvalidUtf8 => write!(f, "invalid UTF-8 byte sequence"),
            IoErrorKind::Other(msg) => write!(f, "{msg}"),
        }
    }
}

/// Everything that can go wrong during a type-directed parse.
///
/// Generic over `E`, the value builder's own error type, so a builder
/// failure (e.g. scalar coercion) keeps its native type instead of being
/// erased to a string.
#[derive(Debug, thiserror::Error)]
pub enum Error<E> {
    #[error("unsupported expected type")]
    UnsupportedType,

    #[error("reader failure: {0}")]
    Io(IoErrorKind),

    #[error("{message} at {at}")]
    Syntax {
        message: &'static str,
        at: Location,
    },

    #[error("required field `{name}` not present (scope closed at {at})")]
    RequiredFieldMissing { name: String, at: Location },

    #[error("closed list size mismatch: expected {expected}, got {actual} (at {at})")]
    ClosedListSizeMismatch {
        expected: usize,
        actual: usize,
        at: Location,
    },

    #[error("incompatible value: {0:?}")]
    Incompatible(E),

    #[error("empty JSON document")]
    EmptyDocument,

    #[error("invalid JSON document")]
    InvalidDocument,
}

pub type Result<T, E> = core::result::Result<T, Error<E>>;
