//! Table engine error types.

use std::io;
use thiserror::Error;

/// Classification of an [`Error::Io`] failure, mirroring the retry decision
/// the file backend makes around a single positional read/write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoErrorKind {
    /// The call was interrupted or would have blocked; safe to retry once.
    Retryable,
    /// Any other I/O failure; surfaced as-is.
    Terminal,
}

/// Errors produced by table operations.
///
/// This is a closed sum: every public operation documented in the
/// specification fails with exactly one of these variants, never a raw
/// `std::io::Error` or a boxed `dyn Error`.
#[derive(Error, Debug)]
pub enum Error {
    /// A field-by-name operation was attempted on a record not bound to a
    /// schema.
    #[error("record is detached from any schema")]
    DetachedRecord,

    /// A field name is not present in the schema.
    #[error("unknown field '{0}'")]
    UnknownField(String),

    /// `index_for`/`time_for` called on a table with `duration == 0`.
    #[error("table does not support time indexing (duration is 0)")]
    TimeNotSupported,

    /// `append` attempted past `ABSOLUTE_MAX_INDEX`.
    #[error("table has reached the absolute maximum record index")]
    TableIsFull,

    /// Malformed argument: empty schema, zero capacity, sentinel index, etc.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation is not legal in the table's current state (e.g. `set` on
    /// an empty table).
    #[error("logic error: {0}")]
    LogicError(String),

    /// Index, position or time outside the legal bounds for the operation.
    #[error("out of range: {0}")]
    OutOfRange(String),

    /// An in-range index failed to resolve to a position, or vice versa.
    /// Indicates an internal invariant violation rather than caller error.
    #[error("internal range mismatch: {0}")]
    RangeError(String),

    /// A strict value accessor was used against the wrong variant.
    #[error("type mismatch: expected {expected}, stored {stored}")]
    TypeMismatch {
        expected: &'static str,
        stored: &'static str,
    },

    /// A value accessor was used against a null value.
    #[error("no value stored")]
    NoValue,

    /// Lower-level I/O failure from the file backend.
    #[error("I/O error during {context}: {source}")]
    Io {
        context: &'static str,
        kind: IoErrorKind,
        #[source]
        source: io::Error,
    },

    /// File magic, version, or structural layout could not be parsed.
    #[error("bad file format: {0}")]
    BadFormat(String),
}

impl Error {
    /// Wrap a raw I/O error with the operation that produced it, classifying
    /// whether a single retry is appropriate.
    pub fn io(context: &'static str, source: io::Error) -> Self {
        let kind = match source.kind() {
            io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock => IoErrorKind::Retryable,
            _ => IoErrorKind::Terminal,
        };
        Error::Io {
            context,
            kind,
            source,
        }
    }
}

/// Convenience alias used throughout the crate's public API.
pub type Result<T> = std::result::Result<T, Error>;
