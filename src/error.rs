//! Error types for schema unification and conversion.

use crate::schema::{FieldPath, ObservedType};
use arrow::error::ArrowError;
use parquet::errors::ParquetError;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while unifying a JSON stream or converting it to Parquet.
#[derive(Debug, Error)]
pub enum Error {
    /// A delimited unit is not valid JSON.
    #[error("failed to decode JSON document: {source}")]
    Decode {
        #[source]
        source: simd_json::Error,
    },

    /// Two observations for the same path cannot be merged under the current config.
    #[error("type conflict at `{path}`: {existing} vs {incoming}")]
    TypeConflict {
        path: FieldPath,
        existing: ObservedType,
        incoming: ObservedType,
    },

    /// `finalize` was called before any document was ingested.
    #[error("no documents were ingested, cannot build a schema")]
    EmptyInput,

    /// A string looked temporal but broke a precision or range constraint.
    #[error("invalid temporal value {value:?} at `{path}`: {reason}")]
    TemporalParse {
        path: FieldPath,
        value: String,
        reason: TemporalParseError,
    },

    /// Materialization could not decode a record against the unified schema.
    #[error("failed to decode record at line {line}: {source}")]
    RecordDecode {
        line: usize,
        #[source]
        source: ArrowError,
    },

    /// The columnar writer failed; `rows_written` counts rows committed before the failure.
    #[error("columnar writer failed after {rows_written} rows: {source}")]
    Writer {
        rows_written: usize,
        #[source]
        source: WriterError,
    },

    /// `unify_scan` was called on a unifier built without an input source.
    #[error("no input reader configured")]
    NoReader,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("arrow error: {0}")]
    Arrow(#[from] ArrowError),
}

impl Error {
    /// The path involved in a conflict or temporal failure, if any.
    pub fn path(&self) -> Option<&FieldPath> {
        match self {
            Error::TypeConflict { path, .. } | Error::TemporalParse { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Precision or range violation in a string that matched a temporal shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemporalParseError {
    #[error("fractional seconds have {digits} digits, at most {max} are supported")]
    FractionTooLong { digits: usize, max: usize },

    #[error("{component} {value} is out of range")]
    OutOfRange { component: &'static str, value: u32 },
}

/// Failures reported by a [`ColumnarWriter`](crate::convert::ColumnarWriter).
#[derive(Debug, Error)]
pub enum WriterError {
    #[error(transparent)]
    Parquet(#[from] ParquetError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}
