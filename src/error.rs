//! Error types for the result reader.

use std::panic::Location;
use thiserror::Error;

use crate::driver::{DiagnosticRecord, RetCode};

/// Result type alias for reader operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for reader operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The driver reported a failure.
    #[error("{}", driver_message(.code, .diagnostics))]
    Driver {
        code: RetCode,
        diagnostics: Vec<DiagnosticRecord>,
    },

    /// Wire type reported by the driver has no mapping.
    #[error("Unsupported SQL data type: {sql_type}")]
    UnsupportedType { sql_type: i16 },

    /// Wrong-typed or NULL value access.
    #[error("Invalid cast: {message}")]
    Cast { message: String },

    /// Text returned by the driver could not be converted.
    #[error("Type conversion error: {message}")]
    TypeConversion { message: String },

    /// Backward read under sequential access.
    #[error(
        "Invalid attempt to read from column {column} at offset {requested}; \
         {delivered} already consumed under sequential access"
    )]
    NonSequentialAccess {
        column: usize,
        requested: u64,
        delivered: u64,
    },

    /// Negative or otherwise invalid offset or length.
    #[error("Argument out of range: {name} = {value}")]
    ArgumentOutOfRange { name: &'static str, value: i64 },

    /// Operation on a closed reader.
    #[error("Invalid attempt to call {operation} when reader is closed")]
    Closed { operation: &'static str },

    /// Column access without a current row.
    #[error("No data exists for the row/column")]
    NoCurrentRow,

    /// Cancellation was requested.
    #[error("Operation canceled")]
    Canceled,

    /// Reader option could not be parsed.
    #[error("Invalid reader option: {message}")]
    InvalidOption { message: String },

    /// Column not found.
    #[error("Column not found: {name}")]
    ColumnNotFound { name: String },

    /// Column index out of bounds.
    #[error("Column index {index} out of bounds (columns: {count})")]
    ColumnIndexOutOfBounds { index: usize, count: usize },

    /// Scratch buffer overrun.
    #[error("Buffer too small: need {needed} bytes, have {available} at {location}")]
    BufferTooSmall {
        needed: usize,
        available: usize,
        location: &'static Location<'static>,
    },
}

impl Error {
    /// Create a driver error from a return code and its diagnostics.
    pub fn driver(code: RetCode, diagnostics: Vec<DiagnosticRecord>) -> Self {
        Self::Driver { code, diagnostics }
    }

    /// Create a cast error.
    pub fn cast(message: impl Into<String>) -> Self {
        Self::Cast {
            message: message.into(),
        }
    }

    /// Create a type conversion error.
    pub fn type_conversion(message: impl Into<String>) -> Self {
        Self::TypeConversion {
            message: message.into(),
        }
    }

    /// Create an argument-out-of-range error.
    pub fn out_of_range(name: &'static str, value: i64) -> Self {
        Self::ArgumentOutOfRange { name, value }
    }

    /// Diagnostic records carried by a driver error.
    pub fn diagnostics(&self) -> &[DiagnosticRecord] {
        match self {
            Error::Driver { diagnostics, .. } => diagnostics,
            _ => &[],
        }
    }

    /// Merge several driver errors into one, keeping every diagnostic.
    ///
    /// The return code of the first error wins. Non-driver errors contribute
    /// no diagnostics.
    pub(crate) fn merge(errors: Vec<Error>) -> Option<Error> {
        let mut iter = errors.into_iter();
        let first = iter.next()?;
        let Error::Driver {
            code,
            mut diagnostics,
        } = first
        else {
            return Some(first);
        };
        for err in iter {
            if let Error::Driver {
                diagnostics: more, ..
            } = err
            {
                diagnostics.extend(more);
            }
        }
        Some(Error::Driver { code, diagnostics })
    }
}

fn driver_message(code: &RetCode, diagnostics: &[DiagnosticRecord]) -> String {
    if diagnostics.is_empty() {
        return format!("{code} (no diagnostics)");
    }
    let mut message = code.to_string();
    for record in diagnostics {
        message.push_str(&format!("\nERROR [{}] {}", record.state, record.message));
    }
    message
}
