//! Error types shared by table ingestion and clustering

use std::path::PathBuf;
use thiserror::Error;

/// Failures surfaced by the table store and the clustering engine.
///
/// Non-numeric fields are not an error: ingestion substitutes `0.0` for them.
#[derive(Debug, Error)]
pub enum Error {
    /// The input could not be opened, or a read failed part-way through.
    #[error("I/O error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A record could not be decoded (for example invalid UTF-8).
    #[error("could not decode {} at line {line}: {message}", path.display())]
    Decode {
        path: PathBuf,
        line: u64,
        message: String,
    },

    /// The field separator must be a single ASCII character.
    #[error("separator {0:?} is not a single ASCII character")]
    InvalidSeparator(char),

    /// A data row carried a different number of numeric fields than the first one.
    #[error("malformed row at line {line}: expected {expected} numeric fields, found {found}")]
    MalformedRow {
        line: u64,
        expected: usize,
        found: usize,
    },

    /// `(row, col)` lies outside the table.
    #[error("index ({row}, {col}) out of range for a {row_count}x{col_count} table")]
    IndexOutOfRange {
        row: usize,
        col: usize,
        row_count: usize,
        col_count: usize,
    },

    /// `k` is zero or larger than the number of rows.
    #[error("invalid cluster count {k}: must be between 1 and the row count ({row_count})")]
    InvalidClusterCount { k: usize, row_count: usize },

    /// Clustering needs at least one row and one column.
    #[error("cannot cluster an empty table ({row_count} rows, {col_count} columns)")]
    EmptyInput { row_count: usize, col_count: usize },

    /// A tuning parameter violated its constraint.
    #[error("invalid parameter {name} = {value}: {constraint}")]
    InvalidParameter {
        name: &'static str,
        value: String,
        constraint: &'static str,
    },

    /// A point or buffer did not match the expected width.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_context() {
        let err = Error::MalformedRow {
            line: 4,
            expected: 2,
            found: 3,
        };
        assert!(err.to_string().contains("line 4"));

        let err = Error::IndexOutOfRange {
            row: 5,
            col: 0,
            row_count: 2,
            col_count: 2,
        };
        assert_eq!(
            err.to_string(),
            "index (5, 0) out of range for a 2x2 table"
        );
    }

    #[test]
    fn test_io_error_keeps_source() {
        let err = Error::Io {
            path: PathBuf::from("missing.tsv"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("missing.tsv"));
    }
}
