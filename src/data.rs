//! Row-major numeric table loaded from delimiter-separated text

use crate::error::Error;
use crate::Result;
use ndarray::ArrayView2;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use tracing::{debug, trace};

/// Labelled numeric table stored as one contiguous row-major buffer.
///
/// The value at `(row, col)` lives at `row * col_count + col`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    /// One identifier per row, in file order
    row_labels: Vec<String>,
    /// Flattened matrix, `row_labels.len() * col_count` entries
    values: Vec<f64>,
    /// Numeric fields per row, fixed by the first data row
    col_count: usize,
}

impl Table {
    /// Create an empty table with no rows and no columns.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from labels and an already flattened row-major buffer.
    pub fn from_parts(row_labels: Vec<String>, values: Vec<f64>, col_count: usize) -> Result<Self> {
        let expected = row_labels.len() * col_count;
        if values.len() != expected {
            return Err(Error::DimensionMismatch {
                expected,
                found: values.len(),
            });
        }

        Ok(Self {
            row_labels,
            values,
            col_count,
        })
    }

    /// Load a table from a delimited text file.
    ///
    /// # Arguments
    /// * `path` - File to read; its first line is a header and is always discarded
    /// * `separator` - Single ASCII field separator, typically `'\t'` or `','`
    ///
    /// The first field of each data line is the row label, kept verbatim. The
    /// remaining fields are trimmed and parsed as `f64`; a field that does not
    /// parse is stored as `0.0`. Every data line must carry as many numeric
    /// fields as the first one. Empty and whitespace-only lines are skipped.
    pub fn from_path<P: AsRef<Path>>(path: P, separator: char) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let table = ingest(file, separator, path)?;
        debug!(
            path = %path.display(),
            rows = table.row_count(),
            cols = table.col_count(),
            "table ingested"
        );
        Ok(table)
    }

    /// Load a table from any reader using the same rules as [`Table::from_path`].
    pub fn from_reader<R: Read>(reader: R, separator: char) -> Result<Self> {
        ingest(reader, separator, Path::new("<reader>"))
    }

    /// Number of rows (observations).
    pub fn row_count(&self) -> usize {
        self.row_labels.len()
    }

    /// Number of numeric columns per row.
    pub fn col_count(&self) -> usize {
        self.col_count
    }

    pub fn is_empty(&self) -> bool {
        self.row_labels.is_empty()
    }

    /// Bounds-checked access to the value at `(row, col)`.
    pub fn get(&self, row: usize, col: usize) -> Result<f64> {
        if row >= self.row_count() || col >= self.col_count {
            return Err(self.out_of_range(row, col));
        }
        Ok(self.values[row * self.col_count + col])
    }

    /// All values of one row.
    pub fn row(&self, row: usize) -> Result<&[f64]> {
        if row >= self.row_count() {
            return Err(self.out_of_range(row, 0));
        }
        let start = row * self.col_count;
        Ok(&self.values[start..start + self.col_count])
    }

    /// Iterate over rows in file order.
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> + '_ {
        let cols = self.col_count;
        (0..self.row_count()).map(move |row| &self.values[row * cols..(row + 1) * cols])
    }

    pub fn label(&self, row: usize) -> Option<&str> {
        self.row_labels.get(row).map(String::as_str)
    }

    pub fn labels(&self) -> &[String] {
        &self.row_labels
    }

    /// The flat row-major buffer.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Borrow the buffer as a `row_count x col_count` matrix without copying.
    pub fn view(&self) -> Result<ArrayView2<'_, f64>> {
        ArrayView2::from_shape((self.row_count(), self.col_count), &self.values).map_err(|_| {
            Error::DimensionMismatch {
                expected: self.row_count() * self.col_count,
                found: self.values.len(),
            }
        })
    }

    fn out_of_range(&self, row: usize, col: usize) -> Error {
        Error::IndexOutOfRange {
            row,
            col,
            row_count: self.row_count(),
            col_count: self.col_count,
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Table: {} rows x {} columns",
            self.row_count(),
            self.col_count
        )?;
        for (label, row) in self.row_labels.iter().zip(self.rows()) {
            write!(f, "{}", label)?;
            for value in row {
                write!(f, "\t{}", value)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Physical lines taken by the header.
const HEADER_LINES: u64 = 1;

/// Drop the first physical line, then read every remaining record into a new table.
///
/// Lines that are empty or hold only whitespace are skipped.
fn ingest<R: Read>(reader: R, separator: char, source: &Path) -> Result<Table> {
    let delimiter = separator_byte(separator)?;
    let mut reader = BufReader::new(reader);

    let mut header = Vec::new();
    reader
        .read_until(b'\n', &mut header)
        .map_err(|err| Error::Io {
            path: source.to_path_buf(),
            source: err,
        })?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .trim(csv::Trim::None)
        .from_reader(reader);

    let mut row_labels = Vec::new();
    let mut values = Vec::new();
    let mut col_count: Option<usize> = None;

    for record in reader.records() {
        let record = record.map_err(|err| read_error(source, err))?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        let line = record.position().map_or(0, |pos| pos.line()) + HEADER_LINES;

        let mut fields = record.iter();
        let label = fields.next().unwrap_or_default();

        let start = values.len();
        values.extend(fields.map(|field| parse_field(field, line)));
        let found = values.len() - start;

        match col_count {
            None => col_count = Some(found),
            Some(expected) if expected != found => {
                return Err(Error::MalformedRow {
                    line,
                    expected,
                    found,
                });
            }
            Some(_) => {}
        }

        row_labels.push(label.to_string());
    }

    Table::from_parts(row_labels, values, col_count.unwrap_or(0))
}

/// Lenient numeric parse: anything that is not a float becomes `0.0`.
fn parse_field(field: &str, line: u64) -> f64 {
    let field = field.trim();
    field.parse::<f64>().unwrap_or_else(|_| {
        trace!(line, field, "non-numeric field stored as 0.0");
        0.0
    })
}

fn separator_byte(separator: char) -> Result<u8> {
    if separator.is_ascii() {
        Ok(separator as u8)
    } else {
        Err(Error::InvalidSeparator(separator))
    }
}

fn read_error(source: &Path, err: csv::Error) -> Error {
    let line = err.position().map_or(0, |pos| pos.line()) + HEADER_LINES;
    match err.into_kind() {
        csv::ErrorKind::Io(io) => Error::Io {
            path: source.to_path_buf(),
            source: io,
        },
        kind => Error::Decode {
            path: source.to_path_buf(),
            line,
            message: format!("{:?}", kind),
        },
    }
}
