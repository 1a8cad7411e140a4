//! Shared CSV reading and writing for every intermediate table.
//!
//! Quoting rules (RFC 4180):
//!
//! - Fields are separated by `,`, records by `\n`.
//! - A field containing `,`, `"` or a line break is wrapped in double quotes;
//!   with [`Quoting::Always`] every field is wrapped.
//! - An embedded `"` is written as `""` and read back as a single `"`.
//! - The first record is the header. A data record whose field count differs
//!   from the header is skipped and counted, never fatal.
//!
//! Free text coming out of the message store is passed through
//! [`sanitize_free_text`] before it is written, so a stored row always
//! occupies exactly one physical line.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use csv::{QuoteStyle, ReaderBuilder, WriterBuilder};
use tracing::debug;

use crate::error::{AnalysisError, MalformedRow, Result};

/// How aggressively fields are quoted on write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quoting {
    /// Quote only fields that need it
    #[default]
    Necessary,
    /// Quote every field
    Always,
}

impl From<Quoting> for QuoteStyle {
    fn from(quoting: Quoting) -> Self {
        match quoting {
            Quoting::Necessary => Self::Necessary,
            Quoting::Always => Self::Always,
        }
    }
}

/// A fully read CSV file: header, well-formed rows and the number of rows dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    /// Header labels in file order
    pub headers: Vec<String>,
    /// Rows whose width matches the header
    pub rows: Vec<Vec<String>>,
    /// Rows dropped as malformed
    pub skipped: usize,
}

impl Table {
    /// Position of a header label
    #[must_use]
    pub fn column(&self, label: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == label)
    }

    /// Position of a header label, or a `MissingColumn` error naming `file`
    pub fn require_column(&self, label: &str, file: &str) -> Result<usize> {
        self.column(label).ok_or_else(|| AnalysisError::MissingColumn {
            file: file.to_string(),
            column: label.to_string(),
        })
    }
}

/// Check a record width against the header width
pub fn check_width(expected: usize, found: usize) -> std::result::Result<(), MalformedRow> {
    if expected == found {
        Ok(())
    } else {
        Err(MalformedRow::ColumnCount { expected, found })
    }
}

/// Read a CSV document with a header row from any reader.
pub fn read_table<R: Read>(reader: R) -> Result<Table> {
    let mut reader = ReaderBuilder::new().has_headers(true).flexible(true).from_reader(reader);

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_owned).collect();
    let mut table = Table {
        headers,
        ..Table::default()
    };

    for (index, record) in reader.records().enumerate() {
        // header is line 1
        let line = index + 2;
        let record = match record {
            Ok(record) => record,
            Err(err) if err.is_io_error() => return Err(err.into()),
            Err(err) => {
                debug!(line, error = %err, "Skipping unreadable row");
                table.skipped += 1;
                continue;
            },
        };

        if let Err(reason) = check_width(table.headers.len(), record.len()) {
            debug!(line, %reason, "Skipping malformed row");
            table.skipped += 1;
            continue;
        }

        table.rows.push(record.iter().map(str::to_owned).collect());
    }

    Ok(table)
}

/// Read a CSV file from disk
pub fn read_table_file(path: &Path) -> Result<Table> {
    let file = File::open(path)?;
    read_table(file)
}

/// Streaming CSV writer that emits the header on construction.
pub struct TableWriter<W: Write> {
    inner: csv::Writer<W>,
    rows_written: usize,
}

impl TableWriter<File> {
    /// Create (or truncate) `path` and write the header
    pub fn create(path: &Path, header: &[&str], quoting: Quoting) -> Result<Self> {
        let file = File::create(path)?;
        Self::new(file, header, quoting)
    }
}

impl<W: Write> TableWriter<W> {
    /// Wrap a writer and emit the header
    pub fn new(writer: W, header: &[&str], quoting: Quoting) -> Result<Self> {
        let mut inner = WriterBuilder::new().quote_style(quoting.into()).from_writer(writer);
        inner.write_record(header)?;
        Ok(Self { inner, rows_written: 0 })
    }

    /// Append one data row
    pub fn write_row<I, T>(&mut self, row: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        self.inner.write_record(row)?;
        self.rows_written += 1;
        Ok(())
    }

    /// Rows written so far, header excluded
    #[must_use]
    pub const fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Flush and hand back the underlying writer
    pub fn finish(self) -> Result<W> {
        self.inner
            .into_inner()
            .map_err(|err| AnalysisError::Io(err.into_error()))
    }
}

/// Sibling path a replace-only write is staged in (`name.csv` -> `name.csv.tmp`)
#[must_use]
pub fn staging_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    dest.with_file_name(name)
}

/// Move a finished staged file over `dest`
pub fn commit_staged(dest: &Path) -> Result<()> {
    fs::rename(staging_path(dest), dest)?;
    Ok(())
}

/// Replace every line break (`\r\n`, `\n`, `\r`) with a single space.
#[must_use]
pub fn sanitize_free_text(text: &str) -> String {
    text.replace("\r\n", " ").replace(['\n', '\r'], " ")
}
