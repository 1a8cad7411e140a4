//! Read-only access to the SQLite source stores.

use std::path::{Path, PathBuf};

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, Row, Statement};
use tracing::debug;

use crate::error::{AnalysisError, Result};

/// A source store opened read-only. The file is never written.
pub struct SourceStore {
    conn: Connection,
    path: PathBuf,
}

impl SourceStore {
    /// Open `path` read-only.
    ///
    /// A missing file is `StoreMissing`; anything SQLite refuses is `StoreAccess`.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(AnalysisError::StoreMissing(path.to_path_buf()));
        }

        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags).map_err(|source| AnalysisError::StoreAccess {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "Opened source store");

        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Prepare a query, reporting failures as `StoreAccess`
    pub fn prepare(&self, sql: &str) -> Result<Statement<'_>> {
        self.conn.prepare(sql).map_err(|source| self.access_error(source))
    }

    /// Wrap a SQLite failure with this store's path
    #[must_use]
    pub fn access_error(&self, source: rusqlite::Error) -> AnalysisError {
        AnalysisError::StoreAccess {
            path: self.path.clone(),
            source,
        }
    }

    /// Path the store was opened from
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Read a column as text, replacing invalid UTF-8 with U+FFFD. NULL is `None`.
pub fn lossy_text(row: &Row<'_>, index: usize) -> rusqlite::Result<Option<String>> {
    Ok(match row.get_ref(index)? {
        ValueRef::Null => None,
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Integer(value) => Some(value.to_string()),
        ValueRef::Real(value) => Some(value.to_string()),
    })
}

/// True when a single value could not be converted; the row can be skipped
/// while the query itself stays usable.
#[must_use]
pub const fn is_value_error(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::FromSqlConversionFailure(..)
            | rusqlite::Error::InvalidColumnType(..)
            | rusqlite::Error::IntegralValueOutOfRange(..)
    )
}
