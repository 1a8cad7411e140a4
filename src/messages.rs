//! Message extraction.
//!
//! Streams every text message out of the message store into
//! `all_chat_data.csv`, newest first, then re-reads that file to produce the
//! formatted variant with malformed rows removed.

use std::path::Path;

use chrono::{DateTime, Local, NaiveDateTime};
use tracing::{debug, info, warn};

use crate::csv_codec::{self, Quoting, TableWriter};
use crate::error::Result;
use crate::models::{Message, SELF_SENDER};
use crate::queries::{ALL_MESSAGES, APPLE_EPOCH_OFFSET, GROUP_CHAT_STYLE};
use crate::schema::{chat_csv, files};
use crate::store::{is_value_error, lossy_text, SourceStore};

/// Sender label for received messages whose handle is gone
pub const UNKNOWN_SENDER: &str = "Unknown";

/// Name given to a group chat with neither display name nor identifier
pub const UNNAMED_GROUP: &str = "Unnamed Group";

const NANOS_PER_SECOND: i64 = 1_000_000_000;

// Second-resolution dates stay far below this; nanosecond ones pass it 17 minutes into 2001.
const NANOSECOND_DATE_THRESHOLD: u64 = 1_000_000_000_000;

/// Outcome of an extraction or formatting pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageExport {
    /// Rows written
    pub rows: usize,
    /// Rows dropped
    pub skipped: usize,
}

/// Convert a message store date to Unix seconds.
///
/// Current stores count nanoseconds since 2001-01-01; older ones counted seconds.
#[must_use]
pub const fn to_unix_seconds(native: i64) -> i64 {
    let seconds = if native.unsigned_abs() >= NANOSECOND_DATE_THRESHOLD {
        native.div_euclid(NANOS_PER_SECOND)
    } else {
        native
    };
    seconds + APPLE_EPOCH_OFFSET
}

/// Local wall-clock time for Unix seconds
#[must_use]
pub fn local_time(unix_seconds: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp(unix_seconds, 0).map(|utc| utc.with_timezone(&Local).naive_local())
}

struct StoreRow {
    date: Option<i64>,
    is_from_me: bool,
    handle: Option<String>,
    handle_rowid: Option<i64>,
    text: String,
    chat_style: Option<i64>,
    display_name: Option<String>,
    chat_identifier: Option<String>,
}

impl StoreRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            date: row.get(0)?,
            is_from_me: row.get::<_, Option<i64>>(1)?.unwrap_or_default() == 1,
            handle: lossy_text(row, 2)?,
            handle_rowid: row.get(3)?,
            text: lossy_text(row, 4)?.unwrap_or_default(),
            chat_style: row.get(5)?,
            display_name: lossy_text(row, 6)?,
            chat_identifier: lossy_text(row, 7)?,
        })
    }

    fn into_message(self) -> Option<Message> {
        let timestamp = to_unix_seconds(self.date?);
        let readable_time = local_time(timestamp)?;
        let is_group_chat = self.chat_style == Some(GROUP_CHAT_STYLE);

        let group_chat_name = is_group_chat.then(|| {
            [self.display_name, self.chat_identifier]
                .into_iter()
                .flatten()
                .map(|name| csv_codec::sanitize_free_text(name.trim()))
                .find(|name| !name.is_empty())
                .unwrap_or_else(|| UNNAMED_GROUP.to_string())
        });

        let sender = if self.is_from_me {
            SELF_SENDER.to_string()
        } else {
            self.handle.clone().unwrap_or_else(|| UNKNOWN_SENDER.to_string())
        };

        Some(Message {
            timestamp,
            readable_time,
            sender,
            sender_id: self.handle_rowid,
            text: csv_codec::sanitize_free_text(&self.text),
            is_group_chat,
            group_chat_name,
            is_from_me: self.is_from_me,
            contact_identifier: self.handle.unwrap_or_default(),
        })
    }
}

/// Visit every message in store order (newest first).
///
/// Rows with no usable date or an unconvertible value are skipped and
/// counted; only a failing query is fatal.
pub fn for_each_message<F>(store: &SourceStore, mut visit: F) -> Result<MessageExport>
where
    F: FnMut(Message) -> Result<()>,
{
    let mut stmt = store.prepare(ALL_MESSAGES)?;
    let mut rows = stmt.query([]).map_err(|e| store.access_error(e))?;

    let mut export = MessageExport::default();
    while let Some(row) = rows.next().map_err(|e| store.access_error(e))? {
        let raw = match StoreRow::from_row(row) {
            Ok(raw) => raw,
            Err(e) if is_value_error(&e) => {
                debug!(error = %e, "Skipping message with an unreadable column");
                export.skipped += 1;
                continue;
            },
            Err(e) => return Err(store.access_error(e)),
        };
        match raw.into_message() {
            Some(message) => {
                visit(message)?;
                export.rows += 1;
            },
            None => {
                debug!("Skipping message without a usable date");
                export.skipped += 1;
            },
        }
    }

    Ok(export)
}

/// Collect every message in store order
pub fn extract_messages(store: &SourceStore) -> Result<Vec<Message>> {
    let mut messages = Vec::new();
    for_each_message(store, |message| {
        messages.push(message);
        Ok(())
    })?;
    Ok(messages)
}

/// Extract the store at `store_path` into `data_dir/all_chat_data.csv`.
///
/// Rows are written as they are read; a failure midway leaves the rows
/// already written on disk.
pub fn export_messages(store_path: &Path, data_dir: &Path) -> Result<MessageExport> {
    let store = SourceStore::open(store_path)?;
    info!(path = %store.path().display(), "Reading messages");

    let dest = data_dir.join(files::CHAT_DATA);
    let mut writer = TableWriter::create(&dest, &chat_csv::HEADER, Quoting::Always)?;
    let export = for_each_message(&store, |message| writer.write_row(message.to_record()))?;
    writer.finish()?;

    if export.skipped > 0 {
        warn!(skipped = export.skipped, "Skipped unreadable messages");
    }
    info!(rows = export.rows, path = %dest.display(), "Chat data exported");
    Ok(export)
}

/// Rewrite `all_chat_data.csv` as `formatted_all_chat_data.csv`, dropping
/// rows whose column count differs from the header and quoting every field.
pub fn format_chat_data(data_dir: &Path) -> Result<MessageExport> {
    let source = data_dir.join(files::CHAT_DATA);
    let table = csv_codec::read_table_file(&source)?;

    let dest = data_dir.join(files::FORMATTED_CHAT_DATA);
    let staged = csv_codec::staging_path(&dest);
    let header: Vec<&str> = table.headers.iter().map(String::as_str).collect();
    let mut writer = TableWriter::create(&staged, &header, Quoting::Always)?;
    for row in &table.rows {
        writer.write_row(row)?;
    }
    let rows = writer.rows_written();
    writer.finish()?;
    csv_codec::commit_staged(&dest)?;

    if table.skipped > 0 {
        warn!(skipped = table.skipped, "Dropped rows with inconsistent column counts");
    }
    info!(rows, path = %dest.display(), "Formatted chat data saved");
    Ok(MessageExport {
        rows,
        skipped: table.skipped,
    })
}
