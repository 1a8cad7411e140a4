//! Identity resolution.
//!
//! Builds a phone -> name directory from `contacts.csv` and rewrites the
//! sender and counterpart of every message. Handles with no matching contact
//! keep their raw value. Direct messages always leave the resolver with an
//! empty counterpart column.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::csv_codec::{self, Quoting, TableWriter};
use crate::error::Result;
use crate::models::{ContactRow, Message, MessageColumns, SELF_SENDER};
use crate::phone::{normalize, NormalizedPhone};
use crate::schema::{chat_csv, files};

/// Which contact keeps a phone number claimed by more than one person
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// The row read last replaces earlier owners
    #[default]
    LastWriteWins,
    /// The first owner is kept, later claims are ignored
    FirstWriteWins,
}

/// Phone key -> display name lookup
#[derive(Debug, Clone, Default)]
pub struct ContactDirectory {
    names: HashMap<NormalizedPhone, String>,
    policy: CollisionPolicy,
    collisions: usize,
}

impl ContactDirectory {
    /// Empty directory using `policy` for duplicate keys
    #[must_use]
    pub fn new(policy: CollisionPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Build from contact rows in order
    #[must_use]
    pub fn from_rows<'a, I>(rows: I, policy: CollisionPolicy) -> Self
    where
        I: IntoIterator<Item = &'a ContactRow>,
    {
        let mut directory = Self::new(policy);
        for row in rows {
            directory.insert(row.phone_number.clone(), &row.full_name);
        }
        directory
    }

    /// Register a number. Empty keys and empty names are ignored.
    pub fn insert(&mut self, phone: NormalizedPhone, name: &str) {
        if phone.is_empty() || name.is_empty() {
            return;
        }

        match self.names.entry(phone) {
            Entry::Vacant(slot) => {
                slot.insert(name.to_string());
            },
            Entry::Occupied(mut slot) => {
                if slot.get() == name {
                    return;
                }
                self.collisions += 1;
                debug!(
                    phone = %slot.key(),
                    kept = ?self.policy,
                    previous = %slot.get(),
                    incoming = name,
                    "Phone number claimed by two contacts"
                );
                if self.policy == CollisionPolicy::LastWriteWins {
                    *slot.get_mut() = name.to_string();
                }
            },
        }
    }

    /// Display name for a raw handle, if its normalized form is known
    #[must_use]
    pub fn lookup(&self, handle: &str) -> Option<&str> {
        if handle == SELF_SENDER {
            return None;
        }
        let key = normalize(handle);
        if key.is_empty() {
            return None;
        }
        self.names.get(&key).map(String::as_str)
    }

    /// Distinct phone keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True when no numbers are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Keys that were claimed by more than one distinct name
    #[must_use]
    pub const fn collisions(&self) -> usize {
        self.collisions
    }

    /// Rewrite one message in place; returns how many fields were resolved.
    pub fn resolve(&self, message: &mut Message) -> usize {
        let mut resolved = 0;

        if let Some(name) = self.lookup(&message.sender) {
            message.sender = name.to_string();
            resolved += 1;
        }

        if message.is_group_chat {
            if let Some(name) = self.lookup(&message.contact_identifier) {
                message.contact_identifier = name.to_string();
                resolved += 1;
            }
        } else {
            message.contact_identifier.clear();
            message.group_chat_name = None;
        }

        resolved
    }
}

/// Counts from one resolution pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionStats {
    /// Messages written to the resolved table
    pub messages: usize,
    /// Messages whose sender became a contact name
    pub resolved_senders: usize,
    /// Messages whose sender stayed a raw phone/email handle
    pub unresolved_senders: usize,
    /// Rows dropped as malformed
    pub skipped: usize,
    /// Phone keys claimed by more than one contact
    pub collisions: usize,
}

/// Resolve a batch of messages in memory
pub fn resolve_messages(directory: &ContactDirectory, messages: &mut [Message]) -> ResolutionStats {
    let mut stats = ResolutionStats {
        messages: messages.len(),
        collisions: directory.collisions(),
        ..ResolutionStats::default()
    };

    for message in messages.iter_mut() {
        let original_sender = message.sender.clone();
        directory.resolve(message);
        if message.sender != original_sender {
            stats.resolved_senders += 1;
        } else if message.sender != SELF_SENDER {
            stats.unresolved_senders += 1;
        }
    }

    stats
}

/// Read every well-formed message from a chat table file; returns messages and skipped rows.
pub fn read_messages(path: &Path) -> Result<(Vec<Message>, usize)> {
    let table = csv_codec::read_table_file(path)?;
    let file_name = path
        .file_name()
        .map_or_else(String::new, |name| name.to_string_lossy().into_owned());
    let columns = MessageColumns::locate(&table, &file_name)?;

    let mut skipped = table.skipped;
    let mut messages = Vec::with_capacity(table.rows.len());
    for (index, row) in table.rows.iter().enumerate() {
        match columns.parse(row) {
            Ok(message) => messages.push(message),
            Err(reason) => {
                debug!(row = index + 1, %reason, "Skipping malformed message row");
                skipped += 1;
            },
        }
    }

    Ok((messages, skipped))
}

/// Write a resolved table. The file is staged and renamed so readers never
/// see a partial table.
pub fn write_resolved(messages: &[Message], dest: &Path) -> Result<()> {
    let staged = csv_codec::staging_path(dest);
    let mut writer = TableWriter::create(&staged, &chat_csv::PROCESSED_HEADER, Quoting::Necessary)?;
    for message in messages {
        writer.write_row(message.to_record())?;
    }
    writer.finish()?;
    csv_codec::commit_staged(dest)
}

/// Join `contacts.csv` with `formatted_all_chat_data.csv` into `processed_messages.csv`.
pub fn resolve_identities(data_dir: &Path, policy: CollisionPolicy) -> Result<ResolutionStats> {
    let contacts = crate::contacts::read_contacts(&data_dir.join(files::CONTACTS))?;
    let directory = ContactDirectory::from_rows(&contacts.rows, policy);
    info!(numbers = directory.len(), collisions = directory.collisions(), "Contact directory built");

    let (mut messages, skipped) = read_messages(&data_dir.join(files::FORMATTED_CHAT_DATA))?;
    let mut stats = resolve_messages(&directory, &mut messages);
    stats.skipped = skipped + contacts.skipped;

    write_resolved(&messages, &data_dir.join(files::PROCESSED_MESSAGES))?;

    if stats.skipped > 0 {
        warn!(skipped = stats.skipped, "Skipped malformed rows during resolution");
    }
    info!(
        messages = stats.messages,
        resolved = stats.resolved_senders,
        unresolved = stats.unresolved_senders,
        "Labeled all messages"
    );
    Ok(stats)
}
