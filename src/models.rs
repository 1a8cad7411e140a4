//! Data models for messages and contacts
//!
//! This module contains the record types that flow between pipeline stages and
//! their mapping to and from the intermediate CSV rows.

use std::collections::BTreeSet;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::csv_codec::Table;
use crate::error::{MalformedRow, Result};
use crate::phone::NormalizedPhone;
use crate::schema::{chat_csv, contacts_csv};

/// Sender label used for messages authored on this device
pub const SELF_SENDER: &str = "Me";

/// One archived message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Unix seconds
    pub timestamp: i64,
    /// Local wall-clock time of the message
    pub readable_time: NaiveDateTime,
    /// Raw handle, [`SELF_SENDER`], or resolved display name
    pub sender: String,
    /// Handle row id in the message store
    pub sender_id: Option<i64>,
    /// Message body, line breaks already flattened
    pub text: String,
    /// True for multi-party chats
    pub is_group_chat: bool,
    /// Group display name; `None` for direct messages
    pub group_chat_name: Option<String>,
    /// True when authored locally
    pub is_from_me: bool,
    /// Counterpart handle or resolved name; empty when not applicable
    pub contact_identifier: String,
}

impl Message {
    /// The other party of a direct message.
    ///
    /// Prefers the contact identifier; falls back to the sender for received
    /// messages. Sent messages without an identifier have no counterpart.
    #[must_use]
    pub fn counterpart(&self) -> Option<&str> {
        if !self.contact_identifier.is_empty() {
            Some(&self.contact_identifier)
        } else if !self.is_from_me && !self.sender.is_empty() {
            Some(&self.sender)
        } else {
            None
        }
    }

    /// Group name when this is a group message
    #[must_use]
    pub fn group_name(&self) -> Option<&str> {
        if self.is_group_chat {
            self.group_chat_name.as_deref()
        } else {
            None
        }
    }

    /// Serialize in [`chat_csv::HEADER`] order
    #[must_use]
    pub fn to_record(&self) -> Vec<String> {
        vec![
            self.timestamp.to_string(),
            self.readable_time.format(chat_csv::READABLE_TIME_FORMAT).to_string(),
            self.sender.clone(),
            self.sender_id.map(|id| id.to_string()).unwrap_or_default(),
            self.text.clone(),
            flag(self.is_group_chat).to_string(),
            self.group_chat_name.clone().unwrap_or_default(),
            flag(self.is_from_me).to_string(),
            self.contact_identifier.clone(),
        ]
    }
}

const fn flag(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

fn parse_flag(raw: &str) -> std::result::Result<bool, MalformedRow> {
    match raw.trim() {
        "1" | "true" | "TRUE" => Ok(true),
        "0" | "false" | "FALSE" | "" => Ok(false),
        other => Err(MalformedRow::InvalidFlag(other.to_string())),
    }
}

fn parse_timestamp(raw: &str) -> std::result::Result<i64, MalformedRow> {
    let trimmed = raw.trim();
    if let Ok(seconds) = trimmed.parse::<i64>() {
        return Ok(seconds);
    }
    // older exports wrote seconds as a double
    match trimmed.parse::<f64>() {
        #[allow(clippy::cast_possible_truncation)]
        Ok(seconds) if seconds.is_finite() => Ok(seconds.floor() as i64),
        _ => Err(MalformedRow::InvalidTimestamp(raw.to_string())),
    }
}

/// Column positions of the message fields inside a table header.
#[derive(Debug, Clone, Copy)]
pub struct MessageColumns {
    timestamp: usize,
    readable_time: usize,
    sender: usize,
    sender_id: usize,
    text: usize,
    group_chat: usize,
    group_chat_name: usize,
    sent_by_me: usize,
    contact_identifier: usize,
}

impl MessageColumns {
    /// Locate every message column by label; the counterpart may be labeled
    /// either `To` or `Contact Identifier`.
    pub fn locate(table: &Table, file: &str) -> Result<Self> {
        let contact_identifier = match table.column(chat_csv::TO) {
            Some(index) => index,
            None => table.require_column(chat_csv::CONTACT_IDENTIFIER, file)?,
        };

        Ok(Self {
            timestamp: table.require_column(chat_csv::TIMESTAMP, file)?,
            readable_time: table.require_column(chat_csv::READABLE_TIME, file)?,
            sender: table.require_column(chat_csv::SENDER, file)?,
            sender_id: table.require_column(chat_csv::SENDER_ID, file)?,
            text: table.require_column(chat_csv::MESSAGE, file)?,
            group_chat: table.require_column(chat_csv::GROUP_CHAT, file)?,
            group_chat_name: table.require_column(chat_csv::GROUP_CHAT_NAME, file)?,
            sent_by_me: table.require_column(chat_csv::SENT_BY_ME, file)?,
            contact_identifier,
        })
    }

    /// Build a message from one well-formed row.
    ///
    /// An empty group name is normalized to `None`, and direct messages never
    /// carry one.
    pub fn parse(&self, row: &[String]) -> std::result::Result<Message, MalformedRow> {
        let field = |index: usize| row.get(index).map_or("", String::as_str);

        let readable_raw = field(self.readable_time);
        let readable_time = NaiveDateTime::parse_from_str(readable_raw.trim(), chat_csv::READABLE_TIME_FORMAT)
            .map_err(|_| MalformedRow::InvalidDate(readable_raw.to_string()))?;
        let timestamp = parse_timestamp(field(self.timestamp))?;
        let is_group_chat = parse_flag(field(self.group_chat))?;
        let is_from_me = parse_flag(field(self.sent_by_me))?;

        let group_chat_name = Some(field(self.group_chat_name).trim())
            .filter(|name| is_group_chat && !name.is_empty())
            .map(str::to_string);

        Ok(Message {
            timestamp,
            readable_time,
            sender: field(self.sender).to_string(),
            sender_id: field(self.sender_id).trim().parse().ok(),
            text: field(self.text).to_string(),
            is_group_chat,
            group_chat_name,
            is_from_me,
            contact_identifier: field(self.contact_identifier).to_string(),
        })
    }
}

/// A person from the contacts store with every number they own
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Contact {
    /// Trimmed "first last"
    pub full_name: String,
    /// First name, may be empty
    pub first_name: String,
    /// Last name, may be empty
    pub last_name: String,
    /// Normalized phone keys
    pub phone_numbers: BTreeSet<NormalizedPhone>,
}

impl Contact {
    /// Build a contact, deriving the full name from first and last
    #[must_use]
    pub fn new(first_name: &str, last_name: &str) -> Self {
        Self {
            full_name: format!("{first_name} {last_name}").trim().to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            phone_numbers: BTreeSet::new(),
        }
    }

    /// One row per phone number
    pub fn rows(&self) -> impl Iterator<Item = ContactRow> + '_ {
        self.phone_numbers.iter().map(|phone| ContactRow {
            full_name: self.full_name.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            phone_number: phone.clone(),
        })
    }
}

/// One (person, phone number) row of `contacts.csv`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactRow {
    /// Trimmed "first last"
    pub full_name: String,
    /// First name
    pub first_name: String,
    /// Last name
    pub last_name: String,
    /// Normalized phone key
    pub phone_number: NormalizedPhone,
}

impl ContactRow {
    /// Serialize in [`contacts_csv::HEADER`] order
    #[must_use]
    pub fn to_record(&self) -> [String; 4] {
        [
            self.full_name.clone(),
            self.first_name.clone(),
            self.last_name.clone(),
            self.phone_number.to_string(),
        ]
    }
}
