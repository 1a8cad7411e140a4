//! Shared fixtures: small SQLite stores shaped like the real message and
//! contacts databases.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use imessage_analysis::queries::{APPLE_EPOCH_OFFSET, GROUP_CHAT_STYLE};
use rusqlite::{params, Connection};

/// Chat style of a one-to-one conversation
pub const DIRECT_CHAT_STYLE: i64 = 45;

pub const ALICE_PHONE: &str = "+15551234567";
pub const BOB_PHONE: &str = "+15559876543";

/// Base instant for fixture messages (2023-11-14T22:13:20Z)
pub const T0: i64 = 1_700_000_000;

/// Unix seconds to a nanosecond store date
pub fn store_date(unix_seconds: i64) -> i64 {
    (unix_seconds - APPLE_EPOCH_OFFSET) * 1_000_000_000
}

pub struct Handle {
    pub rowid: i64,
    pub id: &'static str,
}

pub struct Chat {
    pub rowid: i64,
    pub style: i64,
    pub display_name: Option<&'static str>,
    pub chat_identifier: Option<&'static str>,
}

pub struct StoredMessage {
    pub date: i64,
    pub is_from_me: bool,
    pub handle_id: i64,
    pub text: Option<&'static str>,
    pub chat_id: Option<i64>,
}

impl StoredMessage {
    pub fn received(unix_seconds: i64, handle_id: i64, chat_id: i64, text: &'static str) -> Self {
        Self {
            date: store_date(unix_seconds),
            is_from_me: false,
            handle_id,
            text: Some(text),
            chat_id: Some(chat_id),
        }
    }

    pub fn sent(unix_seconds: i64, handle_id: i64, chat_id: i64, text: &'static str) -> Self {
        Self {
            is_from_me: true,
            ..Self::received(unix_seconds, handle_id, chat_id, text)
        }
    }
}

/// Build a message store at `path`
pub fn create_message_store(path: &Path, handles: &[Handle], chats: &[Chat], messages: &[StoredMessage]) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE handle (ROWID INTEGER PRIMARY KEY, id TEXT NOT NULL);
         CREATE TABLE chat (ROWID INTEGER PRIMARY KEY, style INTEGER, display_name TEXT, chat_identifier TEXT);
         CREATE TABLE message (
             ROWID INTEGER PRIMARY KEY, date INTEGER, is_from_me INTEGER, handle_id INTEGER, text TEXT
         );
         CREATE TABLE chat_message_join (chat_id INTEGER, message_id INTEGER);",
    )
    .unwrap();

    for handle in handles {
        conn.execute("INSERT INTO handle (ROWID, id) VALUES (?1, ?2)", params![handle.rowid, handle.id])
            .unwrap();
    }
    for chat in chats {
        conn.execute(
            "INSERT INTO chat (ROWID, style, display_name, chat_identifier) VALUES (?1, ?2, ?3, ?4)",
            params![chat.rowid, chat.style, chat.display_name, chat.chat_identifier],
        )
        .unwrap();
    }
    for (index, message) in messages.iter().enumerate() {
        let rowid = i64::try_from(index).unwrap() + 1;
        conn.execute(
            "INSERT INTO message (ROWID, date, is_from_me, handle_id, text) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![rowid, message.date, i64::from(message.is_from_me), message.handle_id, message.text],
        )
        .unwrap();
        if let Some(chat_id) = message.chat_id {
            conn.execute(
                "INSERT INTO chat_message_join (chat_id, message_id) VALUES (?1, ?2)",
                params![chat_id, rowid],
            )
            .unwrap();
        }
    }
}

pub struct Person {
    pub first: Option<&'static str>,
    pub last: Option<&'static str>,
    pub phones: &'static [&'static str],
}

/// Build a contacts store at `path`
pub fn create_contacts_store(path: &Path, people: &[Person]) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE ZABCDRECORD (Z_PK INTEGER PRIMARY KEY, ZFIRSTNAME TEXT, ZLASTNAME TEXT);
         CREATE TABLE ZABCDPHONENUMBER (Z_PK INTEGER PRIMARY KEY, ZOWNER INTEGER, ZFULLNUMBER TEXT);",
    )
    .unwrap();

    for (index, person) in people.iter().enumerate() {
        let pk = i64::try_from(index).unwrap() + 1;
        conn.execute(
            "INSERT INTO ZABCDRECORD (Z_PK, ZFIRSTNAME, ZLASTNAME) VALUES (?1, ?2, ?3)",
            params![pk, person.first, person.last],
        )
        .unwrap();
        for phone in person.phones {
            conn.execute(
                "INSERT INTO ZABCDPHONENUMBER (ZOWNER, ZFULLNUMBER) VALUES (?1, ?2)",
                params![pk, phone],
            )
            .unwrap();
        }
    }
}

/// Alice and Bob with one number each
pub fn alice_and_bob() -> Vec<Person> {
    vec![
        Person {
            first: Some("Alice"),
            last: None,
            phones: &["(555) 123-4567"],
        },
        Person {
            first: Some("Bob"),
            last: None,
            phones: &["555-987-6543"],
        },
    ]
}

/// Paths of a fixture with both stores built
pub struct Fixture {
    pub dir: tempfile::TempDir,
    pub message_store: PathBuf,
    pub contacts_store: PathBuf,
    pub data_dir: PathBuf,
}

/// Alice writes directly, Bob writes directly and in "Trip", the local user
/// writes once in "Trip" and once to Alice.
pub fn alice_bob_trip() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let message_store = dir.path().join("chat.db");
    let contacts_store = dir.path().join("AddressBook-v22.abcddb");
    let data_dir = dir.path().join("data");

    create_message_store(
        &message_store,
        &[
            Handle {
                rowid: 1,
                id: ALICE_PHONE,
            },
            Handle { rowid: 2, id: BOB_PHONE },
        ],
        &[
            Chat {
                rowid: 1,
                style: DIRECT_CHAT_STYLE,
                display_name: None,
                chat_identifier: Some(ALICE_PHONE),
            },
            Chat {
                rowid: 2,
                style: GROUP_CHAT_STYLE,
                display_name: Some("Trip"),
                chat_identifier: Some("chat900"),
            },
            Chat {
                rowid: 3,
                style: DIRECT_CHAT_STYLE,
                display_name: None,
                chat_identifier: Some(BOB_PHONE),
            },
        ],
        &[
            StoredMessage::received(T0, 1, 1, "hey, it's \"Alice\""),
            StoredMessage::received(T0 + 600, 2, 2, "who's driving?"),
            StoredMessage::sent(T0 + 1200, 0, 2, "I can\ndrive"),
            StoredMessage::sent(T0 + 1800, 1, 1, "see you soon"),
            StoredMessage::received(T0 + 2400, 2, 3, "thanks"),
        ],
    );
    create_contacts_store(&contacts_store, &alice_and_bob());

    Fixture {
        dir,
        message_store,
        contacts_store,
        data_dir,
    }
}
