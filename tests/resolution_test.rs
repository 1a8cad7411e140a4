//! Integration tests for identity resolution

mod common;

use std::fs;

use chrono::NaiveDate;
use common::*;
use imessage_analysis::contacts::export_contacts;
use imessage_analysis::csv_codec::read_table_file;
use imessage_analysis::messages::{export_messages, format_chat_data};
use imessage_analysis::models::{ContactRow, Message};
use imessage_analysis::phone::normalize;
use imessage_analysis::resolver::{
    read_messages, resolve_identities, resolve_messages, write_resolved, CollisionPolicy, ContactDirectory,
};
use imessage_analysis::schema::{chat_csv, files};

fn contact_row(name: &str, phone: &str) -> ContactRow {
    ContactRow {
        full_name: name.to_string(),
        first_name: name.to_string(),
        last_name: String::new(),
        phone_number: normalize(phone),
    }
}

fn message(sender: &str, is_group_chat: bool, contact_identifier: &str) -> Message {
    Message {
        timestamp: 1_700_000_000,
        readable_time: NaiveDate::from_ymd_opt(2023, 11, 14).unwrap().and_hms_opt(12, 0, 0).unwrap(),
        sender: sender.to_string(),
        sender_id: Some(1),
        text: "hi".to_string(),
        is_group_chat,
        group_chat_name: is_group_chat.then(|| "Trip".to_string()),
        is_from_me: sender == "Me",
        contact_identifier: contact_identifier.to_string(),
    }
}

fn directory() -> ContactDirectory {
    let rows = [contact_row("Alice", "5551234567"), contact_row("Bob", "5559876543")];
    ContactDirectory::from_rows(&rows, CollisionPolicy::LastWriteWins)
}

#[test]
fn test_direct_message_counterpart_is_cleared() {
    let mut messages = vec![
        message(ALICE_PHONE, false, ALICE_PHONE),
        message("Me", false, BOB_PHONE),
        message("bob@example.com", false, "bob@example.com"),
    ];
    resolve_messages(&directory(), &mut messages);

    assert!(messages.iter().all(|m| m.contact_identifier.is_empty()));
    assert!(messages.iter().all(|m| m.group_chat_name.is_none()));
    assert_eq!(messages[0].sender, "Alice");
    assert_eq!(messages[1].sender, "Me");
    assert_eq!(messages[2].sender, "bob@example.com");
}

#[test]
fn test_group_message_counterpart_is_resolved() {
    let mut messages = vec![message(BOB_PHONE, true, BOB_PHONE)];
    let stats = resolve_messages(&directory(), &mut messages);

    assert_eq!(messages[0].sender, "Bob");
    assert_eq!(messages[0].contact_identifier, "Bob");
    assert_eq!(messages[0].group_chat_name.as_deref(), Some("Trip"));
    assert_eq!(stats.resolved_senders, 1);
}

#[test]
fn test_unknown_handles_are_kept() {
    let mut messages = vec![message("+15550000000", false, "")];
    let stats = resolve_messages(&directory(), &mut messages);

    assert_eq!(messages[0].sender, "+15550000000");
    assert_eq!(stats.unresolved_senders, 1);
    assert_eq!(stats.resolved_senders, 0);
}

#[test]
fn test_resolution_is_idempotent() {
    let mut messages = vec![
        message(ALICE_PHONE, false, ALICE_PHONE),
        message(BOB_PHONE, true, BOB_PHONE),
        message("Me", true, ""),
    ];
    let directory = directory();
    resolve_messages(&directory, &mut messages);
    let once = messages.clone();

    let stats = resolve_messages(&directory, &mut messages);
    assert_eq!(messages, once);
    assert_eq!(stats.resolved_senders, 0);
}

#[test]
fn test_last_write_wins_on_shared_number() {
    let rows = [contact_row("Alice", "5551234567"), contact_row("Work Phone", "+1 (555) 123-4567")];
    let last = ContactDirectory::from_rows(&rows, CollisionPolicy::LastWriteWins);
    let first = ContactDirectory::from_rows(&rows, CollisionPolicy::FirstWriteWins);

    assert_eq!(last.lookup(ALICE_PHONE), Some("Work Phone"));
    assert_eq!(first.lookup(ALICE_PHONE), Some("Alice"));
    assert_eq!(last.collisions(), 1);
    assert_eq!(last.len(), 1);
}

#[test]
fn test_resolved_table_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join(files::PROCESSED_MESSAGES);
    let mut written = vec![message("Bob", true, "Bob"), message("Alice", false, "")];
    written[0].text = "a, \"quoted\" word".to_string();

    write_resolved(&written, &dest).unwrap();
    assert!(!dir.path().join("processed_messages.csv.tmp").exists());

    let (read, skipped) = read_messages(&dest).unwrap();
    assert_eq!(skipped, 0);
    assert_eq!(read, written);

    let table = read_table_file(&dest).unwrap();
    assert_eq!(table.headers, chat_csv::PROCESSED_HEADER);
}

#[test]
fn test_malformed_rows_are_skipped_on_read() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join(files::PROCESSED_MESSAGES);
    write_resolved(&[message("Bob", true, "Bob")], &dest).unwrap();

    let mut text = fs::read_to_string(&dest).unwrap();
    text.push_str("1700000000,2023-11-14 12:00:00,Bob\n");
    text.push_str("1700000000,not a date,Bob,1,hi,1,Trip,0,Bob\n");
    fs::write(&dest, text).unwrap();

    let (messages, skipped) = read_messages(&dest).unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(skipped, 2);
}

#[test]
fn test_resolve_identities_from_files() {
    let fixture = alice_bob_trip();
    fs::create_dir_all(&fixture.data_dir).unwrap();
    export_messages(&fixture.message_store, &fixture.data_dir).unwrap();
    export_contacts(&fixture.contacts_store, &fixture.data_dir).unwrap();
    format_chat_data(&fixture.data_dir).unwrap();

    let stats = resolve_identities(&fixture.data_dir, CollisionPolicy::default()).unwrap();
    assert_eq!(stats.messages, 5);
    assert_eq!(stats.resolved_senders, 3);
    assert_eq!(stats.unresolved_senders, 0);
    assert_eq!(stats.skipped, 0);

    let table = read_table_file(&fixture.data_dir.join(files::PROCESSED_MESSAGES)).unwrap();
    let to = table.column(chat_csv::TO).unwrap();
    let group = table.column(chat_csv::GROUP_CHAT).unwrap();
    for row in &table.rows {
        if row[group] == "0" {
            assert_eq!(row[to], "");
        }
    }
    let senders: Vec<&str> = table.rows.iter().map(|row| row[2].as_str()).collect();
    assert_eq!(senders, vec!["Bob", "Me", "Me", "Bob", "Alice"]);
}
