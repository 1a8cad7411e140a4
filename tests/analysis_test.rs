//! Integration tests for the aggregate tables

use chrono::{Duration, NaiveDate, NaiveDateTime};
use imessage_analysis::aggregator::{Aggregator, AnalysisOptions, RankingRow};
use imessage_analysis::models::Message;

fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, day)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

/// A resolved direct message; the counterpart column is always empty after resolution
fn direct(time: NaiveDateTime, from: &str) -> Message {
    let is_from_me = from == "Me";
    Message {
        timestamp: time.and_utc().timestamp(),
        readable_time: time,
        sender: from.to_string(),
        sender_id: None,
        text: "hello".to_string(),
        is_group_chat: false,
        group_chat_name: None,
        is_from_me,
        contact_identifier: String::new(),
    }
}

fn group(time: NaiveDateTime, from: &str, name: &str) -> Message {
    Message {
        is_group_chat: true,
        group_chat_name: Some(name.to_string()),
        ..direct(time, from)
    }
}

fn ranking(rows: &[RankingRow]) -> Vec<(&str, usize)> {
    rows.iter().map(|row| (row.name.as_str(), row.count)).collect()
}

#[test]
fn test_empty_input_gives_empty_tables() {
    let options = AnalysisOptions {
        target_group: Some("Trip".to_string()),
        target_contact: Some("Alice".to_string()),
        ..AnalysisOptions::default()
    };
    let report = Aggregator::new(&[], &options).report();

    assert_eq!(report.messages_analyzed, 0);
    assert!(report.lifetime_activity.rows.is_empty());
    assert!(report.lifetime_activity.average_sent.abs() < f64::EPSILON);
    assert!(report.time_of_day.is_empty());
    assert!(report.top_contacts.is_empty());
    assert!(report.group_breakdown.unwrap().rows.is_empty());
    assert!(report.contact_timeline.unwrap().rows.is_empty());
}

#[test]
fn test_lifetime_activity_zero_fills_gaps() {
    let messages = vec![
        direct(at(1, 20, 0), "Me"),
        direct(at(2, 8, 0), "Alice"),
        // nothing in the bucket starting on the 11th
        direct(at(25, 9, 0), "Me"),
        direct(at(25, 9, 5), "Me"),
    ];
    let options = AnalysisOptions::default();
    let activity = Aggregator::new(&messages, &options).lifetime_activity();

    let starts: Vec<_> = activity.rows.iter().map(|row| row.interval_start).collect();
    assert_eq!(starts, vec![at(1, 0, 0), at(11, 0, 0), at(21, 0, 0)]);
    let totals: Vec<_> = activity.rows.iter().map(|row| (row.sent, row.received, row.total)).collect();
    assert_eq!(totals, vec![(1, 1, 2), (0, 0, 0), (2, 0, 2)]);
    assert!((activity.average_sent - 1.0).abs() < 1e-9);
}

#[test]
fn test_custom_bucket_width() {
    let start = at(1, 12, 0);
    let messages: Vec<Message> = (0..6).map(|d| direct(start + Duration::days(d), "Me")).collect();
    let options = AnalysisOptions {
        bucket_days: 2,
        ..AnalysisOptions::default()
    };
    let activity = Aggregator::new(&messages, &options).lifetime_activity();

    assert_eq!(activity.rows.len(), 3);
    assert!(activity.rows.iter().all(|row| row.sent == 2));
    assert!((activity.average_sent - 2.0).abs() < 1e-9);
}

#[test]
fn test_time_of_day_labels_sorted() {
    let messages = vec![
        direct(at(1, 23, 55), "Alice"),
        direct(at(1, 9, 9), "Me"),
        direct(at(2, 9, 2), "Alice"),
        direct(at(3, 13, 31), "Me"),
    ];
    let options = AnalysisOptions::default();
    let rows = Aggregator::new(&messages, &options).time_of_day();

    let labels: Vec<_> = rows
        .iter()
        .map(|row| (row.time_segment.as_str(), row.sent, row.received))
        .collect();
    assert_eq!(labels, vec![("00:00", 0, 1), ("09:00", 1, 1), ("13:40", 1, 0)]);
}

#[test]
fn test_rankings_break_ties_by_name() {
    let messages = vec![
        direct(at(1, 10, 0), "Zoe"),
        direct(at(1, 11, 0), "Adam"),
        direct(at(1, 12, 0), "Me"),
        direct(at(1, 12, 30), "Mia"),
        direct(at(1, 13, 0), "Mia"),
        group(at(1, 14, 0), "Zoe", "Beta"),
        group(at(1, 15, 0), "Adam", "Alpha"),
    ];
    let options = AnalysisOptions::default();
    let aggregator = Aggregator::new(&messages, &options);

    assert_eq!(ranking(&aggregator.top_contacts()), vec![("Mia", 2), ("Adam", 1), ("Zoe", 1)]);
    assert_eq!(ranking(&aggregator.top_group_chats()), vec![("Alpha", 1), ("Beta", 1)]);
}

#[test]
fn test_sent_direct_messages_are_not_attributed() {
    let messages = vec![direct(at(1, 10, 0), "Me"), direct(at(1, 11, 0), "Alice")];
    let options = AnalysisOptions::default();
    let aggregator = Aggregator::new(&messages, &options);

    assert_eq!(ranking(&aggregator.top_contacts()), vec![("Alice", 1)]);
    let interactions = aggregator.total_interactions();
    assert_eq!(interactions.len(), 1);
    assert_eq!(interactions[0].total, 1);
    let timeline = aggregator.contact_timeline("Alice");
    assert_eq!(timeline.iter().map(|row| row.direct_messages).sum::<usize>(), 1);
}

#[test]
fn test_top_n_truncates_rankings() {
    let names = ["A", "B", "C", "D"];
    let messages: Vec<Message> = names
        .iter()
        .enumerate()
        .flat_map(|(i, name)| (0..=i).map(move |_| direct(at(1, 10, 0), name)))
        .collect();
    let options = AnalysisOptions {
        top_n: 2,
        ..AnalysisOptions::default()
    };
    let aggregator = Aggregator::new(&messages, &options);

    assert_eq!(ranking(&aggregator.top_contacts()), vec![("D", 4), ("C", 3)]);
    assert_eq!(aggregator.total_interactions().len(), 4);
}

#[test]
fn test_group_participation_sorted_by_rate() {
    let messages = vec![
        group(at(1, 10, 0), "Me", "Quiet"),
        group(at(1, 10, 1), "Ann", "Quiet"),
        group(at(1, 10, 2), "Ann", "Quiet"),
        group(at(1, 10, 3), "Ann", "Quiet"),
        group(at(1, 11, 0), "Me", "Chatty"),
        group(at(1, 11, 1), "Ben", "Chatty"),
    ];
    let options = AnalysisOptions::default();
    let rows = Aggregator::new(&messages, &options).group_participation();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].group_chat_name, "Chatty");
    assert!((rows[0].participation_rate - 0.5).abs() < 1e-9);
    assert_eq!(rows[1].group_chat_name, "Quiet");
    assert_eq!((rows[1].own_messages, rows[1].total_messages), (1, 4));
}

#[test]
fn test_participation_only_covers_busiest_groups() {
    let mut messages = vec![group(at(1, 9, 0), "Me", "Small")];
    for minute in 0..3 {
        messages.push(group(at(1, 10, minute), "Ann", "Big"));
    }
    let options = AnalysisOptions {
        top_n: 1,
        ..AnalysisOptions::default()
    };
    let rows = Aggregator::new(&messages, &options).group_participation();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].group_chat_name, "Big");
    assert!(rows[0].participation_rate.abs() < f64::EPSILON);
}

#[test]
fn test_total_interactions_adds_group_messages() {
    let messages = vec![
        direct(at(1, 10, 0), "Alice"),
        direct(at(1, 11, 0), "Bob"),
        group(at(1, 12, 0), "Bob", "Trip"),
        group(at(1, 13, 0), "Me", "Trip"),
    ];
    let options = AnalysisOptions::default();
    let rows = Aggregator::new(&messages, &options).total_interactions();

    let totals: Vec<_> = rows
        .iter()
        .map(|row| (row.contact.as_str(), row.direct_messages, row.group_messages, row.total))
        .collect();
    assert_eq!(totals, vec![("Bob", 1, 1, 2), ("Alice", 1, 0, 1)]);
}

#[test]
fn test_group_breakdown_percentages() {
    let messages = vec![
        group(at(1, 10, 0), "Bob", "Trip"),
        group(at(1, 10, 1), "Bob", "Trip"),
        group(at(1, 10, 2), "Me", "Trip"),
        group(at(1, 10, 3), "Cat", "Trip"),
        group(at(1, 10, 4), "Cat", "Other"),
    ];
    let options = AnalysisOptions::default();
    let aggregator = Aggregator::new(&messages, &options);
    let rows = aggregator.group_breakdown("Trip");

    let shares: Vec<_> = rows.iter().map(|row| (row.sender.as_str(), row.message_count)).collect();
    assert_eq!(shares, vec![("Bob", 2), ("Cat", 1), ("Me", 1)]);
    assert!((rows[0].percentage - 50.0).abs() < 1e-9);
    assert!((rows.iter().map(|row| row.percentage).sum::<f64>() - 100.0).abs() < 1e-9);

    assert!(aggregator.group_breakdown("Nobody's Group").is_empty());
}

#[test]
fn test_contact_timeline_counts_shared_groups() {
    let messages = vec![
        direct(at(1, 10, 0), "Alice"),
        group(at(2, 10, 0), "Alice", "Book Club"),
        group(at(3, 10, 0), "Me", "Book Club"),
        group(at(12, 10, 0), "Me", "Work"),
        direct(at(14, 10, 0), "Alice"),
    ];
    let options = AnalysisOptions::default();
    let rows = Aggregator::new(&messages, &options).contact_timeline("Alice");

    let counts: Vec<_> = rows
        .iter()
        .map(|row| (row.interval_start, row.direct_messages, row.total_interactions))
        .collect();
    assert_eq!(counts, vec![(at(1, 0, 0), 1, 3), (at(11, 0, 0), 1, 1)]);
}

#[test]
fn test_contact_timeline_unknown_contact_is_empty() {
    let messages = vec![direct(at(1, 10, 0), "Alice")];
    let options = AnalysisOptions::default();
    assert!(Aggregator::new(&messages, &options).contact_timeline("Zed").is_empty());
}

#[test]
fn test_aggregation_is_repeatable() {
    let messages = vec![
        direct(at(1, 10, 0), "Alice"),
        group(at(5, 10, 0), "Bob", "Trip"),
        group(at(9, 22, 0), "Me", "Trip"),
    ];
    let options = AnalysisOptions {
        target_group: Some("Trip".to_string()),
        target_contact: Some("Bob".to_string()),
        ..AnalysisOptions::default()
    };
    let aggregator = Aggregator::new(&messages, &options);
    assert_eq!(aggregator.report(), aggregator.report());
}
