//! Analytical aggregates over the resolved message table.
//!
//! The [`Aggregator`] partitions the messages once (sent/received,
//! group/direct) and derives every table from that base. Nothing is cached
//! between calls, so running it twice on the same input gives the same tables.
//!
//! Rankings sort by count descending and break ties by name ascending.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::buckets::{time_of_day_label, BucketGrid};
use crate::models::{Message, SELF_SENDER};

/// Tunables for the aggregate tables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisOptions {
    /// Width of a time-series bucket in days
    pub bucket_days: u32,
    /// Time-of-day rounding interval in minutes
    pub time_of_day_minutes: u32,
    /// Length of the top-N rankings
    pub top_n: usize,
    /// Group chat for the single-group breakdown
    pub target_group: Option<String>,
    /// Contact for the single-contact timeline
    pub target_contact: Option<String>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            bucket_days: 10,
            time_of_day_minutes: 20,
            top_n: 30,
            target_group: None,
            target_contact: None,
        }
    }
}

/// Messages per lifetime bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRow {
    /// Bucket start (local midnight)
    pub interval_start: NaiveDateTime,
    /// Messages sent
    pub sent: usize,
    /// Messages received
    pub received: usize,
    /// Sent plus received
    pub total: usize,
}

/// Lifetime activity series and the average sent per bucket
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LifetimeActivity {
    /// One row per bucket, zero-filled, chronological
    pub rows: Vec<ActivityRow>,
    /// Sent messages divided by the number of buckets
    pub average_sent: f64,
}

/// Messages per rounded time of day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeOfDayRow {
    /// `HH:MM` label
    pub time_segment: String,
    /// Messages sent
    pub sent: usize,
    /// Messages received
    pub received: usize,
    /// Sent plus received
    pub total: usize,
}

/// Share of a group chat's messages written locally
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipationRow {
    /// Group chat name
    pub group_chat_name: String,
    /// Messages sent by the local user in this chat
    pub own_messages: usize,
    /// All messages in this chat
    pub total_messages: usize,
    /// `own_messages / total_messages`
    pub participation_rate: f64,
}

/// A name and its message count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingRow {
    /// Group chat or contact
    pub name: String,
    /// Messages counted
    pub count: usize,
}

/// Direct plus group messages attributed to one contact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionRow {
    /// Contact name or raw handle
    pub contact: String,
    /// Direct messages with this contact
    pub direct_messages: usize,
    /// Group messages this contact wrote
    pub group_messages: usize,
    /// Sum of both
    pub total: usize,
}

/// One sender's share of a group chat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SenderShareRow {
    /// Sender name, handle, or "Me"
    pub sender: String,
    /// Messages by this sender in the chat
    pub message_count: usize,
    /// `message_count / total_in_chat * 100`
    pub percentage: f64,
}

/// Per-bucket interaction counts with one contact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactTimelineRow {
    /// Bucket start (local midnight)
    pub interval_start: NaiveDateTime,
    /// Direct messages with the contact
    pub direct_messages: usize,
    /// Direct messages plus group traffic shared with the contact
    pub total_interactions: usize,
}

/// Breakdown of one named group chat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupBreakdown {
    /// Group chat analysed
    pub group_chat_name: String,
    /// Rows by message count descending
    pub rows: Vec<SenderShareRow>,
}

/// Timeline of one contact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactTimeline {
    /// Contact analysed
    pub contact: String,
    /// Chronological, zero-filled rows; empty when the contact has no messages
    pub rows: Vec<ContactTimelineRow>,
}

/// Every aggregate table from one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Messages the tables were computed from
    pub messages_analyzed: usize,
    /// Sent/received/total per bucket
    pub lifetime_activity: LifetimeActivity,
    /// Sent/received per time of day
    pub time_of_day: Vec<TimeOfDayRow>,
    /// Participation in the busiest group chats
    pub group_participation: Vec<ParticipationRow>,
    /// Busiest group chats
    pub top_group_chats: Vec<RankingRow>,
    /// Contacts with the most direct messages
    pub top_contacts: Vec<RankingRow>,
    /// Direct plus group messages per contact
    pub total_interactions: Vec<InteractionRow>,
    /// Present when a target group was requested
    pub group_breakdown: Option<GroupBreakdown>,
    /// Present when a target contact was requested
    pub contact_timeline: Option<ContactTimeline>,
}

/// Sort counts by count descending then name ascending
fn ranked<'a>(counts: BTreeMap<&'a str, usize>) -> Vec<(&'a str, usize)> {
    let mut rows: Vec<_> = counts.into_iter().collect();
    // stable sort keeps the BTreeMap's name order within equal counts
    rows.sort_by(|a, b| b.1.cmp(&a.1));
    rows
}

fn ranking_rows(counts: BTreeMap<&str, usize>, limit: usize) -> Vec<RankingRow> {
    ranked(counts)
        .into_iter()
        .take(limit)
        .map(|(name, count)| RankingRow {
            name: name.to_string(),
            count,
        })
        .collect()
}

/// Computes the aggregate tables from a resolved message table.
pub struct Aggregator<'a> {
    options: &'a AnalysisOptions,
    messages: &'a [Message],
    sent: Vec<&'a Message>,
    received: Vec<&'a Message>,
    group: Vec<&'a Message>,
    direct: Vec<&'a Message>,
    grid: Option<BucketGrid>,
}

impl<'a> Aggregator<'a> {
    /// Partition `messages` once for every table
    #[must_use]
    pub fn new(messages: &'a [Message], options: &'a AnalysisOptions) -> Self {
        let (sent, received) = messages.iter().partition(|m| m.is_from_me);
        let (group, direct) = messages.iter().partition(|m| m.is_group_chat);
        let grid = BucketGrid::covering(messages.iter().map(|m| m.readable_time), options.bucket_days);

        Self {
            options,
            messages,
            sent,
            received,
            group,
            direct,
            grid,
        }
    }

    /// Sent, received and total messages per bucket across the whole archive
    #[must_use]
    pub fn lifetime_activity(&self) -> LifetimeActivity {
        let Some(grid) = self.grid else {
            return LifetimeActivity::default();
        };

        let sent = grid.count(self.sent.iter().map(|m| m.readable_time));
        let received = grid.count(self.received.iter().map(|m| m.readable_time));

        let rows: Vec<ActivityRow> = grid
            .starts()
            .zip(sent.iter().zip(&received))
            .map(|(interval_start, (&sent, &received))| ActivityRow {
                interval_start,
                sent,
                received,
                total: sent + received,
            })
            .collect();

        let average_sent = self.sent.len() as f64 / grid.len() as f64;
        LifetimeActivity { rows, average_sent }
    }

    /// Sent and received counts per rounded `HH:MM`, in label order
    #[must_use]
    pub fn time_of_day(&self) -> Vec<TimeOfDayRow> {
        let interval = self.options.time_of_day_minutes;
        let mut segments: BTreeMap<String, (usize, usize)> = BTreeMap::new();

        for message in self.messages {
            let entry = segments
                .entry(time_of_day_label(message.readable_time, interval))
                .or_default();
            if message.is_from_me {
                entry.0 += 1;
            } else {
                entry.1 += 1;
            }
        }

        segments
            .into_iter()
            .map(|(time_segment, (sent, received))| TimeOfDayRow {
                time_segment,
                sent,
                received,
                total: sent + received,
            })
            .collect()
    }

    fn group_counts(&self) -> BTreeMap<&'a str, usize> {
        let mut counts = BTreeMap::new();
        for name in self.group.iter().copied().filter_map(Message::group_name) {
            *counts.entry(name).or_insert(0) += 1;
        }
        counts
    }

    fn direct_counts(&self) -> BTreeMap<&'a str, usize> {
        let mut counts = BTreeMap::new();
        for contact in self.direct.iter().copied().filter_map(Message::counterpart) {
            if contact != SELF_SENDER {
                *counts.entry(contact).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Local share of the `top_n` busiest group chats, highest rate first
    #[must_use]
    pub fn group_participation(&self) -> Vec<ParticipationRow> {
        let busiest = ranked(self.group_counts());

        let mut rows: Vec<ParticipationRow> = busiest
            .into_iter()
            .take(self.options.top_n)
            .map(|(name, total_messages)| {
                let own_messages = self
                    .group
                    .iter()
                    .filter(|m| m.is_from_me && m.group_name() == Some(name))
                    .count();
                ParticipationRow {
                    group_chat_name: name.to_string(),
                    own_messages,
                    total_messages,
                    participation_rate: own_messages as f64 / total_messages as f64,
                }
            })
            .collect();

        rows.sort_by(|a, b| {
            b.participation_rate
                .total_cmp(&a.participation_rate)
                .then_with(|| a.group_chat_name.cmp(&b.group_chat_name))
        });
        rows
    }

    /// Group chats by message count
    #[must_use]
    pub fn top_group_chats(&self) -> Vec<RankingRow> {
        ranking_rows(self.group_counts(), self.options.top_n)
    }

    /// Contacts by direct message count
    #[must_use]
    pub fn top_contacts(&self) -> Vec<RankingRow> {
        ranking_rows(self.direct_counts(), self.options.top_n)
    }

    /// Direct messages plus group messages written by each contact
    #[must_use]
    pub fn total_interactions(&self) -> Vec<InteractionRow> {
        let direct = self.direct_counts();
        let mut authored: BTreeMap<&'a str, usize> = BTreeMap::new();
        for message in self.group.iter().copied().filter(|m| !m.is_from_me) {
            if !message.sender.is_empty() && message.sender != SELF_SENDER {
                *authored.entry(message.sender.as_str()).or_insert(0) += 1;
            }
        }

        let contacts: BTreeSet<&str> = direct.keys().chain(authored.keys()).copied().collect();
        let mut rows: Vec<InteractionRow> = contacts
            .into_iter()
            .map(|contact| {
                let direct_messages = direct.get(contact).copied().unwrap_or(0);
                let group_messages = authored.get(contact).copied().unwrap_or(0);
                InteractionRow {
                    contact: contact.to_string(),
                    direct_messages,
                    group_messages,
                    total: direct_messages + group_messages,
                }
            })
            .collect();

        rows.sort_by(|a, b| b.total.cmp(&a.total));
        rows
    }

    /// Share of each sender inside one group chat; empty when the chat has no messages
    #[must_use]
    pub fn group_breakdown(&self, group_chat_name: &str) -> Vec<SenderShareRow> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for message in self.group.iter().filter(|m| m.group_name() == Some(group_chat_name)) {
            *counts.entry(message.sender.as_str()).or_insert(0) += 1;
        }

        let total: usize = counts.values().sum();
        ranked(counts)
            .into_iter()
            .map(|(sender, message_count)| SenderShareRow {
                sender: sender.to_string(),
                message_count,
                percentage: message_count as f64 / total as f64 * 100.0,
            })
            .collect()
    }

    /// Per-bucket direct messages and total interactions with one contact.
    ///
    /// Total interactions add the contact's own group messages and the local
    /// user's messages in any group chat the contact wrote in. Empty when the
    /// contact has no messages at all.
    #[must_use]
    pub fn contact_timeline(&self, contact: &str) -> Vec<ContactTimelineRow> {
        let Some(grid) = self.grid else {
            return Vec::new();
        };

        let direct: Vec<&Message> = self
            .direct
            .iter()
            .copied()
            .filter(|m| m.counterpart() == Some(contact))
            .collect();
        let from_contact: Vec<&Message> = self
            .group
            .iter()
            .copied()
            .filter(|m| !m.is_from_me && m.sender == contact)
            .collect();
        let shared_groups: BTreeSet<&str> = from_contact.iter().filter_map(|m| m.group_name()).collect();
        let from_me = self
            .group
            .iter()
            .filter(|m| m.is_from_me && m.group_name().is_some_and(|name| shared_groups.contains(name)));

        if direct.is_empty() && from_contact.is_empty() {
            return Vec::new();
        }

        let direct_counts = grid.count(direct.iter().map(|m| m.readable_time));
        let contact_counts = grid.count(from_contact.iter().map(|m| m.readable_time));
        let me_counts = grid.count(from_me.map(|m| m.readable_time));

        grid.starts()
            .enumerate()
            .map(|(index, interval_start)| ContactTimelineRow {
                interval_start,
                direct_messages: direct_counts[index],
                total_interactions: direct_counts[index] + contact_counts[index] + me_counts[index],
            })
            .collect()
    }

    /// Every table, including the targeted ones named in the options
    #[must_use]
    pub fn report(&self) -> AnalysisReport {
        AnalysisReport {
            messages_analyzed: self.messages.len(),
            lifetime_activity: self.lifetime_activity(),
            time_of_day: self.time_of_day(),
            group_participation: self.group_participation(),
            top_group_chats: self.top_group_chats(),
            top_contacts: self.top_contacts(),
            total_interactions: self.total_interactions(),
            group_breakdown: self.options.target_group.as_ref().map(|name| GroupBreakdown {
                group_chat_name: name.clone(),
                rows: self.group_breakdown(name),
            }),
            contact_timeline: self.options.target_contact.as_ref().map(|name| ContactTimeline {
                contact: name.clone(),
                rows: self.contact_timeline(name),
            }),
        }
    }
}
