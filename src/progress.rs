//! Coarse progress reporting for pipeline runs.
//!
//! The pipeline announces each stage it enters through a [`ProgressSink`]
//! passed in by the caller. There is no global status object; a caller that
//! does not care passes [`NoProgress`].
//!
//! ```rust
//! use imessage_analysis::progress::{Phase, ProgressSink};
//!
//! let mut seen = Vec::new();
//! let mut sink = |phase: Phase| seen.push(phase);
//! sink.report(Phase::Aggregating);
//! assert_eq!(seen, vec![Phase::Aggregating]);
//! ```

use std::fmt;

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

/// A pipeline stage transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// A reusable resolved table exists; upstream stages are skipped
    ReusingResolved,
    /// Streaming the message store into `all_chat_data.csv`
    ReadingMessages,
    /// Reading the contacts store into `contacts.csv`
    ReadingContacts,
    /// Writing the formatted chat table
    FormattingChatData,
    /// Joining contacts and messages into the resolved table
    ResolvingIdentities,
    /// Reading the resolved table back
    LoadingResolved,
    /// Computing the aggregate tables
    Aggregating,
    /// Run complete
    Finished,
}

impl Phase {
    /// Human-readable status line
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::ReusingResolved => "Using existing processed messages",
            Self::ReadingMessages => "Reading messages",
            Self::ReadingContacts => "Reading contacts",
            Self::FormattingChatData => "Formatting chat data",
            Self::ResolvingIdentities => "Resolving identities",
            Self::LoadingResolved => "Loading processed messages",
            Self::Aggregating => "Aggregating",
            Self::Finished => "Finished",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Receives phase transitions from a running pipeline
pub trait ProgressSink {
    /// Called once when a stage begins
    fn report(&mut self, phase: Phase);
}

impl<F> ProgressSink for F
where
    F: FnMut(Phase),
{
    fn report(&mut self, phase: Phase) {
        self(phase);
    }
}

/// Forwards phases to an async receiver; a dropped receiver is ignored
impl ProgressSink for UnboundedSender<Phase> {
    fn report(&mut self, phase: Phase) {
        let _ = self.send(phase);
    }
}

/// Discards every phase
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _phase: Phase) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_sink_survives_closed_receiver() {
        let (mut tx, rx) = tokio::sync::mpsc::unbounded_channel();
        drop(rx);
        tx.report(Phase::Finished);
    }

    #[test]
    fn test_channel_sink_delivers_in_order() {
        let (mut tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        tx.report(Phase::ReadingMessages);
        tx.report(Phase::ReadingContacts);
        assert_eq!(rx.try_recv().ok(), Some(Phase::ReadingMessages));
        assert_eq!(rx.try_recv().ok(), Some(Phase::ReadingContacts));
    }
}
