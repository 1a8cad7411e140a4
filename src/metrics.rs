use metrics::counter;
use serde::Serialize;

/// Counter names exported through the `metrics` facade
pub mod names {
    /// People read from the contacts store
    pub const CONTACTS_EXTRACTED: &str = "imessage_analysis_contacts_extracted_total";
    /// Messages read from the message store
    pub const MESSAGES_EXTRACTED: &str = "imessage_analysis_messages_extracted_total";
    /// Malformed rows skipped, labelled by stage
    pub const ROWS_SKIPPED: &str = "imessage_analysis_rows_skipped_total";
    /// Senders rewritten to a contact name
    pub const IDENTITIES_RESOLVED: &str = "imessage_analysis_identities_resolved_total";
    /// Senders left as a raw handle
    pub const IDENTITIES_UNRESOLVED: &str = "imessage_analysis_identities_unresolved_total";
    /// Phone keys claimed by more than one contact
    pub const CONTACT_COLLISIONS: &str = "imessage_analysis_contact_collisions_total";
    /// Messages fed to the aggregator
    pub const MESSAGES_ANALYZED: &str = "imessage_analysis_messages_analyzed_total";
    /// Runs that reused an existing resolved table
    pub const CACHE_HITS: &str = "imessage_analysis_cache_hits_total";
}

/// Totals for one pipeline run.
///
/// Every `record_*` call updates the local totals and increments the matching
/// counter in the global recorder. Without an installed recorder the facade
/// calls are no-ops, so the local totals are what callers read back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipelineMetrics {
    /// People read from the contacts store
    pub contacts_extracted: u64,
    /// Messages read from the message store
    pub messages_extracted: u64,
    /// Malformed rows skipped across all stages
    pub rows_skipped: u64,
    /// Senders rewritten to a contact name
    pub identities_resolved: u64,
    /// Senders left as a raw handle
    pub identities_unresolved: u64,
    /// Phone keys claimed by more than one contact
    pub collisions: u64,
    /// Messages fed to the aggregator
    pub messages_analyzed: u64,
    /// Whether the resolved table was reused
    pub reused_resolved: bool,
}

fn as_count(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}

impl PipelineMetrics {
    /// Record people read from the contacts store
    pub fn record_contacts(&mut self, count: usize) {
        let count = as_count(count);
        self.contacts_extracted += count;
        counter!(names::CONTACTS_EXTRACTED).increment(count);
    }

    /// Record messages read from the message store
    pub fn record_messages(&mut self, count: usize) {
        let count = as_count(count);
        self.messages_extracted += count;
        counter!(names::MESSAGES_EXTRACTED).increment(count);
    }

    /// Record malformed rows skipped by `stage`
    pub fn record_skipped(&mut self, stage: &'static str, count: usize) {
        if count == 0 {
            return;
        }
        let count = as_count(count);
        self.rows_skipped += count;
        counter!(names::ROWS_SKIPPED, "stage" => stage).increment(count);
    }

    /// Record the outcome of identity resolution
    pub fn record_resolution(&mut self, resolved: usize, unresolved: usize, collisions: usize) {
        let (resolved, unresolved, collisions) = (as_count(resolved), as_count(unresolved), as_count(collisions));
        self.identities_resolved += resolved;
        self.identities_unresolved += unresolved;
        self.collisions += collisions;
        counter!(names::IDENTITIES_RESOLVED).increment(resolved);
        counter!(names::IDENTITIES_UNRESOLVED).increment(unresolved);
        counter!(names::CONTACT_COLLISIONS).increment(collisions);
    }

    /// Record messages handed to the aggregator
    pub fn record_analyzed(&mut self, count: usize) {
        let count = as_count(count);
        self.messages_analyzed += count;
        counter!(names::MESSAGES_ANALYZED).increment(count);
    }

    /// Record a reused resolved table
    pub fn record_cache_hit(&mut self) {
        self.reused_resolved = true;
        counter!(names::CACHE_HITS).increment(1);
    }
}
