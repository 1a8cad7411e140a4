//! Stage orchestration.
//!
//! A run is strictly sequential: extract messages, extract contacts, format
//! the chat table, resolve identities, load the resolved table, aggregate.
//! Each stage finishes and flushes its file before the next one opens it. A
//! reusable resolved table (see [`crate::cache`]) skips the first four stages.
//!
//! [`spawn`] moves a whole run onto Tokio's blocking pool and streams
//! [`Phase`] events back over a channel.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::aggregator::{AnalysisOptions, AnalysisReport, Aggregator};
use crate::cache::{self, CachePolicy, Manifest};
use crate::contacts;
use crate::error::Result;
use crate::logging::OperationTimer;
use crate::messages;
use crate::metrics::PipelineMetrics;
use crate::models::Message;
use crate::progress::{Phase, ProgressSink};
use crate::resolver::{self, CollisionPolicy, ResolutionStats};
use crate::schema::files;

/// Where a run reads from and writes to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelinePaths {
    /// Message store (read-only)
    pub message_store: PathBuf,
    /// Contacts store (read-only)
    pub contacts_store: PathBuf,
    /// Directory for the intermediate CSV files
    pub data_dir: PathBuf,
}

impl PipelinePaths {
    /// Path of the resolved hand-off table
    #[must_use]
    pub fn processed_messages(&self) -> PathBuf {
        self.data_dir.join(files::PROCESSED_MESSAGES)
    }
}

/// Knobs for the extraction and resolution stages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineOptions {
    /// When an existing resolved table may be reused
    pub cache_policy: CachePolicy,
    /// Which contact keeps a shared phone number
    pub collision_policy: CollisionPolicy,
    /// Rebuild even when the resolved table is reusable
    pub force: bool,
}

/// Result of the extraction and resolution stages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreparedRun {
    /// True when the existing resolved table was kept
    pub reused: bool,
    /// Resolution counts; `None` when reused
    pub resolution: Option<ResolutionStats>,
}

/// Result of a full run
#[derive(Debug, Clone)]
pub struct PipelineRun {
    /// Every aggregate table
    pub report: AnalysisReport,
    /// Totals collected along the way
    pub metrics: PipelineMetrics,
    /// Whether extraction was skipped
    pub reused: bool,
}

fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}

/// Produce `processed_messages.csv` in the data directory, reusing it when allowed.
pub fn prepare_resolved<S>(
    paths: &PipelinePaths,
    options: PipelineOptions,
    metrics: &mut PipelineMetrics,
    sink: &mut S,
) -> Result<PreparedRun>
where
    S: ProgressSink + ?Sized,
{
    if !options.force
        && cache::is_reusable(options.cache_policy, &paths.data_dir, &paths.message_store, &paths.contacts_store)
    {
        info!(path = %paths.processed_messages().display(), "Processed messages found, skipping extraction");
        sink.report(Phase::ReusingResolved);
        metrics.record_cache_hit();
        return Ok(PreparedRun {
            reused: true,
            resolution: None,
        });
    }

    fs::create_dir_all(&paths.data_dir)?;
    // a half-finished rebuild must not look fresh
    remove_if_present(&paths.data_dir.join(files::MANIFEST))?;

    sink.report(Phase::ReadingMessages);
    let timer = OperationTimer::new("extract_messages");
    let extracted = messages::export_messages(&paths.message_store, &paths.data_dir)?;
    timer.finish();
    metrics.record_messages(extracted.rows);
    metrics.record_skipped("extract", extracted.skipped);

    sink.report(Phase::ReadingContacts);
    let timer = OperationTimer::new("extract_contacts");
    let exported = contacts::export_contacts(&paths.contacts_store, &paths.data_dir)?;
    timer.finish();
    metrics.record_contacts(exported.contacts);

    sink.report(Phase::FormattingChatData);
    let timer = OperationTimer::new("format_chat_data");
    let formatted = messages::format_chat_data(&paths.data_dir)?;
    timer.finish();
    metrics.record_skipped("format", formatted.skipped);

    sink.report(Phase::ResolvingIdentities);
    let timer = OperationTimer::new("resolve_identities");
    let stats = resolver::resolve_identities(&paths.data_dir, options.collision_policy)?;
    timer.finish();
    metrics.record_skipped("resolve", stats.skipped);
    metrics.record_resolution(stats.resolved_senders, stats.unresolved_senders, stats.collisions);

    match Manifest::current(&paths.message_store, &paths.contacts_store) {
        Ok(manifest) => manifest.save(&paths.data_dir)?,
        Err(e) => warn!(error = %e, "Could not fingerprint source stores"),
    }

    Ok(PreparedRun {
        reused: false,
        resolution: Some(stats),
    })
}

/// Read the resolved table back for aggregation
pub fn load_resolved(data_dir: &Path, metrics: &mut PipelineMetrics) -> Result<Vec<Message>> {
    let timer = OperationTimer::new("load_resolved");
    let (messages, skipped) = resolver::read_messages(&data_dir.join(files::PROCESSED_MESSAGES))?;
    timer.finish();
    if skipped > 0 {
        warn!(skipped, "Skipped malformed rows in processed messages");
    }
    metrics.record_skipped("load", skipped);
    Ok(messages)
}

/// Aggregate an already loaded message table
pub fn analyze(messages: &[Message], analysis: &AnalysisOptions, metrics: &mut PipelineMetrics) -> AnalysisReport {
    let timer = OperationTimer::new("aggregate");
    let report = Aggregator::new(messages, analysis).report();
    timer.finish();
    metrics.record_analyzed(messages.len());
    report
}

/// Run every stage in the calling thread
pub fn run<S>(
    paths: &PipelinePaths,
    options: PipelineOptions,
    analysis: &AnalysisOptions,
    sink: &mut S,
) -> Result<PipelineRun>
where
    S: ProgressSink + ?Sized,
{
    let mut metrics = PipelineMetrics::default();
    let prepared = prepare_resolved(paths, options, &mut metrics, sink)?;

    sink.report(Phase::LoadingResolved);
    let messages = load_resolved(&paths.data_dir, &mut metrics)?;
    info!(messages = messages.len(), "Processed messages loaded");

    sink.report(Phase::Aggregating);
    let report = analyze(&messages, analysis, &mut metrics);

    sink.report(Phase::Finished);
    Ok(PipelineRun {
        report,
        metrics,
        reused: prepared.reused,
    })
}

/// Run every stage on the blocking pool, reporting phases through `progress`.
///
/// Dropping the handle does not stop the run; files already written stay on disk.
#[must_use]
pub fn spawn(
    paths: PipelinePaths,
    options: PipelineOptions,
    analysis: AnalysisOptions,
    mut progress: UnboundedSender<Phase>,
) -> JoinHandle<Result<PipelineRun>> {
    tokio::task::spawn_blocking(move || run(&paths, options, &analysis, &mut progress))
}
