use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use imessage_analysis::config::AppConfig;
use imessage_analysis::logging::init_logging;
use imessage_analysis::metrics::PipelineMetrics;
use imessage_analysis::pipeline::{self, PipelineOptions, PipelinePaths};
use imessage_analysis::progress::Phase;
use imessage_analysis::report::{self, ReportFormat};
use imessage_analysis::validation::InputValidator;
use imessage_analysis::AnalysisReport;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Extra configuration file layered over the defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Default)]
struct OutputArgs {
    /// Directory for the intermediate CSV files
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[derive(Args, Default)]
struct AnalysisArgs {
    /// Group chat for the single-group breakdown
    #[arg(short, long)]
    group: Option<String>,

    /// Contact for the single-contact timeline
    #[arg(short, long)]
    contact: Option<String>,

    /// Report format (csv or json)
    #[arg(short, long)]
    format: Option<ReportFormat>,

    /// Directory for the aggregate tables
    #[arg(long)]
    report_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract, resolve and aggregate, then write the report
    Run {
        /// Rebuild even if processed messages can be reused
        #[arg(long)]
        force: bool,

        #[command(flatten)]
        output: OutputArgs,

        #[command(flatten)]
        analysis: AnalysisArgs,
    },
    /// Extract and resolve only
    Extract {
        /// Rebuild even if processed messages can be reused
        #[arg(long)]
        force: bool,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Aggregate an existing processed messages table
    Analyze {
        #[command(flatten)]
        output: OutputArgs,

        #[command(flatten)]
        analysis: AnalysisArgs,
    },
    /// Print the effective configuration as YAML
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = AppConfig::load_from(cli.config.as_deref())?;

    // Initialize logging
    let log_file = config.logging.file_path.as_deref().map(Path::new);
    let _guard = init_logging(Some(&config.log_level()), log_file, config.logging.format == "json")?;

    info!("Starting imessage-analysis");

    match cli.command {
        Commands::Run {
            force,
            output,
            analysis,
        } => {
            apply_overrides(&mut config, &output, &analysis)?;
            run_pipeline(&config, force).await?;
        },
        Commands::Extract { force, output } => {
            apply_overrides(&mut config, &output, &AnalysisArgs::default())?;
            extract(&config, force)?;
        },
        Commands::Analyze { output, analysis } => {
            apply_overrides(&mut config, &output, &analysis)?;
            analyze(&config)?;
        },
        Commands::Config => print_config(&config)?,
    }

    Ok(())
}

/// Fold command-line flags into the loaded configuration and re-validate
fn apply_overrides(config: &mut AppConfig, output: &OutputArgs, analysis: &AnalysisArgs) -> Result<()> {
    if let Some(dir) = &output.data_dir {
        config.output.data_dir = dir.to_string_lossy().into_owned();
    }
    if let Some(dir) = &analysis.report_dir {
        config.output.report_dir = dir.to_string_lossy().into_owned();
    }
    if let Some(format) = analysis.format {
        config.output.report_format = format;
    }
    if let Some(group) = &analysis.group {
        config.analysis.target_group = Some(group.clone());
    }
    if let Some(contact) = &analysis.contact {
        config.analysis.target_contact = Some(contact.clone());
    }
    config.validate()
}

fn pipeline_paths(config: &AppConfig) -> PipelinePaths {
    PipelinePaths {
        message_store: config.message_store_path(),
        contacts_store: config.contacts_store_path(),
        data_dir: PathBuf::from(&config.output.data_dir),
    }
}

const fn pipeline_options(config: &AppConfig, force: bool) -> PipelineOptions {
    PipelineOptions {
        cache_policy: config.pipeline.cache_policy,
        collision_policy: config.resolution.collision_policy,
        force,
    }
}

fn validate_stores(paths: &PipelinePaths) -> Result<()> {
    InputValidator::validate_store_path(&paths.message_store, "Message store")?;
    InputValidator::validate_store_path(&paths.contacts_store, "Contacts store")?;
    Ok(())
}

/// Full run on the blocking pool, logging phases as they arrive
async fn run_pipeline(config: &AppConfig, force: bool) -> Result<()> {
    let paths = pipeline_paths(config);
    let processed = paths.processed_messages();
    if force || !processed.is_file() {
        validate_stores(&paths)?;
    }
    info!(
        message_store = %paths.message_store.display(),
        contacts_store = %paths.contacts_store.display(),
        "Using source stores"
    );

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<Phase>();
    let handle = pipeline::spawn(paths, pipeline_options(config, force), config.analysis_options(), tx);

    while let Some(phase) = rx.recv().await {
        info!(%phase, "Pipeline progress");
    }

    let run = handle.await.context("Pipeline task failed")??;
    log_metrics(&run.metrics);

    write_and_summarize(config, &run.report)
}

fn extract(config: &AppConfig, force: bool) -> Result<()> {
    let paths = pipeline_paths(config);
    validate_stores(&paths)?;

    let mut metrics = PipelineMetrics::default();
    let mut sink = |phase: Phase| info!(%phase, "Pipeline progress");
    let prepared = pipeline::prepare_resolved(&paths, pipeline_options(config, force), &mut metrics, &mut sink)?;

    if prepared.reused {
        info!(
            path = %paths.processed_messages().display(),
            "Processed messages already present; use --force to rebuild"
        );
    }
    log_metrics(&metrics);
    Ok(())
}

fn analyze(config: &AppConfig) -> Result<()> {
    let data_dir = PathBuf::from(&config.output.data_dir);
    let mut metrics = PipelineMetrics::default();

    let messages = pipeline::load_resolved(&data_dir, &mut metrics)
        .with_context(|| format!("No processed messages in {}; run `extract` first", data_dir.display()))?;
    let report = pipeline::analyze(&messages, &config.analysis_options(), &mut metrics);
    log_metrics(&metrics);

    write_and_summarize(config, &report)
}

fn log_metrics(metrics: &PipelineMetrics) {
    debug!(?metrics, "Run totals");
    if metrics.rows_skipped > 0 {
        warn!(skipped = metrics.rows_skipped, "Malformed rows were skipped");
    }
    info!(
        reused = metrics.reused_resolved,
        messages = metrics.messages_extracted,
        contacts = metrics.contacts_extracted,
        resolved = metrics.identities_resolved,
        unresolved = metrics.identities_unresolved,
        collisions = metrics.collisions,
        analyzed = metrics.messages_analyzed,
        "Pipeline metrics"
    );
}

#[allow(clippy::print_stdout)]
fn write_and_summarize(config: &AppConfig, report: &AnalysisReport) -> Result<()> {
    let report_dir = PathBuf::from(&config.output.report_dir);
    let files = report::write_report(report, &report_dir, config.output.report_format)
        .with_context(|| format!("Failed to write report to {}", report_dir.display()))?;

    for line in report::summary_lines(report) {
        println!("{line}");
    }
    for file in files {
        println!("Wrote {}", file.display());
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_config(config: &AppConfig) -> Result<()> {
    print!("{}", config.to_yaml()?);
    Ok(())
}
