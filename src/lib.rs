//! iMessage Analysis - Message Archive Extraction and Aggregation
//!
//! A Rust library that extracts the local iMessage archive and the macOS
//! contacts store, resolves phone numbers to display names, and builds
//! time-bucketed activity tables.
//!
//! # Features
//!
//! - Read-only extraction from the message and contacts SQLite stores
//! - RFC 4180 CSV intermediates shared by every stage
//! - Phone-number normalization and explicit contact collision policy
//! - Lifetime, time-of-day, ranking and participation aggregates
//! - Staged pipeline with progress events and resolved-output reuse

/// Aggregate tables
pub mod aggregator;
/// Time bucketing
pub mod buckets;
/// Resolved-output reuse
pub mod cache;
/// Configuration management
pub mod config;
/// Contact extraction
pub mod contacts;
/// Shared CSV reading and writing
pub mod csv_codec;
/// Error types
pub mod error;
/// Logging setup and utilities
pub mod logging;
/// Message extraction
pub mod messages;
/// Metrics collection
pub mod metrics;
/// Data models and structures
pub mod models;
/// Phone-number normalization
pub mod phone;
/// Stage orchestration
pub mod pipeline;
/// Progress events
pub mod progress;
/// SQL run against the source stores
pub mod queries;
/// Aggregate table output
pub mod report;
/// Identity resolution
pub mod resolver;
/// Tabular file schema definitions
pub mod schema;
/// Read-only store access
pub mod store;
/// Input validation
pub mod validation;

// Re-export key components for easier access
pub use aggregator::{AnalysisOptions, AnalysisReport, Aggregator};
pub use error::{AnalysisError, MalformedRow, Result};
pub use models::{Contact, Message};
pub use phone::{normalize, NormalizedPhone};
pub use pipeline::{PipelineOptions, PipelinePaths, PipelineRun};
pub use progress::{Phase, ProgressSink};
