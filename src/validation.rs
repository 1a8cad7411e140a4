use anyhow::{anyhow, Result};
use std::path::Path;

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Validation utilities for user-supplied paths and analysis parameters
#[derive(Debug, Copy, Clone)]
pub struct InputValidator;

impl InputValidator {
    /// Validate a source store path: it must exist and be a regular file
    pub fn validate_store_path(path: &Path, label: &str) -> Result<()> {
        if path.as_os_str().is_empty() {
            return Err(anyhow!("{label} path cannot be empty"));
        }

        if !path.exists() {
            return Err(anyhow!("{label} does not exist: {}", path.display()));
        }

        if !path.is_file() {
            return Err(anyhow!("{label} is not a file: {}", path.display()));
        }

        std::fs::metadata(path).map_err(|e| anyhow!("Cannot access {label}: {e}"))?;

        Ok(())
    }

    /// Validate an output directory path; it need not exist yet
    pub fn validate_output_dir(path: &Path) -> Result<()> {
        if path.as_os_str().is_empty() {
            return Err(anyhow!("Output directory cannot be empty"));
        }

        if path.is_file() {
            return Err(anyhow!("Output directory is a file: {}", path.display()));
        }

        if path.to_string_lossy().len() > 4096 {
            return Err(anyhow!("Output directory path too long (max 4096 characters)"));
        }

        Ok(())
    }

    /// Validate the time-series bucket width in days
    pub fn validate_bucket_days(days: u32) -> Result<()> {
        if days == 0 {
            return Err(anyhow!("Bucket width must be at least one day"));
        }

        if days > 3660 {
            return Err(anyhow!("Bucket width too large (max 3660 days)"));
        }

        Ok(())
    }

    /// Validate the time-of-day interval; it must divide a day evenly
    pub fn validate_time_of_day_minutes(minutes: u32) -> Result<()> {
        if minutes == 0 {
            return Err(anyhow!("Time-of-day interval must be positive"));
        }

        if MINUTES_PER_DAY % minutes != 0 {
            return Err(anyhow!(
                "Time-of-day interval of {minutes} minutes does not divide a day evenly"
            ));
        }

        Ok(())
    }

    /// Validate the length of the top-N rankings
    pub fn validate_top_n(top_n: usize) -> Result<()> {
        if top_n == 0 {
            return Err(anyhow!("Ranking length must be greater than 0"));
        }

        if top_n > 10_000 {
            return Err(anyhow!("Ranking length too large (max 10000)"));
        }

        Ok(())
    }

    /// Validate a target contact or group chat name
    pub fn validate_target_name(name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(anyhow!("Target name cannot be empty"));
        }

        if name.len() > 200 {
            return Err(anyhow!("Target name too long (max 200 characters)"));
        }

        if name.contains('\0') || name.contains('\r') || name.contains('\n') {
            return Err(anyhow!("Target name contains invalid characters"));
        }

        Ok(())
    }
}
