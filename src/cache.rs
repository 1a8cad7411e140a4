//! Reuse of a previously resolved message table.
//!
//! With [`CachePolicy::Exists`] the presence of `processed_messages.csv` is
//! enough to skip extraction and resolution. [`CachePolicy::Fingerprint`]
//! also requires `processed_manifest.json` to record the same size and
//! modification time for both source stores as they have now.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;
use crate::schema::files;

/// When an existing resolved table may be reused
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachePolicy {
    /// Reuse whenever the resolved table exists
    #[default]
    Exists,
    /// Reuse only when the source stores are unchanged since it was written
    Fingerprint,
}

/// Size and modification time of one source store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFingerprint {
    /// Store path as given
    pub path: PathBuf,
    /// Length in bytes
    pub len: u64,
    /// Modification time in Unix seconds, when the filesystem reports one
    pub modified: Option<u64>,
}

impl SourceFingerprint {
    /// Read the current fingerprint of `path`
    pub fn of(path: &Path) -> Result<Self> {
        let meta = fs::metadata(path)?;
        let modified = meta
            .modified()
            .ok()
            .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
            .map(|elapsed| elapsed.as_secs());
        Ok(Self {
            path: path.to_path_buf(),
            len: meta.len(),
            modified,
        })
    }
}

/// Sources the resolved table was built from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Message store fingerprint
    pub message_store: SourceFingerprint,
    /// Contacts store fingerprint
    pub contacts_store: SourceFingerprint,
}

impl Manifest {
    /// Fingerprint both stores as they are now
    pub fn current(message_store: &Path, contacts_store: &Path) -> Result<Self> {
        Ok(Self {
            message_store: SourceFingerprint::of(message_store)?,
            contacts_store: SourceFingerprint::of(contacts_store)?,
        })
    }

    /// Load `processed_manifest.json` from `data_dir`, if present and readable
    #[must_use]
    pub fn load(data_dir: &Path) -> Option<Self> {
        let path = data_dir.join(files::MANIFEST);
        let text = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&text) {
            Ok(manifest) => Some(manifest),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Ignoring unreadable manifest");
                None
            },
        }
    }

    /// Write `processed_manifest.json` into `data_dir`
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(data_dir.join(files::MANIFEST), json)?;
        Ok(())
    }
}

/// Whether the resolved table in `data_dir` can stand in for a full run
#[must_use]
pub fn is_reusable(policy: CachePolicy, data_dir: &Path, message_store: &Path, contacts_store: &Path) -> bool {
    if !data_dir.join(files::PROCESSED_MESSAGES).is_file() {
        return false;
    }

    match policy {
        CachePolicy::Exists => true,
        CachePolicy::Fingerprint => {
            let Some(recorded) = Manifest::load(data_dir) else {
                info!("No manifest for processed messages; rebuilding");
                return false;
            };
            match Manifest::current(message_store, contacts_store) {
                Ok(current) if current == recorded => true,
                Ok(_) => {
                    info!("Source stores changed since last run; rebuilding");
                    false
                },
                Err(e) => {
                    debug!(error = %e, "Could not fingerprint source stores");
                    false
                },
            }
        },
    }
}
