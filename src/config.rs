use std::path::Path;

use thiserror::Error;

/// 50 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// Upload extensions the ingest front-end lets through. `.txt` has no
/// dedicated parser; the dispatcher sniffs its content.
pub const DEFAULT_EXTENSIONS: [&str; 5] = ["csv", "dx", "jdx", "jcamp", "txt"];

// ---------------------------------------------------------------------------
// Upload policy
// ---------------------------------------------------------------------------

/// Policy the caller applies before handing bytes to the parsers.
/// The parsers themselves accept any size and any filename.
#[derive(Debug, Clone, PartialEq, Eq, clap::Args)]
pub struct IngestConfig {
    /// Largest upload accepted, in bytes.
    #[arg(long, env = "SPECTRAL_MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: u64,

    /// Accepted upload extensions, comma separated, without the dot.
    #[arg(
        long = "accept",
        env = "SPECTRAL_ACCEPTED_EXTENSIONS",
        value_delimiter = ',',
        default_values = DEFAULT_EXTENSIONS
    )]
    pub accepted_extensions: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            accepted_extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadRejected {
    #[error("upload of {size} bytes exceeds the {limit}-byte limit")]
    TooLarge { size: u64, limit: u64 },
    #[error("file type not accepted: {0}")]
    Extension(String),
}

impl IngestConfig {
    /// Check an upload against the policy.
    pub fn check(&self, filename: &str, size: u64) -> Result<(), UploadRejected> {
        if size > self.max_upload_bytes {
            return Err(UploadRejected::TooLarge {
                size,
                limit: self.max_upload_bytes,
            });
        }
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        let accepted = self
            .accepted_extensions
            .iter()
            .any(|a| a.trim_start_matches('.').eq_ignore_ascii_case(&ext));
        if ext.is_empty() || !accepted {
            return Err(UploadRejected::Extension(filename.to_string()));
        }
        Ok(())
    }
}
