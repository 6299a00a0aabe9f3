//! Server configuration.
//!
//! [`Config`] is the validated form of the command line (see
//! [`crate::cli::Cli::to_config`]) and drives [`crate::server::serve`].

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{PdfForgeError, Result};

/// Default bind address.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default Ghostscript executable, resolved through `PATH`.
pub const DEFAULT_GS_PATH: &str = "gs";

/// Default compression deadline in seconds.
pub const DEFAULT_COMPRESS_TIMEOUT_SECS: u64 = 120;

/// Default request body limit in megabytes.
pub const DEFAULT_MAX_UPLOAD_MB: usize = 100;

/// Origins allowed by default (a static front end served on port 5500).
pub const DEFAULT_ALLOWED_ORIGINS: [&str; 2] = ["http://127.0.0.1:5500", "http://localhost:5500"];

/// Name of the directory created under the system temp dir.
const TEMP_DIR_NAME: &str = "pdfforge-uploads";

/// Validated server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Directory for uploads and intermediate outputs.
    pub temp_dir: PathBuf,
    /// Ghostscript executable.
    pub gs_path: PathBuf,
    /// Deadline for a single compression.
    pub compress_timeout: Duration,
    /// Maximum number of concurrent Ghostscript processes.
    pub max_concurrent_jobs: usize,
    /// Request body limit in megabytes.
    pub max_upload_mb: usize,
    /// Origins allowed to call the API from a browser.
    pub allowed_origins: Vec<String>,
}

impl Config {
    /// `{system temp}/pdfforge-uploads`.
    pub fn default_temp_dir() -> PathBuf {
        std::env::temp_dir().join(TEMP_DIR_NAME)
    }

    /// One job per available CPU.
    pub fn default_max_jobs() -> usize {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }

    /// Request body limit in bytes.
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }

    /// `host:port` string for logging.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PdfForgeError::InvalidConfig`] if:
    /// - The host is empty or contains whitespace
    /// - Any of the limits (jobs, timeout, upload size) is zero
    /// - The Ghostscript path is empty
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() || self.host.contains(char::is_whitespace) {
            return Err(PdfForgeError::invalid_config(format!(
                "Invalid bind host: '{}'",
                self.host
            )));
        }

        if self.max_concurrent_jobs == 0 {
            return Err(PdfForgeError::invalid_config(
                "max concurrent jobs must be at least 1",
            ));
        }

        if self.compress_timeout.is_zero() {
            return Err(PdfForgeError::invalid_config(
                "compression timeout must be greater than zero",
            ));
        }

        if self.max_upload_mb == 0 {
            return Err(PdfForgeError::invalid_config(
                "max upload size must be greater than zero",
            ));
        }

        if self.gs_path.as_os_str().is_empty() {
            return Err(PdfForgeError::invalid_config("Ghostscript path is empty"));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            temp_dir: Self::default_temp_dir(),
            gs_path: PathBuf::from(DEFAULT_GS_PATH),
            compress_timeout: Duration::from_secs(DEFAULT_COMPRESS_TIMEOUT_SECS),
            max_concurrent_jobs: Self::default_max_jobs(),
            max_upload_mb: DEFAULT_MAX_UPLOAD_MB,
            allowed_origins: DEFAULT_ALLOWED_ORIGINS.iter().map(|s| s.to_string()).collect(),
        }
    }
}
