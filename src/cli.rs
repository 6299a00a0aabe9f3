//! CLI argument parsing for pdfforge.
//!
//! Every option can also be set through a `PDFFORGE_*` environment
//! variable; command-line values take precedence.
//!
//! # Examples
//!
//! ```no_run
//! use pdfforge::cli::Cli;
//! use clap::Parser;
//!
//! let cli = Cli::parse();
//! let config = cli.to_config().expect("Invalid configuration");
//! println!("Listening on {}", config.bind_addr());
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{
    Config, DEFAULT_ALLOWED_ORIGINS, DEFAULT_COMPRESS_TIMEOUT_SECS, DEFAULT_GS_PATH, DEFAULT_HOST,
    DEFAULT_MAX_UPLOAD_MB, DEFAULT_PORT,
};
use crate::error::Result;

/// Merge, split and compress PDF documents over HTTP.
///
/// pdfforge accepts multipart uploads, merges several documents into one,
/// splits a document into a zip of single pages, and compresses documents
/// with Ghostscript.
#[derive(Parser, Debug)]
#[command(name = "pdfforge")]
#[command(version)]
#[command(about = "HTTP service that merges, splits and compresses PDF documents", long_about = None)]
#[command(author)]
pub struct Cli {
    /// Address to bind
    #[arg(long, env = "PDFFORGE_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "PDFFORGE_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Directory for uploads and intermediate outputs
    ///
    /// Defaults to a `pdfforge-uploads` directory under the system temp
    /// directory. Files left over from a previous run are removed at startup.
    #[arg(long, env = "PDFFORGE_TEMP_DIR", value_name = "DIR")]
    pub temp_dir: Option<PathBuf>,

    /// Ghostscript executable
    #[arg(long, env = "PDFFORGE_GS_PATH", value_name = "PATH", default_value = DEFAULT_GS_PATH)]
    pub gs_path: PathBuf,

    /// Deadline for a single compression, in seconds
    ///
    /// The Ghostscript process is killed when the deadline elapses and the
    /// request fails with 504.
    #[arg(long, env = "PDFFORGE_COMPRESS_TIMEOUT_SECS", value_name = "SECS", default_value_t = DEFAULT_COMPRESS_TIMEOUT_SECS)]
    pub compress_timeout_secs: u64,

    /// Maximum number of concurrent Ghostscript processes
    ///
    /// Default is number of CPU cores. Further requests wait for a free slot.
    #[arg(short = 'j', long, env = "PDFFORGE_MAX_CONCURRENT_JOBS", value_name = "N")]
    pub max_concurrent_jobs: Option<usize>,

    /// Request body limit, in megabytes
    #[arg(long, env = "PDFFORGE_MAX_UPLOAD_MB", value_name = "MB", default_value_t = DEFAULT_MAX_UPLOAD_MB)]
    pub max_upload_mb: usize,

    /// Origin allowed to call the API from a browser (repeatable)
    ///
    /// Examples:
    ///   --allowed-origin http://localhost:5500 --allowed-origin https://app.example.com
    #[arg(
        long = "allowed-origin",
        env = "PDFFORGE_ALLOWED_ORIGINS",
        value_name = "ORIGIN",
        value_delimiter = ',',
        default_values = DEFAULT_ALLOWED_ORIGINS
    )]
    pub allowed_origins: Vec<String>,

    /// Verbose output - log every request step at debug level
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Convert CLI arguments into a validated Config.
    ///
    /// # Errors
    ///
    /// Returns [`crate::PdfForgeError::InvalidConfig`] if validation fails.
    pub fn to_config(&self) -> Result<Config> {
        let config = Config {
            host: self.host.clone(),
            port: self.port,
            temp_dir: self.temp_dir.clone().unwrap_or_else(Config::default_temp_dir),
            gs_path: self.gs_path.clone(),
            compress_timeout: Duration::from_secs(self.compress_timeout_secs),
            max_concurrent_jobs: self
                .max_concurrent_jobs
                .unwrap_or_else(Config::default_max_jobs),
            max_upload_mb: self.max_upload_mb,
            allowed_origins: self
                .allowed_origins
                .iter()
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect(),
        };

        config.validate()?;
        Ok(config)
    }
}
