//! # Observability
//!
//! Logging setup shared by the INMS client crates.
//!
//! Crates are **log producers**: they call [`init_with_config`] once at
//! startup and use the standard `tracing` macros everywhere else. Where the
//! lines end up is decided here:
//!
//! - a JSONL file (`~/.inms/logs/client.jsonl` by default), one entry per
//!   line, with secrets redacted before the line is written
//! - optionally a compact human-readable copy on stderr
//!
//! ```rust,ignore
//! fn main() {
//!     observability::init("inms");
//!     tracing::info!("client started");
//! }
//! ```
//!
//! `tail -f ~/.inms/logs/client.jsonl | jq` streams the file.

mod file_writer;
mod json_layer;
mod redact;

pub use file_writer::FileLogWriter;
pub use json_layer::{JsonLayer, LogEntry};
pub use redact::{metadata_only, sanitize_fields, sanitize_message, sanitize_value};

use std::io;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// How much of each event is written to the JSONL file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObservabilityMode {
    /// All fields, after secret redaction.
    #[default]
    DevVerbose,
    /// Only allowlisted metadata fields (ids, status codes, routes).
    ProdMetadataOnly,
}

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the service, included in every log line.
    pub service_name: String,

    /// Default level filter. `RUST_LOG` takes precedence when set.
    pub default_level: String,

    /// JSONL file path. `None` disables the file layer.
    pub log_path: Option<PathBuf>,

    /// Also emit compact logs to stderr.
    pub also_stderr: bool,

    /// Field export policy for the file layer.
    pub mode: ObservabilityMode,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "inms".into(),
            default_level: "info".into(),
            log_path: None,
            also_stderr: true,
            mode: ObservabilityMode::DevVerbose,
        }
    }
}

/// Initialize with defaults: stderr only, `info` level.
pub fn init(service_name: &str) {
    init_with_config(LogConfig {
        service_name: service_name.into(),
        ..Default::default()
    });
}

/// Initialize the global subscriber.
///
/// Calling this twice is harmless: the second call leaves the first
/// subscriber in place. A log file that cannot be opened disables the file
/// layer instead of aborting startup.
pub fn init_with_config(config: LogConfig) {
    let mut open_error = None;
    let json_layer = match config.log_path.as_ref() {
        Some(path) => match FileLogWriter::new(path) {
            Ok(writer) => Some(
                JsonLayer::new(config.service_name.clone(), writer, config.mode)
                    .with_filter(env_filter(&config.default_level)),
            ),
            Err(e) => {
                open_error = Some((path.clone(), e));
                None
            }
        },
        None => None,
    };

    let stderr_layer = config.also_stderr.then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .compact()
            .with_writer(io::stderr)
            .with_filter(env_filter(&config.default_level))
    });

    let installed = tracing_subscriber::registry()
        .with(json_layer)
        .with(stderr_layer)
        .try_init()
        .is_ok();

    if !installed {
        return;
    }

    match (open_error, config.log_path) {
        (Some((path, e)), _) => {
            tracing::warn!(log_path = %path.display(), error = %e, "log file unavailable, file logging disabled");
        }
        (None, Some(path)) => {
            tracing::debug!(
                service = %config.service_name,
                log_path = %path.display(),
                "observability initialized"
            );
        }
        (None, None) => {}
    }
}

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Re-export tracing macros for convenience.
pub use tracing::{debug, error, info, instrument, span, trace, warn, Level};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.service_name, "inms");
        assert_eq!(config.default_level, "info");
        assert!(config.log_path.is_none());
        assert!(config.also_stderr);
        assert_eq!(config.mode, ObservabilityMode::DevVerbose);
    }
}
