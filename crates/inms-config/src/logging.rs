//! Logging initialization for the client.
//!
//! Thin wrapper over the observability package: structured JSONL goes to
//! `~/.inms/logs/client.jsonl`, a compact copy goes to stderr.

use crate::Paths;
use observability::{LogConfig, ObservabilityMode};

/// Initialize logging for the default `inms` service.
///
/// # Example
///
/// ```ignore
/// init_logging("info", &paths);
/// tracing::info!("client started");
/// ```
pub fn init_logging(level: &str, paths: &Paths) {
    init_logging_for_service("inms", level, paths);
}

/// Initialize logging with a custom service name.
pub fn init_logging_for_service(service_name: &str, level: &str, paths: &Paths) {
    observability::init_with_config(LogConfig {
        service_name: service_name.into(),
        default_level: level.into(),
        log_path: Some(paths.log_file()),
        also_stderr: true,
        mode: mode_from_env(std::env::var("INMS_OBS_MODE").ok().as_deref()),
    });
}

fn mode_from_env(value: Option<&str>) -> ObservabilityMode {
    match value.map(str::to_ascii_lowercase).as_deref() {
        Some("prod") | Some("production") => ObservabilityMode::ProdMetadataOnly,
        _ => ObservabilityMode::DevVerbose,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_from_env() {
        assert_eq!(mode_from_env(None), ObservabilityMode::DevVerbose);
        assert_eq!(mode_from_env(Some("dev")), ObservabilityMode::DevVerbose);
        assert_eq!(
            mode_from_env(Some("PRODUCTION")),
            ObservabilityMode::ProdMetadataOnly
        );
        assert_eq!(mode_from_env(Some("prod")), ObservabilityMode::ProdMetadataOnly);
    }
}
