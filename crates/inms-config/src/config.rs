//! Client configuration.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Default REST API base URL (can be overridden at compile time via INMS_API_URL env var).
pub const DEFAULT_API_URL: &str = match option_env!("INMS_API_URL") {
    Some(url) => url,
    None => "http://localhost:5000/api",
};

/// Default client context tag attached to audit events.
pub const DEFAULT_CLIENT_CONTEXT: &str = match option_env!("INMS_CLIENT_CONTEXT") {
    Some(context) => context,
    None => "inms-web",
};

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Bound applied to every outbound request, including token refresh.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Inactivity span after which the local session is ended.
pub const DEFAULT_INACTIVITY_TIMEOUT_SECS: u64 = 30 * 60;

/// Cadence of the inactivity check.
pub const DEFAULT_ACTIVITY_CHECK_INTERVAL_SECS: u64 = 60;

/// Route shown to unauthenticated users.
pub const DEFAULT_LANDING_ROUTE: &str = "/";

/// Main client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Base URL of the REST API; endpoint paths are joined onto it.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_inactivity_timeout_secs")]
    pub inactivity_timeout_secs: u64,
    #[serde(default = "default_activity_check_interval_secs")]
    pub activity_check_interval_secs: u64,
    #[serde(default = "default_landing_route")]
    pub landing_route: String,
    #[serde(default = "default_client_context")]
    pub client_context: String,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_inactivity_timeout_secs() -> u64 {
    DEFAULT_INACTIVITY_TIMEOUT_SECS
}

fn default_activity_check_interval_secs() -> u64 {
    DEFAULT_ACTIVITY_CHECK_INTERVAL_SECS
}

fn default_landing_route() -> String {
    DEFAULT_LANDING_ROUTE.to_string()
}

fn default_client_context() -> String {
    DEFAULT_CLIENT_CONTEXT.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            api_base_url: default_api_base_url(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            inactivity_timeout_secs: DEFAULT_INACTIVITY_TIMEOUT_SECS,
            activity_check_interval_secs: DEFAULT_ACTIVITY_CHECK_INTERVAL_SECS,
            landing_route: default_landing_route(),
            client_context: default_client_context(),
        }
    }
}

impl Config {
    /// Create a new Config with default values, then override from environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load configuration from the profile's config file, falling back to
    /// defaults, then apply environment overrides.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            debug!(path = %config_path.display(), "Loading config file");
            Self::load_from_file(&config_path)?
        } else {
            debug!(path = %config_path.display(), "No config file, using defaults");
            Self::default()
        };

        config.load_from_env();
        config.validate()?;
        debug!(
            api_base_url = %config.api_base_url,
            inactivity_timeout_secs = config.inactivity_timeout_secs,
            "Config ready"
        );
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|source| CoreError::MalformedConfig {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save configuration to a file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    fn load_from_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply `INMS_*` overrides using the given variable lookup.
    ///
    /// Returns the names of the variables that took effect.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Vec<&'static str> {
        let mut applied = Vec::new();
        if let Some(level) = lookup("INMS_LOG_LEVEL").filter(|v| !v.is_empty()) {
            debug!(log_level = %level, "INMS_LOG_LEVEL override");
            self.log_level = level;
            applied.push("INMS_LOG_LEVEL");
        }
        if let Some(url) = lookup("INMS_API_URL").filter(|v| !v.is_empty()) {
            debug!(api_base_url = %url, "INMS_API_URL override");
            self.api_base_url = url;
            applied.push("INMS_API_URL");
        }
        if let Some(raw) = lookup("INMS_INACTIVITY_TIMEOUT_SECS") {
            match raw.parse::<u64>() {
                Ok(secs) => {
                    debug!(secs, "INMS_INACTIVITY_TIMEOUT_SECS override");
                    self.inactivity_timeout_secs = secs;
                    applied.push("INMS_INACTIVITY_TIMEOUT_SECS");
                }
                Err(_) => {
                    warn!(value = %raw, "Ignoring non-numeric INMS_INACTIVITY_TIMEOUT_SECS")
                }
            }
        }
        applied
    }

    /// Reject values that would make the client misbehave.
    pub fn validate(&self) -> CoreResult<()> {
        self.api_base_url()?;
        for (field, value) in [
            ("request_timeout_secs", self.request_timeout_secs),
            ("inactivity_timeout_secs", self.inactivity_timeout_secs),
            ("activity_check_interval_secs", self.activity_check_interval_secs),
        ] {
            if value == 0 {
                return Err(CoreError::invalid(field, "must be greater than zero"));
            }
        }
        if !self.landing_route.starts_with('/') {
            return Err(CoreError::invalid(
                "landing_route",
                format!("must be an absolute path, got {:?}", self.landing_route),
            ));
        }
        Ok(())
    }

    /// Get the API base URL as a parsed URL.
    pub fn api_base_url(&self) -> CoreResult<Url> {
        Url::parse(&self.api_base_url).map_err(CoreError::from)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_secs(self.inactivity_timeout_secs)
    }

    pub fn activity_check_interval(&self) -> Duration {
        Duration::from_secs(self.activity_check_interval_secs)
    }
}
