//! Configuration, paths and logging setup for the INMS client.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{
    Config, DEFAULT_ACTIVITY_CHECK_INTERVAL_SECS, DEFAULT_API_URL, DEFAULT_CLIENT_CONTEXT,
    DEFAULT_INACTIVITY_TIMEOUT_SECS, DEFAULT_LANDING_ROUTE, DEFAULT_LOG_LEVEL,
    DEFAULT_REQUEST_TIMEOUT_SECS,
};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, init_logging_for_service};
pub use paths::Paths;
