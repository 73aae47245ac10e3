//! Sanity checks applied to a fully built [`Config`].

use super::Config;
use crate::core::error::{AppError, Result};
use std::time::Duration;

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

pub(crate) fn validate_config(config: &Config) -> Result<()> {
    match config.server_url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(AppError::Config(format!(
                "Server URL must use http or https, got '{}'",
                other
            )))
        }
    }

    if config.request_timeout.is_zero() {
        return Err(AppError::Config(
            "Request timeout must be greater than zero".to_string(),
        ));
    }

    if config.poll_interval < MIN_POLL_INTERVAL {
        return Err(AppError::Config(format!(
            "Poll interval must be at least {}ms, got {}ms",
            MIN_POLL_INTERVAL.as_millis(),
            config.poll_interval.as_millis()
        )));
    }

    if config.export_file_name.trim().is_empty() {
        return Err(AppError::Config(
            "Export file name must not be empty".to_string(),
        ));
    }

    Ok(())
}
