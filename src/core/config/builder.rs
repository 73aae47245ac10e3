//! Layered construction of [`Config`]: defaults, then the TOML file, then explicit overrides.

use super::file::ConfigFile;
use super::validation::validate_config;
use super::Config;
use crate::core::error::{AppError, Result};
use std::path::Path;
use std::time::Duration;
use url::Url;

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    file: Option<ConfigFile>,
    file_path: Option<String>,

    server_url: Option<String>,
    request_timeout: Option<Duration>,
    user_agent: Option<String>,
    poll_interval: Option<Duration>,
    max_consecutive_poll_failures: Option<u32>,
    smtp_check: Option<bool>,
    gravatar_check: Option<bool>,
    catch_all_check: Option<bool>,
    export_file_name: Option<String>,
    legacy_csv: Option<bool>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Layers a parsed configuration file underneath any explicit overrides.
    pub fn with_file(mut self, file: ConfigFile, path: &Path) -> Self {
        self.file = Some(file);
        self.file_path = Some(path.display().to_string());
        self
    }

    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = Some(url.into());
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    pub fn max_consecutive_poll_failures(mut self, n: u32) -> Self {
        self.max_consecutive_poll_failures = Some(n);
        self
    }

    pub fn smtp_check(mut self, enabled: bool) -> Self {
        self.smtp_check = Some(enabled);
        self
    }

    pub fn gravatar_check(mut self, enabled: bool) -> Self {
        self.gravatar_check = Some(enabled);
        self
    }

    pub fn catch_all_check(mut self, enabled: bool) -> Self {
        self.catch_all_check = Some(enabled);
        self
    }

    pub fn export_file_name(mut self, name: impl Into<String>) -> Self {
        self.export_file_name = Some(name.into());
        self
    }

    pub fn legacy_csv(mut self, legacy: bool) -> Self {
        self.legacy_csv = Some(legacy);
        self
    }

    pub fn build(self) -> Result<Config> {
        let mut config = Config::default();
        let file = self.file.unwrap_or_default();

        if let Some(raw) = self.server_url.or(file.network.server_url) {
            config.server_url = parse_base_url(&raw)?;
        }
        if let Some(timeout) = self
            .request_timeout
            .or(file.network.request_timeout.map(Duration::from_secs))
        {
            config.request_timeout = timeout;
        }
        if let Some(agent) = self.user_agent.or(file.network.user_agent) {
            config.user_agent = agent;
        }

        if let Some(interval) = self
            .poll_interval
            .or(file.polling.interval_ms.map(Duration::from_millis))
        {
            config.poll_interval = interval;
        }
        if let Some(n) = self
            .max_consecutive_poll_failures
            .or(file.polling.max_consecutive_failures)
        {
            config.max_consecutive_poll_failures = n;
        }

        let opts = &mut config.default_options;
        if let Some(v) = self.smtp_check.or(file.checks.smtp_check) {
            opts.smtp_check = v;
        }
        if let Some(v) = self.gravatar_check.or(file.checks.gravatar_check) {
            opts.gravatar_check = v;
        }
        if let Some(v) = self.catch_all_check.or(file.checks.catch_all_check) {
            opts.catch_all_check = v;
        }

        if let Some(name) = self.export_file_name.or(file.export.file_name) {
            config.export_file_name = name;
        }
        if let Some(legacy) = self.legacy_csv.or(file.export.legacy_unquoted) {
            config.legacy_csv = legacy;
        }

        config.loaded_config_path = self.file_path;

        validate_config(&config)?;
        tracing::debug!("Effective configuration: {:?}", config);
        Ok(config)
    }
}

/// Parses the service base URL, forcing a trailing slash so relative endpoint
/// paths join beneath it rather than replacing its last segment.
fn parse_base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw.trim())
        .map_err(|e| AppError::Config(format!("Invalid server URL '{}': {}", raw, e)))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_win_over_file() {
        let file: ConfigFile = toml::from_str(
            r#"
            [network]
            server_url = "http://file.example.com/"
            [checks]
            smtp_check = false
            gravatar_check = true
            "#,
        )
        .unwrap();

        let config = ConfigBuilder::new()
            .with_file(file, Path::new("test.toml"))
            .server_url("http://cli.example.com")
            .build()
            .unwrap();

        assert_eq!(config.server_url.as_str(), "http://cli.example.com/");
        assert!(!config.default_options.smtp_check);
        assert!(config.default_options.gravatar_check);
        assert!(config.default_options.catch_all_check);
        assert_eq!(config.loaded_config_path.as_deref(), Some("test.toml"));
    }

    #[test]
    fn base_url_gains_trailing_slash() {
        let url = parse_base_url("https://verify.example.com/v1").unwrap();
        assert_eq!(url.as_str(), "https://verify.example.com/v1/");
    }

    #[test]
    fn invalid_url_is_config_error() {
        let err = ConfigBuilder::new().server_url("not a url").build().unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn build_runs_validation() {
        let err = ConfigBuilder::new()
            .poll_interval(Duration::from_millis(1))
            .build()
            .unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
