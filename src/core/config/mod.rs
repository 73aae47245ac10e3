//! Defines the core runtime `Config` struct, its defaults, and related utilities.
//! Submodules handle loading, building, and validation.

pub(crate) mod builder;
pub(crate) mod file;
pub(crate) mod loading;
pub(crate) mod validation;

pub use builder::ConfigBuilder;
pub use file::ConfigFile;
pub use loading::{find_config_file, load_config_file};

use crate::controller::ControllerSettings;
use crate::core::models::VerificationOptions;
use crate::export::QuoteStyle;
use std::time::Duration;
use url::Url;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8080/";
pub const DEFAULT_EXPORT_FILE_NAME: &str = "results.csv";

/// Runtime configuration settings used by the email-verifier client.
#[derive(Debug, Clone)]
pub struct Config {
    pub server_url: Url,
    pub request_timeout: Duration,
    pub user_agent: String,

    pub poll_interval: Duration,
    pub max_consecutive_poll_failures: u32,

    pub default_options: VerificationOptions,

    pub export_file_name: String,
    pub legacy_csv: bool,

    pub loaded_config_path: Option<String>,
}

impl Config {
    fn build_default() -> Self {
        let server_url = Url::parse(DEFAULT_SERVER_URL)
            .expect("Default server URL failed to parse. This is a bug.");

        Config {
            server_url,
            request_timeout: Duration::from_secs(30),
            user_agent: format!("email-verifier-client/{}", env!("CARGO_PKG_VERSION")),
            poll_interval: Duration::from_secs(1),
            max_consecutive_poll_failures: 0,
            default_options: VerificationOptions::default(),
            export_file_name: DEFAULT_EXPORT_FILE_NAME.to_string(),
            legacy_csv: false,
            loaded_config_path: None,
        }
    }

    /// Settings for the lifecycle controller derived from this configuration.
    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            poll_interval: self.poll_interval,
            max_consecutive_poll_failures: self.max_consecutive_poll_failures,
            quote_style: self.quote_style(),
            export_file_name: self.export_file_name.clone(),
        }
    }

    pub fn quote_style(&self) -> QuoteStyle {
        if self.legacy_csv {
            QuoteStyle::Legacy
        } else {
            QuoteStyle::Standard
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::build_default()
    }
}
