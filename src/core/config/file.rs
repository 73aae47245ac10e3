//! Defines the structure mirroring the TOML configuration file format.

use serde::Deserialize;

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub(crate) network: NetworkConfig,
    #[serde(default)]
    pub(crate) polling: PollingConfig,
    #[serde(default)]
    pub(crate) checks: ChecksConfig,
    #[serde(default)]
    pub(crate) export: ExportConfig,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub(crate) struct NetworkConfig {
    pub(crate) server_url: Option<String>,
    pub(crate) request_timeout: Option<u64>,
    pub(crate) user_agent: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub(crate) struct PollingConfig {
    pub(crate) interval_ms: Option<u64>,
    pub(crate) max_consecutive_failures: Option<u32>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub(crate) struct ChecksConfig {
    pub(crate) smtp_check: Option<bool>,
    pub(crate) gravatar_check: Option<bool>,
    pub(crate) catch_all_check: Option<bool>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub(crate) struct ExportConfig {
    pub(crate) file_name: Option<String>,
    pub(crate) legacy_unquoted: Option<bool>,
}
