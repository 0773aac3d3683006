use pirc_network::config::{LoggingConfig, TlsConfig};

use serde::Deserialize;
use std::time::Duration;

/// The client's configuration file
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClientConfig {
    #[serde(default = "ClientConfig::default_proxy_address")]
    pub proxy_address: String,
    /// Name the proxy's certificate is checked against
    #[serde(default = "ClientConfig::default_server_name")]
    pub server_name: String,
    pub tls: TlsConfig,
    #[serde(default = "ClientConfig::default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    pub log: Option<LoggingConfig>,
}

impl ClientConfig {
    fn default_proxy_address() -> String {
        "localhost:2939".to_string()
    }

    fn default_server_name() -> String {
        "pirc".to_string()
    }

    fn default_poll_interval_ms() -> u64 {
        1000
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
