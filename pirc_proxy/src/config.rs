use pirc_network::config::{LoggingConfig, TlsConfig};

use serde::Deserialize;
use std::{net::SocketAddr, time::Duration};

/// The proxy's configuration file
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProxyConfig {
    #[serde(default = "ProxyConfig::default_listen_address")]
    pub listen_address: SocketAddr,
    pub tls: TlsConfig,
    #[serde(default)]
    pub connect: ConnectPolicy,
    pub log: Option<LoggingConfig>,
}

impl ProxyConfig {
    fn default_listen_address() -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], 2939))
    }
}

/// How hard to try when opening a connection to an IRC server
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ConnectPolicy {
    pub attempts: u32,
    pub retry_delay_ms: u64,
}

impl Default for ConnectPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            retry_delay_ms: 2000,
        }
    }
}

impl ConnectPolicy {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}
