use crate::config::ClientConfig;
use pirc_network::{
    config::TlsData,
    event::EventRecord,
    rpc::RpcFault,
    transport::{RpcClient, RpcClientError, TransportError},
};

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Rpc(#[from] RpcClientError),
    #[error("Unexpected response from proxy: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ClientError {
    /// Whether retrying later might succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Rpc(e) if e.is_transient())
    }

    /// The fault returned by the proxy, if that's what this is
    pub fn fault(&self) -> Option<&RpcFault> {
        match self {
            Self::Rpc(RpcClientError::Fault(fault)) => Some(fault),
            _ => None,
        }
    }
}

/// Optional settings for [`ProxyClient::server_connect`]
#[derive(Debug, Clone, Default)]
pub struct ConnectOptions {
    pub password: String,
    pub ssl: bool,
    pub ipv6: bool,
}

/// Typed access to the proxy's RPC methods
pub struct ProxyClient {
    rpc: RpcClient,
}

impl ProxyClient {
    pub fn new(rpc: RpcClient) -> Self {
        Self { rpc }
    }

    /// Set up a client for the proxy named in `config`. No connection is
    /// made until the first call.
    pub fn from_config(config: &ClientConfig, tls: &TlsData) -> Result<Self, TransportError> {
        Ok(Self::new(RpcClient::new(
            config.proxy_address.clone(),
            &config.server_name,
            tls,
        )?))
    }

    async fn call<T: DeserializeOwned>(&mut self, method: &str, params: Vec<Value>) -> Result<T, ClientError> {
        let value = self.rpc.call(method, params).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn server_connect(
        &mut self,
        name: &str,
        nick: &str,
        uri: &str,
        port: u16,
        options: &ConnectOptions,
    ) -> Result<bool, ClientError> {
        self.call(
            "server_connect",
            vec![
                json!(name),
                json!(nick),
                json!(uri),
                json!(port),
                json!(options.password),
                json!(options.ssl),
                json!(options.ipv6),
            ],
        )
        .await
    }

    pub async fn server_disconnect(&mut self, name: &str, message: &str) -> Result<bool, ClientError> {
        self.call("server_disconnect", vec![json!(name), json!(message)]).await
    }

    pub async fn server_list(&mut self) -> Result<Vec<String>, ClientError> {
        self.call("server_list", vec![]).await
    }

    pub async fn server_nick_name(&mut self, server: &str) -> Result<String, ClientError> {
        self.call("server_nick_name", vec![json!(server)]).await
    }

    pub async fn server_privmsg(&mut self, server: &str, target: &str, text: &str) -> Result<bool, ClientError> {
        self.call("server_privmsg", vec![json!(server), json!(target), json!(text)]).await
    }

    pub async fn server_get_events_since(&mut self, server: &str, start_time: f64) -> Result<Vec<EventRecord>, ClientError> {
        self.call("server_get_events_since", vec![json!(server), json!(start_time)]).await
    }

    pub async fn server_get_event_slice(
        &mut self,
        server: &str,
        start: usize,
        end: usize,
    ) -> Result<Vec<EventRecord>, ClientError> {
        self.call("server_get_event_slice", vec![json!(server), json!(start), json!(end)]).await
    }

    pub async fn channel_join(&mut self, server: &str, channel: &str) -> Result<bool, ClientError> {
        self.call("channel_join", vec![json!(server), json!(channel)]).await
    }

    pub async fn channel_leave(&mut self, server: &str, channel: &str, message: &str) -> Result<bool, ClientError> {
        self.call("channel_leave", vec![json!(server), json!(channel), json!(message)]).await
    }

    pub async fn channel_list(&mut self, server: &str) -> Result<Vec<String>, ClientError> {
        self.call("channel_list", vec![json!(server)]).await
    }

    pub async fn channel_message(&mut self, server: &str, channel: &str, text: &str) -> Result<bool, ClientError> {
        self.call("channel_message", vec![json!(server), json!(channel), json!(text)]).await
    }

    pub async fn channel_get_events_since(
        &mut self,
        server: &str,
        channel: &str,
        start_time: f64,
    ) -> Result<Vec<EventRecord>, ClientError> {
        self.call(
            "channel_get_events_since",
            vec![json!(server), json!(channel), json!(start_time)],
        )
        .await
    }

    pub async fn channel_get_event_slice(
        &mut self,
        server: &str,
        channel: &str,
        start: usize,
        end: usize,
    ) -> Result<Vec<EventRecord>, ClientError> {
        self.call(
            "channel_get_event_slice",
            vec![json!(server), json!(channel), json!(start), json!(end)],
        )
        .await
    }

    pub async fn get_events_since(&mut self, start_time: f64) -> Result<Vec<EventRecord>, ClientError> {
        self.call("get_events_since", vec![json!(start_time)]).await
    }

    pub async fn get_event_slice(&mut self, start: usize, end: usize) -> Result<Vec<EventRecord>, ClientError> {
        self.call("get_event_slice", vec![json!(start), json!(end)]).await
    }
}
