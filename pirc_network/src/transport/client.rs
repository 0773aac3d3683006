use super::*;
use crate::config::TlsData;
use crate::rpc::{RpcFault, RpcRequest, RpcResponse};

use serde_json::Value;
use std::convert::TryFrom;
use thiserror::Error;
use tokio::{io, net::TcpStream};
use tokio_rustls::{client::TlsStream, TlsConnector};

#[derive(Debug, Error)]
pub enum RpcClientError {
    #[error("{0}")]
    Fault(#[from] RpcFault),
    #[error("Couldn't resolve {0}: {1}")]
    Resolve(String, io::Error),
    #[error("Couldn't connect to {0}: {1}")]
    Connect(String, io::Error),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl RpcClientError {
    /// Whether this error may clear up on its own if the call is retried
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Resolve(..) | Self::Connect(..))
    }
}

/// A client connection to the proxy.
///
/// The TLS session is opened on first use and kept for later calls. Any
/// transport failure drops it, and the next call reconnects.
pub struct RpcClient {
    address: String,
    server_name: rustls::ServerName,
    connector: TlsConnector,
    stream: Option<TlsStream<TcpStream>>,
    next_id: u64,
}

impl RpcClient {
    /// `address` is a `host:port` pair; `server_name` is the name sent in the
    /// TLS handshake.
    pub fn new(
        address: impl Into<String>,
        server_name: &str,
        tls: &TlsData,
    ) -> Result<Self, TransportError> {
        let server_name = rustls::ServerName::try_from(server_name)
            .map_err(|_| TransportError::InvalidServerName(server_name.to_string()))?;

        Ok(Self {
            address: address.into(),
            server_name,
            connector: TlsConnector::from(client_config(tls)?),
            stream: None,
            next_id: 1,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Invoke a method on the proxy and wait for its result
    pub async fn call(&mut self, method: &str, params: Vec<Value>) -> Result<Value, RpcClientError> {
        let request = RpcRequest::new(self.next_id, method, params);
        self.next_id += 1;

        let mut stream = match self.stream.take() {
            Some(stream) => stream,
            None => self.connect().await?,
        };

        let response = Self::exchange(&mut stream, &request).await?;
        self.stream = Some(stream);

        Ok(response.into_result()?)
    }

    async fn exchange(
        stream: &mut TlsStream<TcpStream>,
        request: &RpcRequest,
    ) -> Result<RpcResponse, TransportError> {
        write_frame(stream, request).await?;

        let response: RpcResponse = read_frame(stream).await?.ok_or(TransportError::Closed)?;
        if response.id != request.id {
            return Err(TransportError::Protocol(format!(
                "response id {} doesn't match request id {}",
                response.id, request.id
            )));
        }
        Ok(response)
    }

    async fn connect(&self) -> Result<TlsStream<TcpStream>, RpcClientError> {
        let addrs = tokio::net::lookup_host(&self.address)
            .await
            .map_err(|e| RpcClientError::Resolve(self.address.clone(), e))?;

        let mut last_error = None;
        for addr in addrs {
            match TcpStream::connect(addr).await {
                Ok(conn) => {
                    tracing::debug!(%addr, "Connected to proxy");
                    let stream = self
                        .connector
                        .connect(self.server_name.clone(), conn)
                        .await
                        .map_err(TransportError::from)?;
                    return Ok(stream);
                }
                Err(e) => last_error = Some(e),
            }
        }

        Err(RpcClientError::Connect(
            self.address.clone(),
            last_error.unwrap_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, "no addresses found")
            }),
        ))
    }
}
