use super::*;
use crate::config::TlsData;
use crate::rpc::{RpcRequest, RpcResponse};

use rustls::ServerConfig;
use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
};
use tokio::{
    net::{TcpListener, TcpStream},
    select,
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tokio_rustls::TlsAcceptor;
use tracing::instrument;

/// One request received from a client, waiting for its response
#[derive(Debug)]
pub struct RpcCall {
    pub request: RpcRequest,
    pub response: oneshot::Sender<RpcResponse>,
}

/// Accepts client connections and forwards their requests, one at a time
/// per connection, to whoever owns the receiving end of the call channel.
pub struct RpcListener {
    listen_addr: SocketAddr,
    shutdown_send: Mutex<Option<oneshot::Sender<()>>>,
    task_state: Arc<ListenerTaskState>,
}

struct ListenerTaskState {
    tls_server_config: Arc<ServerConfig>,
    call_sender: mpsc::Sender<RpcCall>,
}

impl RpcListener {
    pub fn new(
        listen_addr: SocketAddr,
        tls: &TlsData,
        call_sender: mpsc::Sender<RpcCall>,
    ) -> Result<Self, TransportError> {
        Ok(Self {
            listen_addr,
            shutdown_send: Mutex::new(None),
            task_state: Arc::new(ListenerTaskState {
                tls_server_config: server_config(tls)?,
                call_sender,
            }),
        })
    }

    /// Bind the listening socket and start accepting connections. Returns the
    /// task handle and the address actually bound.
    pub async fn spawn_listen_task(&self) -> Result<(JoinHandle<()>, SocketAddr), TransportError> {
        let listener = TcpListener::bind(self.listen_addr).await?;
        let local_addr = listener.local_addr()?;
        let task_state = Arc::clone(&self.task_state);

        let (shutdown_send, shutdown_recv) = oneshot::channel();
        {
            let mut guard = self
                .shutdown_send
                .lock()
                .map_err(|e| TransportError::InternalError(e.to_string()))?;
            if guard.is_some() {
                return Err(TransportError::AlreadyListening);
            }
            *guard = Some(shutdown_send);
        }

        tracing::info!(address = %local_addr, "Listening for RPC clients");

        Ok((
            tokio::spawn(async move {
                task_state.listen_loop(listener, shutdown_recv).await;
            }),
            local_addr,
        ))
    }

    pub fn shutdown(&self) {
        if let Ok(mut shutdown_send) = self.shutdown_send.lock() {
            if let Some(sender) = shutdown_send.take() {
                sender.send(()).ok();
            }
        }
    }
}

impl ListenerTaskState {
    async fn listen_loop(self: Arc<Self>, listener: TcpListener, mut shutdown: oneshot::Receiver<()>) {
        let tls_acceptor = TlsAcceptor::from(Arc::clone(&self.tls_server_config));

        loop {
            select! {
                res = listener.accept() =>
                {
                    match res
                    {
                        Ok((conn, peer)) =>
                        {
                            let tls_acceptor = tls_acceptor.clone();
                            let self_copy = Arc::clone(&self);
                            tokio::spawn(async move {
                                if let Err(e) = self_copy.handle_connection(tls_acceptor, conn, peer).await
                                {
                                    tracing::error!("Error in RPC connection handler: {}", e);
                                }
                            });
                        }
                        Err(e) =>
                        {
                            tracing::warn!("Error accepting RPC connection: {}", e);
                        }
                    }
                },
                _ = &mut shutdown =>
                {
                    break
                }
            }
        }

        tracing::info!("RPC listener shut down");
    }

    #[instrument(skip(self, tls_acceptor, conn))]
    async fn handle_connection(
        self: Arc<Self>,
        tls_acceptor: TlsAcceptor,
        conn: TcpStream,
        peer: SocketAddr,
    ) -> Result<(), TransportError> {
        let mut stream = tls_acceptor.accept(conn).await?;

        let (_, session) = stream.get_ref();
        let client = session
            .peer_certificates()
            .and_then(|certs| certs.first())
            .map(|cert| fingerprint(&cert.0))
            .ok_or_else(|| TransportError::InternalError("No peer certificate?".to_string()))?;

        tracing::debug!(%client, "Client connected");

        while let Some(request) = read_frame::<_, RpcRequest>(&mut stream).await? {
            tracing::trace!(?request, "Received request");

            let (response_send, response_recv) = oneshot::channel();
            self.call_sender
                .send(RpcCall {
                    request,
                    response: response_send,
                })
                .await
                .map_err(|_| TransportError::Closed)?;

            let response = response_recv.await.map_err(|_| TransportError::Closed)?;
            write_frame(&mut stream, &response).await?;
        }

        tracing::debug!(%client, "Client disconnected");
        Ok(())
    }
}
