use crate::config::ConnectPolicy;
use crate::dispatch::{dispatch, Caller};
use crate::entities::ServerConnection;
use crate::errors::ProxyError;
use crate::irc::{ConnectionId, IrcConnectionParams, IrcEvent};
use crate::normalizer::{normalize, ConnectionInfo};
use pirc_network::prelude::*;
use pirc_network::transport::RpcCall;

use itertools::Itertools;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tokio::{
    select,
    sync::{
        mpsc::{self, unbounded_channel, UnboundedReceiver, UnboundedSender},
        oneshot,
    },
};

/// Owns every server connection, and with them all proxy state.
///
/// The coordinator is driven from a single task: RPC calls and IRC events
/// are handled one at a time, so nothing it owns needs locking.
pub struct ProxyCoordinator {
    servers: HashMap<ServerName, ServerConnection>,
    store: EventStore,
    irc_events_send: UnboundedSender<IrcEvent>,
    irc_events_recv: UnboundedReceiver<IrcEvent>,
    connect_policy: ConnectPolicy,
}

impl ProxyCoordinator {
    pub fn new(connect_policy: ConnectPolicy) -> Self {
        let (irc_events_send, irc_events_recv) = unbounded_channel();

        Self {
            servers: HashMap::new(),
            store: EventStore::new(),
            irc_events_send,
            irc_events_recv,
            connect_policy,
        }
    }

    /// Handle a request from a client
    pub async fn handle_request(&mut self, request: &RpcRequest) -> RpcResponse {
        self.handle(Caller::Remote, request).await
    }

    /// Handle a request, with the method access allowed to `caller`
    pub async fn handle(&mut self, caller: Caller, request: &RpcRequest) -> RpcResponse {
        tracing::trace!(?caller, method = %request.method, "Handling request");

        match dispatch(self, caller, &request.method, &request.params).await {
            Ok(value) => RpcResponse::result(request.id, value),
            Err(e) => {
                if e.is_internal() {
                    tracing::error!(method = %request.method, params = ?request.params, "Error handling request: {}", e);
                } else {
                    tracing::debug!(method = %request.method, "Request failed: {}", e);
                }
                RpcResponse::fault(request.id, e.to_fault())
            }
        }
    }

    pub async fn server_connect(&mut self, name: ServerName, params: IrcConnectionParams) -> Result<(), ProxyError> {
        if self.servers.contains_key(&name) {
            return Err(ProxyError::Duplicate(format!("Server name {} is already in use", name)));
        }

        let server = ServerConnection::connect(name, params, &self.connect_policy, self.irc_events_send.clone()).await?;

        self.store.append(Some(name), EventDetails::ServerConnect);
        self.servers.insert(name, server);

        tracing::info!(server = %name, "Server connected");
        Ok(())
    }

    pub fn server_disconnect(&mut self, name: &str, message: &str) -> Result<(), ProxyError> {
        let name = self.server_mut(name)?.name();

        if let Some(server) = self.servers.remove(&name) {
            server.disconnect(message, &mut self.store);
        }
        Ok(())
    }

    pub fn server_list(&self) -> Vec<ServerName> {
        self.servers.keys().copied().sorted().collect()
    }

    /// Every event, from the coordinator and all servers and channels, newer
    /// than `timestamp`, in time order
    pub fn get_events_since(&self, timestamp: f64) -> Vec<EventRecord> {
        let mut ret = self.store.since(timestamp);
        for server in self.servers.values() {
            ret.extend(server.all_events_since(timestamp));
        }
        sort_by_time(&mut ret);
        ret
    }

    pub fn get_event_slice(&self, start: usize, end: usize) -> Vec<EventRecord> {
        self.store.slice(start, end)
    }

    /// Add a loosely-typed event to the coordinator's own history
    pub fn append_event(&mut self, fields: Map<String, Value>) -> Result<&EventRecord, InvalidEventError> {
        self.store.append_fields(fields)
    }

    pub fn server_mut(&mut self, name: &str) -> Result<&mut ServerConnection, ProxyError> {
        Ok(self.server_and_store(name)?.0)
    }

    /// Look up a server, along with the store its lifecycle events go to
    pub fn server_and_store(&mut self, name: &str) -> Result<(&mut ServerConnection, &mut EventStore), ProxyError> {
        let not_found = || ProxyError::NotFound(format!("No such server: {}", name));

        let key = ServerName::convert(name).map_err(|_| not_found())?;
        let server = self.servers.get_mut(&key).ok_or_else(not_found)?;

        Ok((server, &mut self.store))
    }

    fn connection_info(&self, id: ConnectionId) -> Option<ConnectionInfo> {
        self.servers
            .values()
            .find(|s| s.connection_id() == id)
            .map(ServerConnection::info)
    }

    fn handle_irc_event(&mut self, event: IrcEvent) {
        match event {
            IrcEvent::Received(raw) => match normalize(&raw, |id| self.connection_info(id)) {
                Ok(Some(record)) => self.route_event(record),
                Ok(None) => {
                    tracing::trace!(connection = %raw.connection, event_type = %raw.event_type, "Ignoring event");
                }
                Err(e) => {
                    tracing::error!(connection = %raw.connection, "{}", e);
                }
            },
            IrcEvent::Closed { connection, error } => {
                let name = self
                    .servers
                    .values()
                    .find(|s| s.connection_id() == connection)
                    .map(ServerConnection::name);

                // Connections we closed ourselves have already been removed
                if let Some(name) = name {
                    tracing::warn!(server = %name, ?error, "Lost connection to server");
                    self.servers.remove(&name);
                    self.store.append(
                        Some(name),
                        EventDetails::ServerDisconnect {
                            text: error.unwrap_or_else(|| "connection closed".to_string()),
                        },
                    );
                }
            }
        }
    }

    fn route_event(&mut self, record: EventRecord) {
        let server = match record.server {
            Some(name) => self.servers.get_mut(&name),
            None => None,
        };

        match server {
            Some(server) => server.route(record),
            None => {
                self.store.append_record(record);
            }
        }
    }

    /// Handle every IRC event that has already arrived, without waiting.
    /// Returns the number handled.
    pub fn process_pending_irc_events(&mut self) -> usize {
        let mut count = 0;
        while let Ok(event) = self.irc_events_recv.try_recv() {
            self.handle_irc_event(event);
            count += 1;
        }
        count
    }

    /// Serve RPC calls and IRC events until `shutdown` fires or the call
    /// channel closes, then disconnect from every server.
    pub async fn run(mut self, mut calls: mpsc::Receiver<RpcCall>, mut shutdown: oneshot::Receiver<()>) {
        loop {
            // Anything that arrived while the last call was handled comes first
            self.process_pending_irc_events();

            select! {
                call = calls.recv() =>
                {
                    match call
                    {
                        Some(call) =>
                        {
                            let response = self.handle_request(&call.request).await;
                            if call.response.send(response).is_err()
                            {
                                tracing::debug!("Client went away before its response was sent");
                            }
                        }
                        None => break
                    }
                },
                event = self.irc_events_recv.recv() =>
                {
                    if let Some(event) = event
                    {
                        self.handle_irc_event(event);
                    }
                },
                _ = &mut shutdown =>
                {
                    break
                }
            }
        }

        self.shutdown("Proxy shutting down");
    }

    /// Disconnect from every server
    pub fn shutdown(&mut self, message: &str) {
        for name in self.server_list() {
            self.server_disconnect(name.as_ref(), message)
                .or_log(format!("disconnecting {}", name));
        }
    }
}
