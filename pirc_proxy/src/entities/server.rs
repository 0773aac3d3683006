use super::Channel;
use crate::config::ConnectPolicy;
use crate::errors::ProxyError;
use crate::irc::{ConnectionId, IrcConnection, IrcConnectionParams, IrcEvent};
use crate::normalizer::ConnectionInfo;
use pirc_network::prelude::*;

use itertools::Itertools;
use std::collections::HashMap;
use tokio::sync::mpsc::UnboundedSender;
use tracing::instrument;

/// One live connection to an IRC server, and the channels joined on it
#[derive(Debug)]
pub struct ServerConnection {
    name: ServerName,
    uri: String,
    port: u16,
    connection: IrcConnection,
    channels: HashMap<ChannelName, Channel>,
    store: EventStore,
}

impl ServerConnection {
    /// Connect to the server, retrying according to `policy`
    #[instrument(skip(params, policy, events), fields(uri = %params.host, port = params.port))]
    pub async fn connect(
        name: ServerName,
        params: IrcConnectionParams,
        policy: &ConnectPolicy,
        events: UnboundedSender<IrcEvent>,
    ) -> Result<Self, ProxyError> {
        let attempts = policy.attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            match IrcConnection::connect(&params, events.clone()).await {
                Ok(connection) => {
                    return Ok(Self {
                        name,
                        uri: params.host,
                        port: params.port,
                        connection,
                        channels: HashMap::new(),
                        store: EventStore::new(),
                    });
                }
                Err(e) => {
                    tracing::warn!(attempt, attempts, "Failed to connect: {}", e);
                    last_error = Some(e);
                    if attempt < attempts {
                        tokio::time::sleep(policy.retry_delay()).await;
                    }
                }
            }
        }

        Err(ProxyError::Connection(format!(
            "Couldn't connect to {}:{} after {} attempts: {}",
            params.host,
            params.port,
            attempts,
            last_error.map(|e| e.to_string()).unwrap_or_default()
        )))
    }

    pub fn name(&self) -> ServerName {
        self.name
    }

    pub fn nick_name(&self) -> Nickname {
        *self.connection.nick()
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection.id()
    }

    pub fn info(&self) -> ConnectionInfo {
        ConnectionInfo {
            server: self.name,
            nick: self.nick_name(),
        }
    }

    pub fn channel(&self, name: &ChannelName) -> Result<&Channel, ProxyError> {
        let server = self.name;
        self.channels.get(name).ok_or_else(|| no_such_channel(server, name))
    }

    pub fn channel_mut(&mut self, name: &ChannelName) -> Result<&mut Channel, ProxyError> {
        let server = self.name;
        self.channels.get_mut(name).ok_or_else(|| no_such_channel(server, name))
    }

    /// Join a channel. The `channel_join` record goes to `lifecycle`, the
    /// coordinator's store.
    pub fn channel_join(&mut self, name: ChannelName, lifecycle: &mut EventStore) -> Result<(), ProxyError> {
        if self.channels.contains_key(&name) {
            return Err(ProxyError::Duplicate(format!("Already in channel {} on {}", name, self.name)));
        }

        let sender = self.connection.sender();
        sender.join(name.as_ref())?;

        self.channels
            .insert(name, Channel::new(self.name, name, sender.clone()));
        lifecycle.append(
            Some(self.name),
            EventDetails::ChannelJoin {
                target: name,
                user: sender.nick().to_string(),
                this_user: true,
            },
        );

        tracing::debug!(server = %self.name, channel = %name, "Joined channel");
        Ok(())
    }

    /// Part a channel and forget it
    pub fn channel_leave(
        &mut self,
        name: &ChannelName,
        message: &str,
        lifecycle: &mut EventStore,
    ) -> Result<(), ProxyError> {
        if !self.channels.contains_key(name) {
            return Err(no_such_channel(self.name, name));
        }

        self.connection.sender().part(name.as_ref(), message)?;
        self.forget_channel(name, message, lifecycle);
        Ok(())
    }

    /// Leave every joined channel. Used before disconnecting, when a failure
    /// to send the part shouldn't stop the channel being forgotten.
    pub fn leave_all(&mut self, message: &str, lifecycle: &mut EventStore) {
        for name in self.channel_list() {
            self.connection
                .sender()
                .part(name.as_ref(), message)
                .or_log(format!("parting {} on {}", name, self.name));
            self.forget_channel(&name, message, lifecycle);
        }
    }

    fn forget_channel(&mut self, name: &ChannelName, message: &str, lifecycle: &mut EventStore) {
        self.channels.remove(name);
        lifecycle.append(
            Some(self.name),
            EventDetails::ChannelLeave {
                target: *name,
                text: message.to_string(),
            },
        );
        tracing::debug!(server = %self.name, channel = %name, "Left channel");
    }

    /// Leave all channels and close the connection
    pub fn disconnect(mut self, message: &str, lifecycle: &mut EventStore) {
        self.leave_all(message, lifecycle);
        self.connection.quit(message);
        lifecycle.append(
            Some(self.name),
            EventDetails::ServerDisconnect {
                text: message.to_string(),
            },
        );
        tracing::info!(server = %self.name, uri = %self.uri, port = self.port, "Disconnected");
    }

    pub fn channel_list(&self) -> Vec<ChannelName> {
        self.channels.keys().copied().sorted().collect()
    }

    /// Send a message to any target. Messages to a joined channel are echoed
    /// into that channel's history, anything else into the server's.
    pub fn privmsg(&mut self, target: &str, text: &str) -> Result<(), ProxyError> {
        if let Ok(name) = ChannelName::convert(target) {
            if let Some(channel) = self.channels.get_mut(&name) {
                channel.message(text)?;
                return Ok(());
            }
        }

        let sender = self.connection.sender();
        sender.privmsg(target, text)?;
        self.store.append(
            Some(self.name),
            EventDetails::Privmsg {
                source: sender.nick().to_string(),
                target: target.to_string(),
                text: text.to_string(),
            },
        );
        Ok(())
    }

    /// File a received event with the channel it concerns, or with the
    /// server if it doesn't concern a joined channel
    pub fn route(&mut self, record: EventRecord) {
        let channel_name = record
            .details
            .target()
            .filter(|_| record.details.is_channel_scoped())
            .and_then(|target| ChannelName::convert(target).ok());

        if let Some(name) = channel_name {
            if let Some(channel) = self.channels.get_mut(&name) {
                channel.record(record);
                return;
            }
        }
        self.store.append_record(record);
    }

    pub fn get_events_since(&self, timestamp: f64) -> Vec<EventRecord> {
        self.store.since(timestamp)
    }

    pub fn get_event_slice(&self, start: usize, end: usize) -> Vec<EventRecord> {
        self.store.slice(start, end)
    }

    /// Events newer than `timestamp` from this server and all its channels,
    /// in no particular order
    pub fn all_events_since(&self, timestamp: f64) -> Vec<EventRecord> {
        let mut ret = self.store.since(timestamp);
        for channel in self.channels.values() {
            ret.extend(channel.get_events_since(timestamp));
        }
        ret
    }
}

fn no_such_channel(server: ServerName, channel: &ChannelName) -> ProxyError {
    ProxyError::NotFound(format!("Not in channel {} on {}", channel, server))
}
