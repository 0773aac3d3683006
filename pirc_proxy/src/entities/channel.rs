use crate::irc::{IrcError, IrcSender};
use pirc_network::prelude::*;

use serde_json::{Map, Value};

/// Membership of one channel on one server connection
#[derive(Debug)]
pub struct Channel {
    server: ServerName,
    name: ChannelName,
    sender: IrcSender,
    store: EventStore,
}

impl Channel {
    pub fn new(server: ServerName, name: ChannelName, sender: IrcSender) -> Self {
        Self {
            server,
            name,
            sender,
            store: EventStore::new(),
        }
    }

    /// Store an event received for this channel
    pub fn record(&mut self, record: EventRecord) {
        self.store.append_record(record);
    }

    /// Store an event supplied as loose fields
    pub fn record_fields(&mut self, fields: Map<String, Value>) -> Result<&EventRecord, InvalidEventError> {
        self.store.append_fields(fields)
    }

    /// Send a message to the channel.
    ///
    /// The server won't echo it back to us, so a `privmsg` record is stored
    /// as other members would see it.
    pub fn message(&mut self, text: &str) -> Result<&EventRecord, IrcError> {
        self.sender.privmsg(self.name.as_ref(), text)?;

        Ok(self.store.append(
            Some(self.server),
            EventDetails::Privmsg {
                source: self.sender.nick().to_string(),
                target: self.name.to_string(),
                text: text.to_string(),
            },
        ))
    }

    pub fn get_events_since(&self, timestamp: f64) -> Vec<EventRecord> {
        self.store.since(timestamp)
    }

    pub fn get_event_slice(&self, start: usize, end: usize) -> Vec<EventRecord> {
        self.store.slice(start, end)
    }
}
