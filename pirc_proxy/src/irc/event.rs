use super::{numeric_name, ServerMessage};
use pirc_network::utils::is_channel_name;

use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies one IRC connection for the lifetime of the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawEventType {
    /// A command, or a numeric with a known name, in lower case
    Named(String),
    /// A numeric reply with no known name
    Numeric(u16),
}

impl std::fmt::Display for RawEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Named(name) => f.write_str(name),
            Self::Numeric(code) => write!(f, "{:03}", code),
        }
    }
}

/// A protocol event as received, before normalisation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub connection: ConnectionId,
    pub event_type: RawEventType,
    /// `nick!user@host` or a server name; empty if the line had no prefix
    pub source: String,
    pub target: String,
    pub args: Vec<String>,
}

impl RawEvent {
    pub fn new(connection: ConnectionId, event_type: &str, source: &str, target: &str, args: &[&str]) -> Self {
        Self {
            connection,
            event_type: RawEventType::Named(event_type.to_string()),
            source: source.to_string(),
            target: target.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Classify a received line. The first parameter is taken as the target;
    /// private messages and notices are split by whether that target is a
    /// channel.
    pub fn from_message(connection: ConnectionId, message: ServerMessage) -> Self {
        let numeric = message.numeric();
        let mut args = message.args.into_iter();
        let target = args.next().unwrap_or_default();
        let args: Vec<String> = args.collect();

        let event_type = match numeric {
            Some(code) => match numeric_name(code) {
                Some(name) => RawEventType::Named(name.to_string()),
                None => RawEventType::Numeric(code),
            },
            None => {
                let command = message.command.to_ascii_lowercase();
                let name = match command.as_str() {
                    "privmsg" if is_channel_name(&target) => "pubmsg".to_string(),
                    "notice" if is_channel_name(&target) => "pubnotice".to_string(),
                    "notice" => "privnotice".to_string(),
                    _ => command,
                };
                RawEventType::Named(name)
            }
        };

        Self {
            connection,
            event_type,
            source: message.prefix.unwrap_or_default(),
            target,
            args,
        }
    }
}

/// What a connection task reports back to its owner
#[derive(Debug)]
pub enum IrcEvent {
    Received(RawEvent),
    /// The connection has ended, for whatever reason
    Closed {
        connection: ConnectionId,
        error: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn classify(line: &str) -> RawEvent {
        RawEvent::from_message(ConnectionId(0), ServerMessage::parse(line).unwrap())
    }

    #[test]
    fn messages_split_by_target() {
        let ev = classify(":a!b@c PRIVMSG #pirc :hi");
        assert_eq!(ev.event_type, RawEventType::Named("pubmsg".to_string()));
        assert_eq!(ev.target, "#pirc");
        assert_eq!(ev.args, vec!["hi".to_string()]);

        let ev = classify(":a!b@c PRIVMSG pirc_test_user1 :hi");
        assert_eq!(ev.event_type, RawEventType::Named("privmsg".to_string()));

        let ev = classify(":irc.example.net NOTICE * :*** Looking up your hostname");
        assert_eq!(ev.event_type, RawEventType::Named("privnotice".to_string()));
        assert_eq!(ev.source, "irc.example.net");

        let ev = classify(":a!b@c NOTICE &local :hi");
        assert_eq!(ev.event_type, RawEventType::Named("pubnotice".to_string()));
    }

    #[test]
    fn numerics() {
        let ev = classify(":irc.example.net 372 pirc_test_user1 :- message of the day");
        assert_eq!(ev.event_type, RawEventType::Named("motd".to_string()));
        assert_eq!(ev.target, "pirc_test_user1");
        assert_eq!(ev.args, vec!["- message of the day".to_string()]);

        let ev = classify(":irc.example.net 433 * pirc_test_user1 :Nickname is already in use");
        assert_eq!(ev.event_type, RawEventType::Numeric(433));
        assert_eq!(ev.event_type.to_string(), "433");
    }

    #[test]
    fn commands_lowercased() {
        let ev = classify(":a!b@c JOIN #pirc");
        assert_eq!(ev.event_type, RawEventType::Named("join".to_string()));
        assert_eq!(ev.target, "#pirc");
        assert!(ev.args.is_empty());
    }
}
