//! Turns raw IRC events into canonical event records.

use crate::irc::{ConnectionId, RawEvent, RawEventType};
use pirc_network::prelude::*;
use pirc_network::utils::nick_of;

use thiserror::Error;

/// A raw event type that none of the categories below account for. This
/// indicates a gap in coverage rather than a problem with the connection.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown IRC event type {event_type} (args: {args:?})")]
pub struct UnknownEventTypeError {
    pub event_type: String,
    pub args: Vec<String>,
}

/// What the normaliser needs to know about the connection an event arrived on
#[derive(Debug, Clone, Copy)]
pub struct ConnectionInfo {
    pub server: ServerName,
    pub nick: Nickname,
}

const MESSAGE_EVENTS: &[&str] = &["privmsg", "pubmsg", "privnotice", "pubnotice"];

/// Events that carry nothing worth showing a user
const IGNORED_EVENTS: &[&str] = &[
    "namreply",
    "endofnames",
    "umode",
    "myinfo",
    "featurelist",
    "notopic",
    "topic",
    "topicinfo",
    "ping",
    "pong",
    "mode",
    "nick",
    "quit",
    "kick",
    "invite",
    "wallops",
    "cap",
    "error",
    "disconnect",
];

/// Normalise one raw event.
///
/// `lookup` resolves the event's connection to the server it belongs to;
/// events from connections it doesn't know produce records with no server.
/// Returns `Ok(None)` for events that are deliberately ignored, or that
/// can't be represented (such as a join to a malformed channel name).
pub fn normalize(
    event: &RawEvent,
    lookup: impl Fn(ConnectionId) -> Option<ConnectionInfo>,
) -> Result<Option<EventRecord>, UnknownEventTypeError> {
    let info = lookup(event.connection);
    let server = info.map(|i| i.server);
    let first_arg = || event.args.first().cloned().unwrap_or_default();

    let kind = match &event.event_type {
        RawEventType::Numeric(code) => {
            let details = EventDetails::IrcError {
                code: *code,
                text: event.args.join(" "),
            };
            return Ok(Some(EventRecord::new(server, details)));
        }
        RawEventType::Named(kind) => kind.as_str(),
    };

    let details = if MESSAGE_EVENTS.contains(&kind) {
        let source = event.source.clone();
        let target = event.target.clone();
        let text = first_arg();
        match kind {
            "privmsg" => EventDetails::Privmsg { source, target, text },
            "pubmsg" => EventDetails::Pubmsg { source, target, text },
            "privnotice" => EventDetails::Privnotice { source, target, text },
            _ => EventDetails::Pubnotice { source, target, text },
        }
    } else if let Some(details) = EventDetails::informational(kind, event.args.join(" ")) {
        details
    } else if kind == "connect" {
        EventDetails::ServerConnect
    } else if kind == "join" || kind == "part" {
        let target = match ChannelName::convert(&event.target) {
            Ok(target) => target,
            Err(e) => {
                tracing::warn!(connection = %event.connection, "Dropping {} for bad channel name: {}", kind, e);
                return Ok(None);
            }
        };
        let user = event.source.clone();
        let this_user = match (&info, Nickname::convert(nick_of(&user))) {
            (Some(info), Ok(nick)) => nick == info.nick,
            _ => false,
        };

        if kind == "join" {
            EventDetails::ChannelJoin { target, user, this_user }
        } else {
            EventDetails::ChannelPart {
                target,
                user,
                this_user,
                text: first_arg(),
            }
        }
    } else if IGNORED_EVENTS.contains(&kind) {
        return Ok(None);
    } else {
        return Err(UnknownEventTypeError {
            event_type: kind.to_string(),
            args: event.args.clone(),
        });
    };

    Ok(Some(EventRecord::new(server, details)))
}
