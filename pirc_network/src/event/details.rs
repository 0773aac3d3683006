use super::clock;
use crate::utils::is_channel_name;
use crate::validated::{ChannelName, ServerName};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// An error raised when a set of raw fields can't be interpreted as an event
#[derive(Debug, Clone, Error, PartialEq)]
pub enum InvalidEventError {
    #[error("event has no type")]
    MissingType,
    #[error("invalid {kind} event: {reason}")]
    Malformed { kind: String, reason: String },
}

/// The kind-specific content of an [`EventRecord`].
///
/// On the wire the variant name becomes the record's `type` field and the
/// variant's fields sit alongside it in the same flat object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, strum::IntoStaticStr)]
#[serde(tag = "type", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventDetails {
    ServerConnect,
    ServerDisconnect {
        text: String,
    },

    ChannelJoin {
        target: ChannelName,
        user: String,
        this_user: bool,
    },
    ChannelPart {
        target: ChannelName,
        user: String,
        this_user: bool,
        #[serde(default)]
        text: String,
    },
    /// Recorded locally when we leave a channel on request
    ChannelLeave {
        target: ChannelName,
        #[serde(default)]
        text: String,
    },

    Privmsg {
        source: String,
        target: String,
        text: String,
    },
    Pubmsg {
        source: String,
        target: String,
        text: String,
    },
    Privnotice {
        source: String,
        target: String,
        text: String,
    },
    Pubnotice {
        source: String,
        target: String,
        text: String,
    },

    Welcome { text: String },
    Yourhost { text: String },
    Created { text: String },
    Motdstart { text: String },
    Motd { text: String },
    Endofmotd { text: String },
    Luserclient { text: String },
    Luserop { text: String },
    Luserunknown { text: String },
    Luserchannels { text: String },
    Luserme { text: String },
    Luserconns { text: String },
    #[serde(rename = "n_local")]
    #[strum(serialize = "n_local")]
    NLocal { text: String },
    #[serde(rename = "n_global")]
    #[strum(serialize = "n_global")]
    NGlobal { text: String },

    /// A numeric reply we don't otherwise understand, usually an error
    IrcError {
        code: u16,
        text: String,
    },
}

impl EventDetails {
    /// Construct an informational event from its type name, if the name is
    /// one of the known informational kinds.
    pub fn informational(kind: &str, text: String) -> Option<Self> {
        Some(match kind {
            "welcome" => Self::Welcome { text },
            "yourhost" => Self::Yourhost { text },
            "created" => Self::Created { text },
            "motdstart" => Self::Motdstart { text },
            "motd" => Self::Motd { text },
            "endofmotd" => Self::Endofmotd { text },
            "luserclient" => Self::Luserclient { text },
            "luserop" => Self::Luserop { text },
            "luserunknown" => Self::Luserunknown { text },
            "luserchannels" => Self::Luserchannels { text },
            "luserme" => Self::Luserme { text },
            "luserconns" => Self::Luserconns { text },
            "n_local" => Self::NLocal { text },
            "n_global" => Self::NGlobal { text },
            _ => return None,
        })
    }

    /// The value of this event's `type` field
    pub fn kind(&self) -> &'static str {
        self.into()
    }

    /// The channel or user this event is addressed to, if any
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::ChannelJoin { target, .. }
            | Self::ChannelPart { target, .. }
            | Self::ChannelLeave { target, .. } => Some(target.as_ref()),
            Self::Privmsg { target, .. }
            | Self::Pubmsg { target, .. }
            | Self::Privnotice { target, .. }
            | Self::Pubnotice { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Whether this event belongs in a channel's history rather than its server's
    pub fn is_channel_scoped(&self) -> bool {
        self.target().map_or(false, is_channel_name)
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Self::ServerConnect | Self::ChannelJoin { .. } => None,
            Self::ServerDisconnect { text }
            | Self::ChannelPart { text, .. }
            | Self::ChannelLeave { text, .. }
            | Self::Privmsg { text, .. }
            | Self::Pubmsg { text, .. }
            | Self::Privnotice { text, .. }
            | Self::Pubnotice { text, .. }
            | Self::Welcome { text }
            | Self::Yourhost { text }
            | Self::Created { text }
            | Self::Motdstart { text }
            | Self::Motd { text }
            | Self::Endofmotd { text }
            | Self::Luserclient { text }
            | Self::Luserop { text }
            | Self::Luserunknown { text }
            | Self::Luserchannels { text }
            | Self::Luserme { text }
            | Self::Luserconns { text }
            | Self::NLocal { text }
            | Self::NGlobal { text }
            | Self::IrcError { text, .. } => Some(text),
        }
    }
}

/// One thing that happened, as seen by the proxy.
///
/// Records are created once and never modified. `server` is serialised as
/// `false` for events that don't belong to a particular server connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub time: f64,
    #[serde(default, with = "server_or_false")]
    pub server: Option<ServerName>,
    #[serde(flatten)]
    pub details: EventDetails,
}

impl EventRecord {
    /// Create a record stamped with the current time
    pub fn new(server: Option<ServerName>, details: EventDetails) -> Self {
        Self {
            time: clock::now(),
            server,
            details,
        }
    }

    pub fn kind(&self) -> &'static str {
        self.details.kind()
    }

    /// Build a record from a loosely-typed field map, filling in `time` and
    /// `server` if they're absent.
    pub fn from_fields(mut fields: Map<String, Value>) -> Result<Self, InvalidEventError> {
        let kind = match fields.get("type") {
            Some(Value::String(kind)) => kind.clone(),
            _ => return Err(InvalidEventError::MissingType),
        };

        if matches!(fields.get("time"), None | Some(Value::Null)) {
            fields.insert("time".to_string(), clock::now().into());
        }
        fields
            .entry("server")
            .or_insert(Value::Bool(false));

        serde_json::from_value(Value::Object(fields)).map_err(|e| InvalidEventError::Malformed {
            kind,
            reason: e.to_string(),
        })
    }
}

mod server_or_false {
    use crate::validated::ServerName;
    use serde::{de::Error, Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        server: &Option<ServerName>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match server {
            Some(name) => name.serialize(serializer),
            None => serializer.serialize_bool(false),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<ServerName>, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Field {
            Name(ServerName),
            Flag(bool),
            Missing(()),
        }

        match Field::deserialize(deserializer)? {
            Field::Name(name) => Ok(Some(name)),
            Field::Flag(false) | Field::Missing(()) => Ok(None),
            Field::Flag(true) => Err(D::Error::custom(
                "server must be a server name or false",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validated::Validated;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn wire_shape_is_flat() {
        let record = EventRecord {
            time: 12.5,
            server: Some(ServerName::convert("server1").unwrap()),
            details: EventDetails::Pubmsg {
                source: "nick!user@host".to_string(),
                target: "#test".to_string(),
                text: "hello".to_string(),
            },
        };

        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({
                "time": 12.5,
                "server": "server1",
                "type": "pubmsg",
                "source": "nick!user@host",
                "target": "#test",
                "text": "hello",
            })
        );
    }

    #[test]
    fn missing_server_is_false() {
        let record = EventRecord {
            time: 1.0,
            server: None,
            details: EventDetails::NLocal {
                text: "Current local users: 3".to_string(),
            },
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["server"], json!(false));
        assert_eq!(value["type"], json!("n_local"));

        let parsed: EventRecord = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn from_fields_requires_type() {
        let err = EventRecord::from_fields(fields(json!({"text": "x"}))).unwrap_err();
        assert_eq!(err, InvalidEventError::MissingType);

        let err = EventRecord::from_fields(fields(json!({"type": 7}))).unwrap_err();
        assert_eq!(err, InvalidEventError::MissingType);
    }

    #[test]
    fn from_fields_fills_defaults() {
        let before = clock::now();
        let record =
            EventRecord::from_fields(fields(json!({"type": "motd", "text": "hi"}))).unwrap();

        assert!(record.time > before);
        assert_eq!(record.server, None);
        assert_eq!(record.details, EventDetails::Motd { text: "hi".to_string() });
    }

    #[test]
    fn from_fields_rejects_unknown_or_incomplete() {
        assert!(matches!(
            EventRecord::from_fields(fields(json!({"type": "bogus"}))),
            Err(InvalidEventError::Malformed { .. })
        ));
        assert!(matches!(
            EventRecord::from_fields(fields(json!({"type": "channel_join", "target": "nochan"}))),
            Err(InvalidEventError::Malformed { .. })
        ));
    }

    #[test]
    fn channel_scope() {
        let join = EventDetails::ChannelJoin {
            target: ChannelName::convert("#pirc").unwrap(),
            user: "a!b@c".to_string(),
            this_user: false,
        };
        assert!(join.is_channel_scoped());

        let private = EventDetails::Privmsg {
            source: "a!b@c".to_string(),
            target: "pirc_test_user1".to_string(),
            text: "hi".to_string(),
        };
        assert!(!private.is_channel_scoped());
        assert_eq!(private.kind(), "privmsg");
        assert_eq!(EventDetails::ServerConnect.kind(), "server_connect");
        assert_eq!(EventDetails::NGlobal { text: String::new() }.kind(), "n_global");
    }
}
