//! Parsing and running the commands a user types.

use crate::client::{ClientError, ConnectOptions, ProxyClient};
use pirc_network::utils::is_channel_name;

use thiserror::Error;

const DEFAULT_PORT: u16 = 6667;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Connect {
        name: String,
        nick: String,
        uri: String,
        port: u16,
    },
    Join {
        channel: String,
    },
    /// Leave a channel; the current one if none is named
    Leave {
        channel: Option<String>,
        message: String,
    },
    /// Disconnect from a server; the current one if none is named
    Disconnect {
        name: Option<String>,
    },
    List,
    /// Plain text, sent to the current channel
    Message {
        text: String,
    },
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Unknown command /{0}")]
    Unknown(String),
    #[error("Usage: {0}")]
    Usage(&'static str),
    #[error("Invalid port number {0}")]
    InvalidPort(String),
    #[error("No {0} selected")]
    NoContext(&'static str),
    #[error(transparent)]
    Proxy(#[from] ClientError),
}

/// The server and channel that commands apply to when they don't name one
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    pub server: Option<String>,
    pub channel: Option<String>,
}

impl Context {
    fn server(&self) -> Result<&str, CommandError> {
        self.server.as_deref().ok_or(CommandError::NoContext("server"))
    }

    fn channel(&self) -> Result<&str, CommandError> {
        self.channel.as_deref().ok_or(CommandError::NoContext("channel"))
    }
}

/// Parse one line of input
pub fn parse(line: &str) -> Result<Command, CommandError> {
    let line = line.trim_end_matches(&['\r', '\n'][..]);

    let rest = match line.strip_prefix('/') {
        Some(rest) => rest,
        None => {
            return Ok(Command::Message {
                text: line.to_string(),
            })
        }
    };

    let mut words = rest.split_whitespace();
    let name = words.next().unwrap_or_default();
    let args: Vec<&str> = words.collect();

    match name.to_ascii_lowercase().as_str() {
        "connect" => {
            const USAGE: &str = "/connect <name> <nick> <host> [port]";
            match args[..] {
                [name, nick, uri] => Ok(Command::Connect {
                    name: name.to_string(),
                    nick: nick.to_string(),
                    uri: uri.to_string(),
                    port: DEFAULT_PORT,
                }),
                [name, nick, uri, port] => Ok(Command::Connect {
                    name: name.to_string(),
                    nick: nick.to_string(),
                    uri: uri.to_string(),
                    port: port.parse().map_err(|_| CommandError::InvalidPort(port.to_string()))?,
                }),
                _ => Err(CommandError::Usage(USAGE)),
            }
        }
        "join" => match args[..] {
            [channel] => Ok(Command::Join {
                channel: channel.to_string(),
            }),
            _ => Err(CommandError::Usage("/join <channel>")),
        },
        "leave" | "part" => {
            let (channel, message) = match args.split_first() {
                Some((first, rest)) if is_channel_name(first) => (Some(first.to_string()), rest),
                _ => (None, &args[..]),
            };
            Ok(Command::Leave {
                channel,
                message: message.join(" "),
            })
        }
        "disconnect" => match args[..] {
            [] => Ok(Command::Disconnect { name: None }),
            [name] => Ok(Command::Disconnect {
                name: Some(name.to_string()),
            }),
            _ => Err(CommandError::Usage("/disconnect [name]")),
        },
        "list" if args.is_empty() => Ok(Command::List),
        "list" => Err(CommandError::Usage("/list")),
        _ => Err(CommandError::Unknown(name.to_string())),
    }
}

/// Run a command against the proxy, updating `context` to follow it.
/// Returns a line of feedback for the user.
pub async fn execute(client: &mut ProxyClient, context: &mut Context, command: Command) -> Result<String, CommandError> {
    match command {
        Command::Connect { name, nick, uri, port } => {
            client
                .server_connect(&name, &nick, &uri, port, &ConnectOptions::default())
                .await?;
            let feedback = format!("Connected to {} as {}", name, nick);
            context.server = Some(name);
            context.channel = None;
            Ok(feedback)
        }
        Command::Join { channel } => {
            let server = context.server()?.to_string();
            client.channel_join(&server, &channel).await?;
            let feedback = format!("Joined {} on {}", channel, server);
            context.channel = Some(channel);
            Ok(feedback)
        }
        Command::Leave { channel, message } => {
            let server = context.server()?.to_string();
            let channel = match channel {
                Some(channel) => channel,
                None => context.channel()?.to_string(),
            };
            client.channel_leave(&server, &channel, &message).await?;
            if context.channel.as_deref() == Some(channel.as_str()) {
                context.channel = None;
            }
            Ok(format!("Left {}", channel))
        }
        Command::Disconnect { name } => {
            let name = match name {
                Some(name) => name,
                None => context.server()?.to_string(),
            };
            client.server_disconnect(&name, "").await?;
            if context.server.as_deref() == Some(name.as_str()) {
                *context = Context::default();
            }
            Ok(format!("Disconnected from {}", name))
        }
        Command::List => {
            let servers = client.server_list().await?;
            if servers.is_empty() {
                return Ok("Not connected to any servers".to_string());
            }
            let mut feedback = format!("Servers: {}", servers.join(", "));
            if let Some(server) = &context.server {
                let channels = client.channel_list(server).await?;
                feedback.push_str(&format!("; channels on {}: {}", server, channels.join(", ")));
            }
            Ok(feedback)
        }
        Command::Message { text } => {
            let server = context.server()?.to_string();
            let channel = context.channel()?.to_string();
            client.channel_message(&server, &channel, &text).await?;
            Ok(String::new())
        }
    }
}
