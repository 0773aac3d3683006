use super::*;
use pirc_network::validated::Nickname;

use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader},
    net::TcpStream,
    select,
    sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
};
use tokio_rustls::TlsConnector;
use tracing::instrument;

/// How long to wait for the server to close after we quit
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Where and how to connect to an IRC server
#[derive(Debug, Clone)]
pub struct IrcConnectionParams {
    pub host: String,
    pub port: u16,
    pub nick: Nickname,
    pub password: Option<String>,
    pub ssl: bool,
    /// Prefer IPv6 addresses when the host has both
    pub ipv6: bool,
}

#[derive(Debug)]
enum ConnectionControl {
    Send(String),
    Quit(String),
}

/// A cloneable handle for sending lines on an existing connection
#[derive(Debug, Clone)]
pub struct IrcSender {
    nick: Nickname,
    control: UnboundedSender<ConnectionControl>,
}

impl IrcSender {
    pub fn nick(&self) -> &Nickname {
        &self.nick
    }

    pub fn send(&self, command: &str, args: &[&str]) -> Result<(), IrcError> {
        let line = format_line(command, args);
        tracing::trace!(%line, "Sending");
        self.control
            .send(ConnectionControl::Send(line))
            .map_err(|_| IrcError::Closed)
    }

    pub fn join(&self, channel: &str) -> Result<(), IrcError> {
        self.send("JOIN", &[channel])
    }

    pub fn part(&self, channel: &str, message: &str) -> Result<(), IrcError> {
        if message.is_empty() {
            self.send("PART", &[channel])
        } else {
            self.send("PART", &[channel, message])
        }
    }

    pub fn privmsg(&self, target: &str, text: &str) -> Result<(), IrcError> {
        self.send("PRIVMSG", &[target, text])
    }
}

/// A live connection to an IRC server.
///
/// Reading and writing happen on a spawned task; received lines are
/// reported on the event channel given to [`IrcConnection::connect`].
/// Dropping the handle closes the connection.
#[derive(Debug)]
pub struct IrcConnection {
    id: ConnectionId,
    sender: IrcSender,
}

impl IrcConnection {
    /// Open a connection and begin registration. Returns once the socket
    /// (and TLS session, if requested) is established.
    #[instrument(skip_all, fields(host = %params.host, port = params.port))]
    pub async fn connect(
        params: &IrcConnectionParams,
        events: UnboundedSender<IrcEvent>,
    ) -> Result<Self, IrcError> {
        let conn = open_socket(&params.host, params.port, params.ipv6).await?;

        let id = ConnectionId::next();
        let (control_send, control_recv) = unbounded_channel();

        if params.ssl {
            let server_name = rustls::ServerName::try_from(params.host.as_str())
                .map_err(|_| IrcError::InvalidServerName(params.host.clone()))?;
            let connector = TlsConnector::from(irc_tls_config());
            let stream = connector.connect(server_name, conn).await?;
            tokio::spawn(run_connection(id, stream, control_recv, events));
        } else {
            tokio::spawn(run_connection(id, conn, control_recv, events));
        }

        let ret = Self {
            id,
            sender: IrcSender {
                nick: params.nick,
                control: control_send,
            },
        };

        let nick = params.nick.to_string();
        if let Some(password) = params.password.as_deref().filter(|p| !p.is_empty()) {
            ret.sender.send("PASS", &[password])?;
        }
        ret.sender.send("NICK", &[nick.as_str()])?;
        ret.sender.send("USER", &[nick.as_str(), "0", "*", nick.as_str()])?;

        tracing::info!(connection = %id, host = %params.host, port = params.port, "Connected to IRC server");

        Ok(ret)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn nick(&self) -> &Nickname {
        self.sender.nick()
    }

    pub fn sender(&self) -> &IrcSender {
        &self.sender
    }

    /// Send QUIT and close the connection once it has been written
    pub fn quit(&self, message: &str) {
        let line = format_line("QUIT", &[message]);
        if self.sender.control.send(ConnectionControl::Quit(line)).is_err() {
            tracing::debug!(connection = %self.id, "Quit on a connection that has already closed");
        }
    }
}

async fn open_socket(host: &str, port: u16, prefer_ipv6: bool) -> Result<TcpStream, IrcError> {
    let mut addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| IrcError::Resolve(host.to_string(), e))?
        .collect();

    // Stable sort, so the resolver's order is otherwise kept
    addrs.sort_by_key(|addr| addr.is_ipv6() != prefer_ipv6);

    let mut last_error = None;
    for addr in addrs {
        match TcpStream::connect(addr).await {
            Ok(conn) => return Ok(conn),
            Err(e) => {
                tracing::debug!(%addr, "Connection attempt failed: {}", e);
                last_error = Some(e);
            }
        }
    }

    Err(match last_error {
        Some(e) => IrcError::Io(e),
        None => IrcError::NoAddress(host.to_string()),
    })
}

fn irc_tls_config() -> Arc<rustls::ClientConfig> {
    let mut roots = rustls::RootCertStore::empty();
    roots.add_server_trust_anchors(webpki_roots::TLS_SERVER_ROOTS.0.iter().map(|ta| {
        rustls::OwnedTrustAnchor::from_subject_spki_name_constraints(
            ta.subject,
            ta.spki,
            ta.name_constraints,
        )
    }));

    Arc::new(
        rustls::ClientConfig::builder()
            .with_safe_defaults()
            .with_root_certificates(roots)
            .with_no_client_auth(),
    )
}

async fn run_connection<S>(
    id: ConnectionId,
    stream: S,
    control: UnboundedReceiver<ConnectionControl>,
    events: UnboundedSender<IrcEvent>,
) where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    let error = connection_loop(id, stream, control, &events)
        .await
        .err()
        .map(|e| e.to_string());

    if let Some(e) = &error {
        tracing::warn!(connection = %id, "IRC connection failed: {}", e);
    } else {
        tracing::debug!(connection = %id, "IRC connection closed");
    }

    // Nobody to tell if the receiver has gone away
    let _ = events.send(IrcEvent::Closed {
        connection: id,
        error,
    });
}

async fn connection_loop<S>(
    id: ConnectionId,
    stream: S,
    mut control: UnboundedReceiver<ConnectionControl>,
    events: &UnboundedSender<IrcEvent>,
) -> Result<(), IrcError>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    let (reader, mut writer) = tokio::io::split(stream);
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    loop {
        select! {
            res = reader.read_until(b'\n', &mut buf) =>
            {
                if res? == 0
                {
                    return Ok(());
                }

                let line = String::from_utf8_lossy(&buf).into_owned();
                buf.clear();

                let message = match ServerMessage::parse(&line)
                {
                    Some(message) => message,
                    None => continue,
                };

                if message.command.eq_ignore_ascii_case("PING")
                {
                    let args: Vec<&str> = message.args.iter().map(String::as_str).collect();
                    let pong = format_line("PONG", &args);
                    writer.write_all(pong.as_bytes()).await?;
                    writer.write_all(b"\r\n").await?;
                    continue;
                }

                if events.send(IrcEvent::Received(RawEvent::from_message(id, message))).is_err()
                {
                    return Ok(());
                }
            },
            ctl = control.recv() =>
            {
                match ctl
                {
                    Some(ConnectionControl::Send(line)) =>
                    {
                        writer.write_all(line.as_bytes()).await?;
                        writer.write_all(b"\r\n").await?;
                    }
                    Some(ConnectionControl::Quit(line)) =>
                    {
                        writer.write_all(line.as_bytes()).await?;
                        writer.write_all(b"\r\n").await?;
                        writer.shutdown().await?;
                        drain(id, &mut reader).await;
                        return Ok(());
                    }
                    None =>
                    {
                        // Handle dropped without a quit
                        writer.shutdown().await?;
                        drain(id, &mut reader).await;
                        return Ok(());
                    }
                }
            },
        }
    }
}

/// Discard input until the server closes its side, or until it has had long
/// enough. Dropping the socket with input unread resets the connection, and
/// the server may then lose lines it hasn't read yet.
async fn drain<R>(id: ConnectionId, reader: &mut R)
where
    R: AsyncBufRead + Unpin,
{
    let mut discard = Vec::new();
    let closed = tokio::time::timeout(CLOSE_TIMEOUT, async {
        loop {
            discard.clear();
            match reader.read_until(b'\n', &mut discard).await {
                Ok(0) | Err(_) => return,
                Ok(_) => {}
            }
        }
    })
    .await;

    if closed.is_err() {
        tracing::debug!(connection = %id, "Server didn't close the connection after quit");
    }
}
