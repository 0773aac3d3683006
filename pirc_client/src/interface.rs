//! The foreground half of a client session.

use crate::{
    client::ProxyClient,
    command::{self, Context},
    config::ClientConfig,
    poller::{EventPoller, PollerMessage},
};
use pirc_network::{config::TlsData, event::EventRecord, transport::TransportError, utils::OrLog};

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TryRecvError};

/// How long to wait for input before checking for new events again
const INPUT_WAIT: Duration = Duration::from_millis(100);

/// Most poller messages handled in one pass, so that a flood of events can't
/// starve user input
const MAX_DRAIN: usize = 64;

pub enum Input {
    Line(String),
    /// Nothing arrived within the wait
    Idle,
    /// No more input will arrive
    Closed,
}

/// A way of showing events to the user and reading their commands
#[async_trait]
pub trait Interface: Send {
    fn show_events(&mut self, events: &[EventRecord]);

    /// Report the outcome of a command, or an error
    fn notify(&mut self, message: &str);

    async fn next_input(&mut self, wait: Duration) -> Input;

    /// Release whatever the interface holds. Called exactly once at the end
    /// of a session, however far it got.
    fn teardown(&mut self);
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Couldn't set up proxy client: {0}")]
    Setup(#[from] TransportError),
    #[error("Event poller stopped: {0}")]
    PollerKilled(String),
    #[error("Event poller went away")]
    PollerGone,
}

/// Run a client session until input closes or the poller dies. The
/// interface is torn down afterwards whatever the outcome.
pub async fn run_session<I: Interface>(interface: &mut I, config: &ClientConfig, tls: &TlsData) -> Result<(), SessionError> {
    let result = session(interface, config, tls).await;
    interface.teardown();
    result
}

async fn session<I: Interface>(interface: &mut I, config: &ClientConfig, tls: &TlsData) -> Result<(), SessionError> {
    let mut client = ProxyClient::from_config(config, tls)?;
    let poll_client = ProxyClient::from_config(config, tls)?;

    let (poll_send, mut poll_recv) = mpsc::channel(64);
    let poller = EventPoller::start(poll_client, config.poll_interval(), 0.0, poll_send);

    let result = foreground(interface, &mut client, &mut poll_recv).await;

    // Unblocks a poller waiting on a full channel
    drop(poll_recv);
    // A fatal poller error has already been reported through the channel
    poller.shutdown().await.or_log("stopping event poller");
    result
}

/// The foreground loop: show whatever the poller has sent, then wait
/// briefly for a line of input and act on it.
pub async fn foreground<I: Interface>(
    interface: &mut I,
    client: &mut ProxyClient,
    poller: &mut mpsc::Receiver<PollerMessage>,
) -> Result<(), SessionError> {
    let mut context = Context::default();

    loop {
        for _ in 0..MAX_DRAIN {
            match poller.try_recv() {
                Ok(PollerMessage::Events(events)) => interface.show_events(&events),
                Ok(PollerMessage::Kill(reason)) => {
                    interface.notify(&format!("Lost contact with proxy: {}", reason));
                    return Err(SessionError::PollerKilled(reason));
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return Err(SessionError::PollerGone),
            }
        }

        let line = match interface.next_input(INPUT_WAIT).await {
            Input::Line(line) => line,
            Input::Idle => continue,
            Input::Closed => return Ok(()),
        };

        if line.trim().is_empty() {
            continue;
        }

        let result = match command::parse(&line) {
            Ok(command) => command::execute(client, &mut context, command).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(feedback) if feedback.is_empty() => {}
            Ok(feedback) => interface.notify(&feedback),
            Err(e) => interface.notify(&format!("Error: {}", e)),
        }
    }
}
