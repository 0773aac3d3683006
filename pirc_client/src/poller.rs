use crate::client::{ClientError, ProxyClient};
use pirc_network::event::{sort_by_time, EventRecord};

use async_trait::async_trait;
use std::time::Duration;
use tokio::{
    select,
    sync::{mpsc, oneshot},
    task::JoinHandle,
    time::MissedTickBehavior,
};

/// Something the poller can ask for new events
#[async_trait]
pub trait EventSource: Send + 'static {
    async fn events_since(&mut self, timestamp: f64) -> Result<Vec<EventRecord>, ClientError>;
}

#[async_trait]
impl EventSource for ProxyClient {
    async fn events_since(&mut self, timestamp: f64) -> Result<Vec<EventRecord>, ClientError> {
        self.get_events_since(timestamp).await
    }
}

/// What the poller sends to the foreground
#[derive(Debug)]
pub enum PollerMessage {
    /// New events, oldest first
    Events(Vec<EventRecord>),
    /// The poller hit an error it can't recover from, and has stopped
    Kill(String),
}

/// Polls an [`EventSource`] on a background task.
///
/// Each non-empty batch is sorted and forwarded, and the next poll asks only
/// for events newer than the newest one seen so far. Errors that may clear
/// up (the proxy being unreachable) are logged once and polling carries on;
/// anything else is reported with [`PollerMessage::Kill`] and ends the task.
pub struct EventPoller {
    shutdown_send: oneshot::Sender<()>,
    task: JoinHandle<Result<(), ClientError>>,
}

impl EventPoller {
    pub fn start<S: EventSource>(
        source: S,
        interval: Duration,
        start_time: f64,
        channel: mpsc::Sender<PollerMessage>,
    ) -> Self {
        let (shutdown_send, shutdown_recv) = oneshot::channel();
        let task = tokio::spawn(poll_loop(source, interval, start_time, channel, shutdown_recv));

        Self { shutdown_send, task }
    }

    /// Stop polling and wait for the task to finish. Returns the error that
    /// stopped the poller, if it had already stopped for that reason.
    pub async fn shutdown(self) -> Result<(), ClientError> {
        // Fails if the task has already exited, which is fine
        let _ = self.shutdown_send.send(());

        match self.task.await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!("Event poller task failed: {}", e);
                Ok(())
            }
        }
    }
}

async fn poll_loop<S: EventSource>(
    mut source: S,
    interval: Duration,
    mut last_seen: f64,
    channel: mpsc::Sender<PollerMessage>,
    mut shutdown: oneshot::Receiver<()>,
) -> Result<(), ClientError> {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_error: Option<String> = None;

    loop {
        select! {
            _ = ticker.tick() => {}
            _ = &mut shutdown => return Ok(()),
        }

        let result = select! {
            result = source.events_since(last_seen) => result,
            _ = &mut shutdown => return Ok(()),
        };

        match result {
            Ok(mut events) => {
                last_error = None;
                if events.is_empty() {
                    continue;
                }

                sort_by_time(&mut events);
                if let Some(newest) = events.last() {
                    last_seen = last_seen.max(newest.time);
                }

                if channel.send(PollerMessage::Events(events)).await.is_err() {
                    tracing::debug!("Foreground has gone away; stopping event poller");
                    return Ok(());
                }
            }
            Err(e) if e.is_transient() => {
                let message = e.to_string();
                if last_error.as_deref() != Some(message.as_str()) {
                    tracing::warn!("Can't fetch events: {}", message);
                    last_error = Some(message);
                }
            }
            Err(e) => {
                tracing::error!("Event poller stopping: {}", e);
                let _ = channel.send(PollerMessage::Kill(e.to_string())).await;
                return Err(e);
            }
        }
    }
}
