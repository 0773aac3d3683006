//! Client library for the pirc proxy.
//!
//! A client session runs two loops: an [`EventPoller`](poller::EventPoller)
//! on a background task, turning periodic `get_events_since` calls into an
//! ordered stream of event batches, and a foreground loop that shows those
//! batches and turns user input into proxy calls.

pub mod client;
pub mod command;
pub mod config;
pub mod interface;
pub mod poller;
