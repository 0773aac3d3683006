//! A minimal IRC client: just enough protocol to register, join and part
//! channels, send messages, and report what the server sends back.

use thiserror::Error;
use tokio::io;

mod message;
pub use message::*;

mod numeric;
pub use numeric::*;

mod event;
pub use event::*;

mod connection;
pub use connection::*;

#[derive(Debug, Error)]
pub enum IrcError {
    #[error("Couldn't resolve {0}: {1}")]
    Resolve(String, io::Error),
    #[error("No addresses found for {0}")]
    NoAddress(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid TLS server name: {0}")]
    InvalidServerName(String),
    #[error("Connection closed")]
    Closed,
}
