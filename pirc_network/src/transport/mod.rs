//! Mutually-authenticated RPC transport between clients and the proxy.
//!
//! Both ends present a certificate, and each accepts only peers whose exact
//! certificate appears in its configured trust store. Requests and
//! responses are JSON documents, each sent as a big-endian `u32` length
//! followed by that many bytes.

use thiserror::Error;
use tokio::io;

mod verifier;
pub use verifier::*;

mod tls;
pub use tls::*;

mod frame;
pub use frame::*;

mod listener;
pub use listener::*;

mod client;
pub use client::*;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid certificate in trust store: {0}")]
    InvalidCertificate(String),
    #[error("Invalid TLS server name: {0}")]
    InvalidServerName(String),
    #[error("Frame of {0} bytes exceeds the size limit")]
    FrameTooLarge(usize),
    #[error("Protocol error: {0}")]
    Protocol(String),
    #[error("Connection closed")]
    Closed,
    #[error("Listen task already spawned")]
    AlreadyListening,
    #[error("Internal error: {0}")]
    InternalError(String),
}
