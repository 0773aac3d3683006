//! Shared types and plumbing for the pirc proxy and its clients.
//!
//! This crate defines the canonical event model and the in-memory event
//! store, validated identifier types, the RPC wire format, and the
//! mutually-authenticated TLS transport over which clients talk to the
//! proxy.

pub mod config;
pub mod event;
pub mod rpc;
pub mod tracing_config;
pub mod transport;
pub mod utils;
pub mod validated;

pub mod prelude;
