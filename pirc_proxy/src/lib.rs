//! The pirc proxy: keeps IRC connections open on behalf of clients that come
//! and go, records what happens on them, and serves it all over RPC.

pub mod config;
pub mod coordinator;
pub mod dispatch;
pub mod entities;
pub mod errors;
pub mod irc;
pub mod normalizer;
