//! The objects the proxy manages on behalf of its clients

mod channel;
pub use channel::*;

mod server;
pub use server::*;
