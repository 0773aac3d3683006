//! The canonical event model and the in-memory event buffer.

pub mod clock;

mod details;
pub use details::*;

mod store;
pub use store::*;
