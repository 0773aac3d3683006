pub use crate::config::*;
pub use crate::event::*;
pub use crate::rpc::*;
pub use crate::utils::OrLog;
pub use crate::validated::*;
