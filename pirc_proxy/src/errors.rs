use crate::dispatch::ArgumentError;
use crate::irc::IrcError;
use pirc_network::prelude::*;

use thiserror::Error;

/// An error raised while handling an RPC request.
///
/// Every variant except `Internal` is a domain error that the caller can act
/// on, and is reported with its message. `Internal` errors are logged in
/// full and reported to the caller without detail.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Duplicate(String),
    #[error("{0}")]
    InvalidName(String),
    #[error("{0}")]
    InvalidArgument(String),
    #[error("{0}")]
    Connection(String),
    #[error("No such method: {0}")]
    MethodNotFound(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ProxyError {
    pub fn code(&self) -> i32 {
        match self {
            Self::NotFound(_) => fault_code::NOT_FOUND,
            Self::Duplicate(_) => fault_code::DUPLICATE,
            Self::InvalidName(_) => fault_code::INVALID_NAME,
            Self::InvalidArgument(_) => fault_code::INVALID_ARGUMENT,
            Self::Connection(_) => fault_code::CONNECTION,
            Self::MethodNotFound(_) => fault_code::METHOD_NOT_FOUND,
            Self::Internal(_) => fault_code::INTERNAL,
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal(_))
    }

    /// The fault to send back to the caller
    pub fn to_fault(&self) -> RpcFault {
        let message = match self {
            Self::Internal(_) => "internal error".to_string(),
            other => other.to_string(),
        };
        RpcFault::new(self.code(), message)
    }
}

impl From<InvalidChannelNameError> for ProxyError {
    fn from(e: InvalidChannelNameError) -> Self {
        Self::InvalidName(e.to_string())
    }
}

impl From<InvalidNicknameError> for ProxyError {
    fn from(e: InvalidNicknameError) -> Self {
        Self::InvalidName(e.to_string())
    }
}

impl From<InvalidServerNameError> for ProxyError {
    fn from(e: InvalidServerNameError) -> Self {
        Self::InvalidName(e.to_string())
    }
}

impl From<ArgumentError> for ProxyError {
    fn from(e: ArgumentError) -> Self {
        Self::InvalidArgument(e.to_string())
    }
}

impl From<InvalidEventError> for ProxyError {
    fn from(e: InvalidEventError) -> Self {
        Self::InvalidArgument(e.to_string())
    }
}

impl From<IrcError> for ProxyError {
    fn from(e: IrcError) -> Self {
        Self::Connection(e.to_string())
    }
}

impl From<serde_json::Error> for ProxyError {
    fn from(e: serde_json::Error) -> Self {
        Self::Internal(e.to_string())
    }
}
