//! Message types carried between clients and the proxy.
//!
//! A client sends an [`RpcRequest`] naming a method and its positional
//! parameters, and the proxy answers with exactly one [`RpcResponse`]
//! carrying the same `id`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub id: u64,
    pub method: String,
    #[serde(default)]
    pub params: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub id: u64,
    #[serde(flatten)]
    pub outcome: RpcOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RpcOutcome {
    Result(Value),
    Fault(RpcFault),
}

/// A structured error returned in place of a result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("fault {code}: {message}")]
pub struct RpcFault {
    pub code: i32,
    pub message: String,
}

/// Stable fault codes
pub mod fault_code {
    pub const NOT_FOUND: i32 = 1;
    pub const DUPLICATE: i32 = 2;
    pub const INVALID_NAME: i32 = 3;
    pub const INVALID_ARGUMENT: i32 = 4;
    pub const CONNECTION: i32 = 5;
    pub const METHOD_NOT_FOUND: i32 = 6;
    pub const INTERNAL: i32 = 99;
}

impl RpcRequest {
    pub fn new(id: u64, method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            id,
            method: method.into(),
            params,
        }
    }
}

impl RpcResponse {
    pub fn result(id: u64, value: Value) -> Self {
        Self {
            id,
            outcome: RpcOutcome::Result(value),
        }
    }

    pub fn fault(id: u64, fault: RpcFault) -> Self {
        Self {
            id,
            outcome: RpcOutcome::Fault(fault),
        }
    }

    pub fn into_result(self) -> Result<Value, RpcFault> {
        match self.outcome {
            RpcOutcome::Result(value) => Ok(value),
            RpcOutcome::Fault(fault) => Err(fault),
        }
    }
}

impl RpcFault {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}
