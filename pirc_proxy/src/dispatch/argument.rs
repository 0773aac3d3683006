use serde_json::{Map, Value};
use thiserror::Error;

/// A problem with the positional parameters of a call
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ArgumentError {
    #[error("Not enough arguments (needed at least {0})")]
    TooFew(usize),
    #[error("Too many arguments (expected at most {0})")]
    TooMany(usize),
    #[error("Argument {index} should be {expected}")]
    WrongType { index: usize, expected: &'static str },
}

/// A type that can be taken from an RPC parameter list
pub trait RpcArgument: Sized {
    /// Describes the expected type, for error messages
    const EXPECTED: &'static str;

    fn from_value(value: &Value) -> Option<Self>;
}

impl RpcArgument for String {
    const EXPECTED: &'static str = "a string";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(ToString::to_string)
    }
}

impl RpcArgument for bool {
    const EXPECTED: &'static str = "a boolean";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl RpcArgument for u16 {
    const EXPECTED: &'static str = "an integer between 0 and 65535";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_u64().and_then(|v| u16::try_from(v).ok())
    }
}

impl RpcArgument for usize {
    const EXPECTED: &'static str = "a non-negative integer";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_u64().and_then(|v| usize::try_from(v).ok())
    }
}

impl RpcArgument for f64 {
    const EXPECTED: &'static str = "a number";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_f64()
    }
}

impl RpcArgument for Map<String, Value> {
    const EXPECTED: &'static str = "an object";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_object().cloned()
    }
}

/// The positional parameters of one call, consumed from the front.
///
/// Argument indices in errors count from the start of the whole list, so
/// they stay meaningful after a dispatch hop has taken the leading names.
#[derive(Debug, Clone)]
pub struct ArgList<'a> {
    args: &'a [Value],
    index: usize,
}

impl<'a> ArgList<'a> {
    pub fn new(args: &'a [Value]) -> Self {
        Self { args, index: 0 }
    }

    /// Take the next argument, which must be present
    pub fn next<T: RpcArgument>(&mut self) -> Result<T, ArgumentError> {
        let index = self.index;
        let value = self.args.get(index).ok_or(ArgumentError::TooFew(index + 1))?;
        self.index += 1;

        T::from_value(value).ok_or(ArgumentError::WrongType {
            index,
            expected: T::EXPECTED,
        })
    }

    /// Take the next argument if there is one, or use `default`
    pub fn next_or<T: RpcArgument>(&mut self, default: T) -> Result<T, ArgumentError> {
        if self.is_empty() {
            Ok(default)
        } else {
            self.next()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.index >= self.args.len()
    }

    /// Check that every argument has been used
    pub fn finish(self) -> Result<(), ArgumentError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ArgumentError::TooMany(self.index))
        }
    }
}
