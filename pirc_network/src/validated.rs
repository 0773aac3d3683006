//! Defines validated string types for various names and identifiers

use arrayvec::ArrayString;
use pirc_macros::define_validated;
use std::{
    convert::{Into, TryFrom},
    str::FromStr,
};
use thiserror::Error;

/// Base trait for validated string types.
pub trait Validated: TryFrom<Self::Underlying> + Into<Self::Underlying> + FromStr + Sized {
    type Underlying;
    type Error;
    type Result;

    /// Check whether the provided value is valid according to this type's
    /// rules.
    fn validate(value: &Self::Underlying) -> Result<(), <Self as Validated>::Error>;

    /// Attempt to create a new instance using the given value. Returns `Ok(_)`
    /// if the value passes validation, and `Err(_)` if not.
    fn new(value: Self::Underlying) -> <Self as Validated>::Result;

    /// Access the raw stored value
    fn value(&self) -> &Self::Underlying;

    /// Attempt to convert from anything that can be converted to a string.
    fn convert(arg: impl std::string::ToString) -> Self::Result;
}

struct StringValidationError(String);
type StringValidationResult = Result<(), StringValidationError>;

fn check_allowed_chars(value: &str, allowed_chars: &[&str]) -> StringValidationResult {
    for c in value.chars() {
        if !allowed_chars.iter().any(|s| s.contains(c)) {
            return Err(StringValidationError(value.to_string()));
        }
    }
    Ok(())
}

const LOWER: &str = "abcdefghijklmnopqrstuvwxyz";
const UPPER: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGIT: &str = "0123456789";

/// Characters that may begin a channel name
pub const CHANNEL_PREFIXES: &str = "&#+!";

/// BEL, which some servers treat as a channel name separator
const CONTROL_G: char = '\x07';

define_validated! {
    Nickname(ArrayString<32> casefolded) {
        check_allowed_chars(value, &[LOWER, UPPER, DIGIT, "-_\\|[]{}^`"])?;
        if let Some(first) = value.chars().next() {
            if DIGIT.contains(first) || first == '-' {
                return Self::error(value);
            }
        } else {
            return Self::error(value);
        }
        Ok(())
    }

    ChannelName(ArrayString<200> lowercased) {
        let len = value.chars().count();
        if len <= 2 || len > 50 {
            return Self::error(value);
        }
        if !value.starts_with(|c: char| CHANNEL_PREFIXES.contains(c)) {
            return Self::error(value);
        }
        if value.contains(|c: char| c == ' ' || c == ',' || c == ':' || c == CONTROL_G) {
            return Self::error(value);
        }
        Ok(())
    }

    ServerName(ArrayString<64>) {
        if value.is_empty() || value.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Self::error(value);
        }
        Ok(())
    }
}
