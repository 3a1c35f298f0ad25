//! Error types

use std::fmt;

/// Errors that originate from invalid lookup data or runaway lookup nesting
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum ParseError {
    BadValue,
    BadIndex,
    LimitExceeded,
}

impl From<std::num::TryFromIntError> for ParseError {
    fn from(_error: std::num::TryFromIntError) -> Self {
        ParseError::BadValue
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::BadValue => write!(f, "invalid value"),
            ParseError::BadIndex => write!(f, "invalid data index"),
            ParseError::LimitExceeded => write!(f, "limit exceeded"),
        }
    }
}

impl std::error::Error for ParseError {}
