use std::fmt::{self, Display};

use thiserror::Error;

/// Profile fields a user has to fill in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    IpAddress,
    Username,
}

impl Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::IpAddress => write!(f, "IP address"),
            Field::Username => write!(f, "username"),
        }
    }
}

/// Rejection of a profile draft. The draft itself is left untouched so the
/// caller can correct it and resubmit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(Field),
    #[error("'{0}' is not a valid IPv4 address")]
    MalformedAddress(String),
    #[error("'{0}' is not a valid port (expected 1-65535)")]
    InvalidPort(String),
}

/// Failure of a persistence backend.
///
/// Read failures never reach callers of the profile store: a slot that cannot
/// be read or parsed is treated as empty. Write failures are logged.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Serde(#[from] serde_json::Error),
}
