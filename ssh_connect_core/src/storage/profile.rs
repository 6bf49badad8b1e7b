use std::fmt::{self, Display};
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{Field, ValidationError};

pub const DEFAULT_PORT: u16 = 22;

const IPV4_PATTERN: &str = r"^(?:(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)$";

fn ipv4_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(IPV4_PATTERN).expect("IPv4 pattern is a valid regex"))
}

/// Returns `true` for dotted-quad IPv4 addresses (each octet 0-255).
/// Leading zeros are tolerated, so `010.0.0.1` passes.
pub fn is_valid_ipv4(candidate: &str) -> bool {
    ipv4_regex().is_match(candidate)
}

/// A saved connection preset.
///
/// Serialized with camelCase keys, e.g.
/// `{ "id":"…", "name":"root@10.0.0.1", "ipAddress":"10.0.0.1", "username":"root",
///    "port":22, "createdAt":"2024-05-01T09:30:00Z" }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionProfile {
    pub id: String,
    pub name: String,
    pub ip_address: String,
    pub username: String,
    // Older saves did not carry a port.
    #[serde(default = "default_port")]
    pub port: u16,
    pub created_at: DateTime<Utc>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl ConnectionProfile {
    /// Validates `draft` and stamps a fresh id and creation time.
    pub fn from_draft(draft: ProfileDraft) -> Result<Self, ValidationError> {
        let valid = draft.validate()?;
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            name: valid.name,
            ip_address: valid.ip_address,
            username: valid.username,
            port: valid.port,
            created_at: Utc::now(),
        })
    }

    /// Re-checks a profile that did not come through [`Self::from_draft`],
    /// e.g. one read back from storage.
    pub fn check(&self) -> Result<(), ValidationError> {
        if self.username.trim().is_empty() {
            return Err(ValidationError::MissingField(Field::Username));
        }
        if !is_valid_ipv4(&self.ip_address) {
            return Err(ValidationError::MalformedAddress(self.ip_address.clone()));
        }
        if self.port == 0 {
            return Err(ValidationError::InvalidPort(self.port.to_string()));
        }
        Ok(())
    }

    /// `user@host:port`
    pub fn target(&self) -> String {
        format!("{}@{}:{}", self.username, self.ip_address, self.port)
    }
}

impl Display for ConnectionProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.target())
    }
}

/// Unvalidated user input for a new profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileDraft {
    pub name: Option<String>,
    pub ip_address: String,
    pub username: String,
    pub port: Option<u16>,
}

struct ValidDraft {
    name: String,
    ip_address: String,
    username: String,
    port: u16,
}

impl ProfileDraft {
    pub fn new(ip_address: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            ip_address: ip_address.into(),
            username: username.into(),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Builds a draft from raw form text. A blank port means "use the default".
    pub fn from_form(
        name: &str,
        ip_address: &str,
        username: &str,
        port: &str,
    ) -> Result<Self, ValidationError> {
        let port = port.trim();
        let port = if port.is_empty() {
            None
        } else {
            Some(
                port.parse::<u16>()
                    .map_err(|_| ValidationError::InvalidPort(port.to_string()))?,
            )
        };
        Ok(Self {
            name: Some(name.to_string()),
            ip_address: ip_address.to_string(),
            username: username.to_string(),
            port,
        })
    }

    fn validate(self) -> Result<ValidDraft, ValidationError> {
        let ip_address = self.ip_address.trim();
        let username = self.username.trim();

        if ip_address.is_empty() {
            return Err(ValidationError::MissingField(Field::IpAddress));
        }
        if username.is_empty() {
            return Err(ValidationError::MissingField(Field::Username));
        }
        if !is_valid_ipv4(ip_address) {
            return Err(ValidationError::MalformedAddress(ip_address.to_string()));
        }

        let port = match self.port {
            None => DEFAULT_PORT,
            Some(0) => return Err(ValidationError::InvalidPort("0".into())),
            Some(p) => p,
        };

        let name = match self.name.as_deref().map(str::trim) {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => format!("{username}@{ip_address}"),
        };

        Ok(ValidDraft {
            name,
            ip_address: ip_address.to_string(),
            username: username.to_string(),
            port,
        })
    }
}
