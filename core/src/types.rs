//! Domain types shared by the client and its callers.
//!
//! # Design
//! `Format` is the response representation negotiated per call. `Credentials`
//! is the Basic-auth pair owned by the client. The DTOs mirror the service's
//! JSON payloads for the fields the dashboard renders; they are defined
//! independently from the mock-server's copies and the integration tests
//! catch any drift between the two.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Wire representation requested for a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Json,
    Xml,
    Rss,
    Atom,
    /// No extension at all; the caller reads the bare status/body.
    None,
}

impl Format {
    pub const fn as_str(self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Xml => "xml",
            Format::Rss => "rss",
            Format::Atom => "atom",
            Format::None => "none",
        }
    }

    /// The path suffix for this format, without the leading dot.
    pub const fn extension(self) -> Option<&'static str> {
        match self {
            Format::None => None,
            other => Some(other.as_str()),
        }
    }

    /// Case-insensitive lookup by name.
    pub fn from_name(name: &str) -> Option<Format> {
        match name.to_ascii_lowercase().as_str() {
            "json" => Some(Format::Json),
            "xml" => Some(Format::Xml),
            "rss" => Some(Format::Rss),
            "atom" => Some(Format::Atom),
            "none" => Some(Format::None),
            _ => None,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Username/password pair sent as HTTP Basic credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Value for the `Authorization` header.
    pub fn basic_authorization(&self) -> String {
        let token = STANDARD.encode(format!("{}:{}", self.username, self.password));
        format!("Basic {token}")
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A status update as returned by timeline and status operations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Status {
    pub id: u64,
    pub text: String,
    pub created_at: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub truncated: bool,
    #[serde(default)]
    pub in_reply_to_status_id: Option<u64>,
    #[serde(default)]
    pub favorited: bool,
    #[serde(default)]
    pub user: Option<User>,
}

/// A user profile, embedded in statuses or returned on its own.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub screen_name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub profile_image_url: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub protected: bool,
    #[serde(default)]
    pub followers_count: Option<u64>,
}

/// A direct message between two users.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DirectMessage {
    pub id: u64,
    pub text: String,
    pub created_at: String,
    pub sender_screen_name: String,
    pub recipient_screen_name: String,
}
