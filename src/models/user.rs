//! User model

use serde::{Deserialize, Serialize};

/// The authenticated user as returned by `/auth/me/`
///
/// Every field is optional: older deployments answer the probe with just
/// `email` and a greeting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Server id
    #[serde(default)]
    pub id: Option<u64>,
    /// Given name
    #[serde(default)]
    pub first_name: Option<String>,
    /// Family name
    #[serde(default)]
    pub last_name: Option<String>,
    /// Mobile number (`09xxxxxxxxx`)
    #[serde(default)]
    pub phone: Option<String>,
    /// Login email
    #[serde(default)]
    pub email: Option<String>,
    /// Whether the email address has been verified
    #[serde(default)]
    pub is_verified: Option<bool>,
}

impl User {
    /// Best display name available
    pub fn display_name(&self) -> String {
        let full = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        if full.is_empty() {
            self.email.clone().unwrap_or_else(|| "unknown user".to_string())
        } else {
            full
        }
    }

    /// True only when the server explicitly says the email is unverified
    pub fn needs_verification(&self) -> bool {
        self.is_verified == Some(false)
    }
}

/// Editable profile fields sent to `/auth/update-profile/`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Mobile number
    pub phone: String,
    /// Login email
    pub email: String,
}

impl From<&User> for ProfileUpdate {
    fn from(user: &User) -> Self {
        Self {
            first_name: user.first_name.clone().unwrap_or_default(),
            last_name: user.last_name.clone().unwrap_or_default(),
            phone: user.phone.clone().unwrap_or_default(),
            email: user.email.clone().unwrap_or_default(),
        }
    }
}

/// Bare `{ "msg": ... }` acknowledgement used by most auth endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerMessage {
    /// Auth endpoints
    #[serde(default)]
    pub msg: Option<String>,
    /// Envelope-style endpoints
    #[serde(default)]
    pub message: Option<String>,
    /// DRF generic views
    #[serde(default)]
    pub detail: Option<String>,
}

impl ServerMessage {
    /// First non-empty message field
    pub fn text(&self) -> Option<&str> {
        [&self.msg, &self.message, &self.detail]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|m| !m.is_empty())
    }

    /// The message, or `fallback` when the server sent none
    pub fn or(&self, fallback: &str) -> String {
        self.text().unwrap_or(fallback).to_string()
    }
}
