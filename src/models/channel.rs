//! Channel model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server id of a channel
pub type ChannelId = u64;

/// Messaging platform a channel lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Telegram
    #[default]
    Telegram,
    /// Bale
    Bale,
}

impl Platform {
    /// Get all supported platforms
    pub const fn all() -> &'static [Self] {
        &[Self::Telegram, Self::Bale]
    }

    /// Get the display name
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Telegram => "Telegram",
            Self::Bale => "Bale",
        }
    }

    /// Wire value
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Telegram => "telegram",
            Self::Bale => "bale",
        }
    }

    /// Get the emoji icon
    pub const fn emoji(&self) -> &'static str {
        match self {
            Self::Telegram => "✈️",
            Self::Bale => "🟢",
        }
    }

    /// The other platform (for toggling in forms)
    pub const fn toggle(&self) -> Self {
        match self {
            Self::Telegram => Self::Bale,
            Self::Bale => Self::Telegram,
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A publishing destination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// Server id
    pub id: ChannelId,
    /// Human readable name
    pub name: String,
    /// Platform handle, e.g. `@my_channel`
    pub username: String,
    /// Platform
    pub platform: Platform,
    /// Whether the bot confirmed admin access
    #[serde(default)]
    pub is_verified: bool,
    /// Why verification failed, if it did
    #[serde(default)]
    pub failed_reason: Option<String>,
    /// Creation time
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Channel {
    /// One-line label for lists
    pub fn label(&self) -> String {
        format!("{} {} ({})", self.platform.emoji(), self.name, self.username)
    }
}

/// Fields sent when creating or updating a channel
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelDraft {
    /// Human readable name
    pub name: String,
    /// Platform handle
    pub username: String,
    /// Platform
    pub platform: Platform,
}

impl From<&Channel> for ChannelDraft {
    fn from(channel: &Channel) -> Self {
        Self {
            name: channel.name.clone(),
            username: channel.username.clone(),
            platform: channel.platform,
        }
    }
}
