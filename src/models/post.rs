//! Post model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ChannelId;

/// Server id of a post
pub type PostId = u64;

/// Delivery status of a post, driven entirely by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum PostStatus {
    /// Waiting in the delivery queue (possibly scheduled)
    #[default]
    Pending,
    /// Currently being delivered
    Sending,
    /// Delivered to every channel
    Sent,
    /// Delivery failed
    Failed,
    /// Cancelled by the user before delivery
    Cancelled,
    /// A status this client does not know about
    #[serde(other)]
    Unknown,
}

impl PostStatus {
    /// Get status as string
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sending => "sending",
            Self::Sent => "sent",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Unknown => "unknown",
        }
    }

    /// Get emoji for status
    pub const fn emoji(&self) -> &'static str {
        match self {
            Self::Pending => "⏳",
            Self::Sending => "📤",
            Self::Sent => "✅",
            Self::Failed => "❌",
            Self::Cancelled => "🚫",
            Self::Unknown => "❔",
        }
    }
}

/// Whether a post carries media
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostType {
    /// Text only
    #[default]
    Text,
    /// Has media attachments
    Media,
}

impl PostType {
    /// Wire value
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Media => "media",
        }
    }
}

/// File attached to a sent post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Attachment id
    pub id: u64,
    /// Storage URL
    #[serde(default)]
    pub file: Option<String>,
    /// Authenticated download URL
    #[serde(default)]
    pub secure_url: Option<String>,
}

impl Attachment {
    /// Best URL to open this attachment with
    pub fn url(&self) -> Option<&str> {
        self.secure_url.as_deref().or(self.file.as_deref())
    }
}

/// A post targeted at one or more channels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Server id
    pub id: PostId,
    /// Text content
    #[serde(default)]
    pub content: Option<String>,
    /// Target channel ids
    #[serde(default)]
    pub channels: Vec<ChannelId>,
    /// Text or media
    #[serde(default)]
    pub types: PostType,
    /// Delivery status
    #[serde(default)]
    pub status: PostStatus,
    /// When the post should go out
    #[serde(default)]
    pub scheduled_time: Option<DateTime<Utc>>,
    /// Why delivery failed
    #[serde(default)]
    pub error_message: Option<String>,
    /// When the post was created
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// When delivery finished
    #[serde(default)]
    pub sent_at: Option<DateTime<Utc>>,
    /// Uploaded media
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl Post {
    /// Content or an empty string
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }

    /// Whether the post waits for a scheduled time
    pub const fn is_scheduled(&self) -> bool {
        self.scheduled_time.is_some()
    }

    /// Human-readable time until posting
    pub fn time_until(&self) -> Option<String> {
        let scheduled = self.scheduled_time?;
        let now = Utc::now();
        if scheduled <= now {
            return Some("now".to_string());
        }

        let seconds = (scheduled - now).num_seconds();

        Some(if seconds < 60 {
            format!("{}s", seconds)
        } else if seconds < 3600 {
            format!("{}m", seconds / 60)
        } else if seconds < 86400 {
            let hours = seconds / 3600;
            let mins = (seconds % 3600) / 60;
            if mins > 0 {
                format!("{}h {}m", hours, mins)
            } else {
                format!("{}h", hours)
            }
        } else {
            let days = seconds / 86400;
            let hours = (seconds % 86400) / 3600;
            if hours > 0 {
                format!("{}d {}h", days, hours)
            } else {
                format!("{}d", days)
            }
        })
    }

    /// Format scheduled time for display
    pub fn scheduled_time_display(&self) -> Option<String> {
        self.scheduled_time
            .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_backend_post() {
        let json = r#"{
            "id": 42,
            "content": "hello",
            "channels": [1, 3],
            "types": "media",
            "status": "failed",
            "scheduled_time": "2030-01-15T14:30:00+03:30",
            "error_message": "bot is not admin",
            "created_at": "2030-01-14T10:00:00.123456Z",
            "sent_at": null,
            "attachments": [{"id": 7, "file": "/media/user_a/Photo.JPG", "secure_url": null}],
            "user": 9,
            "media_files": null
        }"#;

        let post: Post = serde_json::from_str(json).unwrap();
        assert_eq!(post.id, 42);
        assert_eq!(post.channels, vec![1, 3]);
        assert_eq!(post.types, PostType::Media);
        assert_eq!(post.status, PostStatus::Failed);
        assert_eq!(
            post.scheduled_time_display().as_deref(),
            Some("2030-01-15 11:00 UTC")
        );
        assert_eq!(post.attachments[0].url(), Some("/media/user_a/Photo.JPG"));
    }

    #[test]
    fn test_unknown_status_is_tolerated() {
        let post: Post = serde_json::from_str(r#"{"id": 1, "status": "archived"}"#).unwrap();
        assert_eq!(post.status, PostStatus::Unknown);
        assert_eq!(post.text(), "");
        assert!(!post.is_scheduled());
    }
}
