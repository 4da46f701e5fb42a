//! AI chat models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `{ success, data, message }` wrapper used by the chat endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    /// Whether the operation succeeded
    #[serde(default)]
    pub success: Option<bool>,
    /// Payload
    pub data: T,
    /// Human-readable status
    #[serde(default)]
    pub message: Option<String>,
}

/// A named AI conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSession {
    /// Server id
    pub id: Uuid,
    /// Title shown in the session list
    pub title: String,
    /// Creation time
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Last activity
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Who wrote a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// The human
    User,
    /// The AI model
    Assistant,
    /// Client-generated notice (never stored by the server)
    System,
}

impl MessageRole {
    /// Short label for transcripts
    pub const fn label(&self) -> &'static str {
        match self {
            Self::User => "you",
            Self::Assistant => "ai",
            Self::System => "system",
        }
    }
}

/// One bubble in a chat thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Server id (absent for optimistic or synthetic bubbles)
    #[serde(default)]
    pub id: Option<Uuid>,
    /// Author role
    pub role: MessageRole,
    /// Message text (markdown)
    pub content: String,
    /// Creation time
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl ChatMessage {
    /// Local bubble stamped with the current time
    pub fn local(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: None,
            role,
            content: content.into(),
            created_at: Some(Utc::now()),
        }
    }
}

/// Payload of a successful `/chat/chat/` call
#[derive(Debug, Clone, Deserialize)]
pub struct ChatReply {
    /// Session the exchange was stored in
    #[serde(default)]
    pub session_id: Option<String>,
    /// The stored user message
    #[serde(default)]
    pub user_message: Option<ChatMessage>,
    /// The assistant's answer
    pub ai_message: ChatMessage,
}

/// Reusable prompt template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedPrompt {
    /// Server id
    pub id: Uuid,
    /// Short title
    pub title: String,
    /// Prompt body
    pub content: String,
    /// Creation time
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Last edit
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_chat_reply_envelope() {
        let json = r#"{
            "success": true,
            "data": {
                "session_id": "7f0c5a8e-4a43-4d8e-9a53-0c8f8b1e2d10",
                "user_message": {"id": "0e4bd0a6-2f0e-4a5b-8c3d-1d2e3f4a5b6c", "role": "user", "content": "hi", "created_at": "2030-01-01T00:00:00Z"},
                "ai_message": {"id": "1e4bd0a6-2f0e-4a5b-8c3d-1d2e3f4a5b6c", "role": "assistant", "content": "hello", "created_at": "2030-01-01T00:00:01Z"}
            },
            "message": "ok"
        }"#;

        let reply: Envelope<ChatReply> = serde_json::from_str(json).unwrap();
        assert_eq!(reply.data.ai_message.role, MessageRole::Assistant);
        assert_eq!(reply.data.ai_message.content, "hello");
        assert_eq!(reply.message.as_deref(), Some("ok"));
    }
}
