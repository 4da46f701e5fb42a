//! AI chat endpoints
//!
//! Chat responses come wrapped in `{ success, data, message }`. The prompt
//! endpoints are decoded with or without that wrapper.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::{ApiClient, ApiRequest};
use crate::error::ApiError;
use crate::models::{ChatMessage, ChatReply, ChatSession, Envelope, SavedPrompt};

/// Body of a prompt create or update
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PromptDraft {
    pub title: String,
    pub content: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Wrapped<T> {
    Enveloped(Envelope<T>),
    Bare(T),
}

impl<T> Wrapped<T> {
    fn into_inner(self) -> T {
        match self {
            Self::Enveloped(envelope) => envelope.data,
            Self::Bare(value) => value,
        }
    }
}

impl ApiClient {
    async fn fetch_data<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let envelope: Envelope<T> = self.fetch(request).await?;
        Ok(envelope.data)
    }

    /// Sessions, newest first
    pub async fn chat_sessions(&self) -> Result<Vec<ChatSession>, ApiError> {
        self.fetch_data(ApiRequest::get("/chat/sessions/")).await
    }

    pub async fn create_chat_session(&self, title: &str) -> Result<ChatSession, ApiError> {
        let request = ApiRequest::post("/chat/sessions/").json(&json!({ "title": title }))?;
        self.fetch_data(request).await
    }

    pub async fn delete_chat_session(&self, id: Uuid) -> Result<(), ApiError> {
        self.execute(ApiRequest::delete(format!("/chat/sessions/{id}/")))
            .await
    }

    /// Thread of one session, oldest first
    pub async fn chat_messages(&self, session: Uuid) -> Result<Vec<ChatMessage>, ApiError> {
        self.fetch_data(ApiRequest::get(format!("/chat/sessions/{session}/messages/")))
            .await
    }

    /// Send a message and wait for the model's answer
    pub async fn send_chat_message(
        &self,
        session: Option<Uuid>,
        message: &str,
    ) -> Result<ChatReply, ApiError> {
        let request = ApiRequest::post("/chat/chat/")
            .json(&json!({
                "message": message,
                "session_id": session.map(|id| id.to_string()),
            }))?
            .timeout(self.chat_timeout());
        self.fetch_data(request).await
    }

    pub async fn prompts(&self) -> Result<Vec<SavedPrompt>, ApiError> {
        let wrapped: Wrapped<Vec<SavedPrompt>> = self.get("/chat/prompts/").await?;
        Ok(wrapped.into_inner())
    }

    pub async fn create_prompt(&self, draft: &PromptDraft) -> Result<SavedPrompt, ApiError> {
        let request = ApiRequest::post("/chat/prompts/").json(draft)?;
        let wrapped: Wrapped<SavedPrompt> = self.fetch(request).await?;
        Ok(wrapped.into_inner())
    }

    pub async fn update_prompt(&self, id: Uuid, draft: &PromptDraft) -> Result<SavedPrompt, ApiError> {
        let request = ApiRequest::put(format!("/chat/prompts/{id}/")).json(draft)?;
        let wrapped: Wrapped<SavedPrompt> = self.fetch(request).await?;
        Ok(wrapped.into_inner())
    }

    pub async fn delete_prompt(&self, id: Uuid) -> Result<(), ApiError> {
        self.execute(ApiRequest::delete(format!("/chat/prompts/{id}/")))
            .await
    }
}
