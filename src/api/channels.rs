//! Channel endpoints

use super::{ApiClient, ApiRequest};
use crate::error::ApiError;
use crate::models::{Channel, ChannelDraft, ChannelId, ListOrPage};

impl ApiClient {
    /// All channels owned by the user; the backend may or may not paginate
    pub async fn channels(&self) -> Result<Vec<Channel>, ApiError> {
        let list: ListOrPage<Channel> = self.get("/channels/").await?;
        Ok(list.into_items())
    }

    pub async fn channel(&self, id: ChannelId) -> Result<Channel, ApiError> {
        self.get(&format!("/channels/{id}/")).await
    }

    pub async fn create_channel(&self, draft: &ChannelDraft) -> Result<Channel, ApiError> {
        self.fetch(ApiRequest::post("/channels/create/").json(draft)?)
            .await
    }

    pub async fn update_channel(
        &self,
        id: ChannelId,
        draft: &ChannelDraft,
    ) -> Result<Channel, ApiError> {
        self.fetch(ApiRequest::put(format!("/channels/{id}/")).json(draft)?)
            .await
    }

    pub async fn delete_channel(&self, id: ChannelId) -> Result<(), ApiError> {
        self.execute(ApiRequest::delete(format!("/channels/{id}/")))
            .await
    }
}
