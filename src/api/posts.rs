//! Post endpoints

use super::{ApiClient, ApiRequest, FormPart, ProgressFn, with_query};
use crate::error::ApiError;
use crate::models::{Page, Post, PostId, PostStatus, ServerMessage};

/// Query for one page of posts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostQuery {
    pub page: u64,
    pub page_size: u64,
    pub status: Option<PostStatus>,
}

impl Default for PostQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 10,
            status: None,
        }
    }
}

impl PostQuery {
    fn path(&self) -> String {
        with_query(
            "/posts/",
            &[
                ("page", Some(self.page.to_string())),
                ("page_size", Some(self.page_size.to_string())),
                ("status", self.status.map(|s| s.as_str().to_string())),
            ],
        )
    }
}

impl ApiClient {
    pub async fn posts(&self, query: &PostQuery) -> Result<Page<Post>, ApiError> {
        self.get(&query.path()).await
    }

    /// Create a post from composer form parts
    ///
    /// Returns the created post when the backend echoes it back.
    pub async fn create_post(
        &self,
        parts: Vec<FormPart>,
        progress: Option<ProgressFn>,
    ) -> Result<Option<Post>, ApiError> {
        let mut request = ApiRequest::post("/posts/create/").multipart(parts);
        if let Some(progress) = progress {
            request = request.on_progress(progress);
        }
        self.fetch_or_default(request).await
    }

    pub async fn delete_post(&self, id: PostId) -> Result<(), ApiError> {
        self.execute(ApiRequest::delete(format!("/posts/{id}/")))
            .await
    }

    /// Queue a failed post for another delivery attempt
    pub async fn retry_post(&self, id: PostId) -> Result<ServerMessage, ApiError> {
        self.fetch_or_default(ApiRequest::post(format!("/posts/{id}/retry/")))
            .await
    }

    /// Cancel a scheduled post before it goes out
    pub async fn cancel_post(&self, id: PostId) -> Result<ServerMessage, ApiError> {
        self.fetch_or_default(ApiRequest::post(format!("/posts/{id}/cancel/")))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Method;
    use crate::api::mock::{client, json_response, ok};
    use serde_json::json;

    #[test]
    fn test_query_path() {
        let query = PostQuery {
            page: 3,
            page_size: 10,
            status: Some(PostStatus::Failed),
        };
        assert_eq!(query.path(), "/posts/?page=3&page_size=10&status=failed");
        assert_eq!(PostQuery::default().path(), "/posts/?page=1&page_size=10");
    }

    #[tokio::test]
    async fn test_posts_decode_page() {
        let (api, mock, _) = client();
        mock.on(
            Method::Get,
            "/posts/?page=1&page_size=10&status=sent",
            ok(json!({"count": 11, "next": "x", "previous": null, "results": [{"id": 1, "status": "sent"}]})),
        );
        let page = api
            .posts(&PostQuery {
                status: Some(PostStatus::Sent),
                ..PostQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(page.count, 11);
        assert_eq!(page.results[0].status, PostStatus::Sent);
    }

    #[tokio::test]
    async fn test_cancel_surfaces_backend_refusal() {
        let (api, mock, _) = client();
        mock.on(
            Method::Post,
            "/posts/5/cancel/",
            json_response(400, json!({"detail": "already sent"})),
        );
        let err = api.cancel_post(5).await.unwrap_err();
        assert_eq!(err.server_message().as_deref(), Some("already sent"));
    }

    #[tokio::test]
    async fn test_create_post_tolerates_message_reply() {
        let (api, mock, _) = client();
        mock.on(Method::Post, "/posts/create/", json_response(201, json!({"msg": "queued"})));
        let created = api
            .create_post(vec![FormPart::text("content", "hi")], None)
            .await
            .unwrap();
        assert!(created.is_none());
    }
}
