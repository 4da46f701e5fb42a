//! Post lists by delivery status

use tracing::{debug, info};

use crate::api::ApiClient;
use crate::api::posts::PostQuery;
use crate::cache::ChannelCache;
use crate::error::ApiError;
use crate::models::{Page, Post, PostId, PostStatus, page_count};

/// Backend default page size
pub const PAGE_SIZE: u64 = 10;

/// Which list a status view shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    /// Queued for immediate delivery
    Pending,
    /// Queued with a future `scheduled_time`
    Scheduled,
    Sent,
    Failed,
}

impl StatusKind {
    pub const fn all() -> &'static [Self] {
        &[Self::Pending, Self::Scheduled, Self::Sent, Self::Failed]
    }

    pub const fn title(&self) -> &'static str {
        match self {
            Self::Pending => "Pending posts",
            Self::Scheduled => "Scheduled posts",
            Self::Sent => "Sent posts",
            Self::Failed => "Failed posts",
        }
    }

    /// Server-side filter; pending and scheduled share one
    pub const fn status(&self) -> PostStatus {
        match self {
            Self::Pending | Self::Scheduled => PostStatus::Pending,
            Self::Sent => PostStatus::Sent,
            Self::Failed => PostStatus::Failed,
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "scheduled" => Some(Self::Scheduled),
            "sent" => Some(Self::Sent),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Client-side split of the shared pending list
    pub const fn keeps(&self, post: &Post) -> bool {
        match self {
            Self::Pending => !post.is_scheduled(),
            Self::Scheduled => post.is_scheduled(),
            Self::Sent | Self::Failed => true,
        }
    }

    /// Actions offered on this list
    pub const fn actions(&self) -> &'static [PostAction] {
        match self {
            Self::Failed => &[PostAction::Retry, PostAction::Delete],
            Self::Scheduled => &[PostAction::Cancel],
            Self::Pending | Self::Sent => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostAction {
    Retry,
    Cancel,
    Delete,
}

impl PostAction {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Retry => "retry",
            Self::Cancel => "cancel",
            Self::Delete => "delete",
        }
    }

    /// Destructive actions ask first
    pub const fn needs_confirm(&self) -> bool {
        matches!(self, Self::Cancel | Self::Delete)
    }

    const fn done(&self) -> &'static str {
        match self {
            Self::Retry => "Post queued for another attempt",
            Self::Cancel => "Post cancelled",
            Self::Delete => "Post deleted",
        }
    }

    const fn failed(&self) -> &'static str {
        match self {
            Self::Retry => "Could not retry the post, please try again",
            Self::Cancel => "Could not cancel the post",
            Self::Delete => "Could not delete the post",
        }
    }

    pub async fn run(self, api: &ApiClient, id: PostId) -> Result<(), ApiError> {
        match self {
            Self::Retry => api.retry_post(id).await.map(|_| ()),
            Self::Cancel => api.cancel_post(id).await.map(|_| ()),
            Self::Delete => api.delete_post(id).await,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StatusView {
    pub kind: StatusKind,
    pub posts: Vec<Post>,
    pub page: u64,
    pub page_size: u64,
    pub total_pages: u64,
    /// Posts on this server page that belong to the sibling list
    ///
    /// Pending and scheduled share one query, so `total_pages` counts both.
    pub hidden: usize,
    pub selected: usize,
    pub loading: bool,
    pub error: Option<String>,
    /// Outcome of the last action
    pub notice: Option<String>,
    /// Action waiting for a yes/no
    pub pending: Option<(PostAction, PostId)>,
}

impl StatusView {
    pub const fn new(kind: StatusKind) -> Self {
        Self {
            kind,
            posts: Vec::new(),
            page: 1,
            page_size: PAGE_SIZE,
            total_pages: 1,
            hidden: 0,
            selected: 0,
            loading: false,
            error: None,
            notice: None,
            pending: None,
        }
    }

    pub const fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = if page_size == 0 { PAGE_SIZE } else { page_size };
        self
    }

    pub const fn query(&self) -> PostQuery {
        PostQuery {
            page: self.page,
            page_size: self.page_size,
            status: Some(self.kind.status()),
        }
    }

    pub fn apply_page(&mut self, result: Result<Page<Post>, ApiError>) {
        self.loading = false;
        match result {
            Ok(page) => {
                self.total_pages = page_count(page.count, self.page_size);
                let kind = self.kind;
                let total = page.results.len();
                self.posts = page.results.into_iter().filter(|p| kind.keeps(p)).collect();
                self.hidden = total - self.posts.len();
                self.selected = self.selected.min(self.posts.len().saturating_sub(1));
                self.error = None;
            }
            Err(err) => {
                self.error = Some(err.user_message("Could not load posts"));
            }
        }
    }

    /// Fetch the current page and resolve its channels
    pub async fn load(&mut self, api: &ApiClient, cache: &ChannelCache) {
        self.loading = true;
        let result = api.posts(&self.query()).await;
        self.apply_page(result);
        let ids: Vec<_> = self.posts.iter().flat_map(|p| p.channels.iter().copied()).collect();
        let resolved = cache.resolve(api, &ids).await;
        debug!(kind = ?self.kind, posts = self.posts.len(), channels = resolved.len(), "page loaded");
    }

    /// Move forward a page; false when already on the last one
    pub const fn next_page(&mut self) -> bool {
        if self.page < self.total_pages {
            self.page += 1;
            self.selected = 0;
            true
        } else {
            false
        }
    }

    pub const fn prev_page(&mut self) -> bool {
        if self.page > 1 {
            self.page -= 1;
            self.selected = 0;
            true
        } else {
            false
        }
    }

    pub fn selected_post(&self) -> Option<&Post> {
        self.posts.get(self.selected)
    }

    pub fn select_next(&mut self) {
        if !self.posts.is_empty() {
            self.selected = (self.selected + 1).min(self.posts.len() - 1);
        }
    }

    pub const fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// Ask for an action on the selected post
    ///
    /// Returns the call to make right away, or `None` when the action is
    /// not offered here or waits for [`confirm`](Self::confirm).
    pub fn request(&mut self, action: PostAction) -> Option<(PostAction, PostId)> {
        if !self.kind.actions().contains(&action) {
            return None;
        }
        let id = self.selected_post()?.id;
        if action.needs_confirm() {
            self.pending = Some((action, id));
            None
        } else {
            Some((action, id))
        }
    }

    pub fn confirm(&mut self) -> Option<(PostAction, PostId)> {
        self.pending.take()
    }

    pub const fn cancel_pending(&mut self) {
        self.pending = None;
    }

    /// Successful actions drop the post from this page
    pub fn finish_action(&mut self, action: PostAction, id: PostId, result: Result<(), ApiError>) {
        match result {
            Ok(()) => {
                info!(post = id, action = action.label(), "post action done");
                self.posts.retain(|p| p.id != id);
                self.selected = self.selected.min(self.posts.len().saturating_sub(1));
                self.notice = Some(action.done().to_string());
            }
            Err(err) => {
                self.notice = Some(err.user_message(action.failed()));
            }
        }
    }

    pub async fn act(&mut self, api: &ApiClient, action: PostAction) {
        if let Some((action, id)) = self.request(action) {
            let result = action.run(api, id).await;
            self.finish_action(action, id, result);
        }
    }

    pub async fn confirm_pending(&mut self, api: &ApiClient) {
        if let Some((action, id)) = self.confirm() {
            let result = action.run(api, id).await;
            self.finish_action(action, id, result);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Method;
    use crate::api::mock::{client, json_response, ok};
    use serde_json::json;

    fn page(count: u64, results: serde_json::Value) -> serde_json::Value {
        json!({"count": count, "next": null, "previous": null, "results": results})
    }

    #[tokio::test]
    async fn test_pending_and_scheduled_split_one_query() {
        let (api, mock, _) = client();
        let results = json!([
            {"id": 1, "status": "pending", "channels": [5]},
            {"id": 2, "status": "pending", "scheduled_time": "2030-01-01T10:00:00Z", "channels": [5]}
        ]);
        let path = "/posts/?page=1&page_size=10&status=pending";
        mock.on(Method::Get, path, ok(page(2, results.clone())));
        mock.on(Method::Get, path, ok(page(2, results)));
        mock.on(
            Method::Get,
            "/channels/5/",
            ok(json!({"id": 5, "name": "news", "username": "@n", "platform": "telegram"})),
        );
        let cache = ChannelCache::new();

        let mut pending = StatusView::new(StatusKind::Pending);
        pending.load(&api, &cache).await;
        let mut scheduled = StatusView::new(StatusKind::Scheduled);
        scheduled.load(&api, &cache).await;

        assert_eq!(pending.posts.iter().map(|p| p.id).collect::<Vec<_>>(), vec![1]);
        assert_eq!(scheduled.posts.iter().map(|p| p.id).collect::<Vec<_>>(), vec![2]);
        assert_eq!((pending.hidden, scheduled.hidden), (1, 1));
        assert_eq!(mock.calls(Method::Get, "/channels/5/"), 1);
        assert_eq!(cache.labels(&[5, 6]), vec!["news", "#6"]);
    }

    #[test]
    fn test_total_pages_and_paging() {
        let mut view = StatusView::new(StatusKind::Sent);
        view.apply_page(Ok(Page {
            count: 21,
            ..Page::default()
        }));
        assert_eq!(view.total_pages, 3);

        assert!(!view.prev_page());
        assert!(view.next_page());
        assert!(view.next_page());
        assert!(!view.next_page());
        assert_eq!(view.page, 3);

        view.apply_page(Ok(Page::default()));
        assert_eq!(view.total_pages, 1);
    }

    #[tokio::test]
    async fn test_failed_retry_removes_post() {
        let (api, mock, _) = client();
        mock.on(
            Method::Get,
            "/posts/?page=1&page_size=10&status=failed",
            ok(page(2, json!([{"id": 8, "status": "failed"}, {"id": 9, "status": "failed"}]))),
        );
        mock.on(Method::Post, "/posts/8/retry/", ok(json!({"detail": "queued"})));
        let mut view = StatusView::new(StatusKind::Failed);
        view.load(&api, &ChannelCache::new()).await;

        view.act(&api, PostAction::Retry).await;

        assert_eq!(view.posts.len(), 1);
        assert_eq!(view.posts[0].id, 9);
        assert_eq!(view.notice.as_deref(), Some("Post queued for another attempt"));
    }

    #[tokio::test]
    async fn test_cancel_requires_confirmation() {
        let (api, mock, _) = client();
        mock.on(
            Method::Get,
            "/posts/?page=1&page_size=10&status=pending",
            ok(page(1, json!([{"id": 4, "status": "pending", "scheduled_time": "2030-01-01T10:00:00Z"}]))),
        );
        mock.on(Method::Post, "/posts/4/cancel/", ok(json!({})));
        let mut view = StatusView::new(StatusKind::Scheduled);
        view.load(&api, &ChannelCache::new()).await;

        view.act(&api, PostAction::Cancel).await;
        assert_eq!(mock.calls(Method::Post, "/posts/4/cancel/"), 0);
        assert_eq!(view.pending, Some((PostAction::Cancel, 4)));

        view.confirm_pending(&api).await;
        assert_eq!(mock.calls(Method::Post, "/posts/4/cancel/"), 1);
        assert!(view.posts.is_empty());
    }

    #[tokio::test]
    async fn test_action_failure_keeps_post() {
        let (api, mock, _) = client();
        mock.on(
            Method::Get,
            "/posts/?page=1&page_size=10&status=failed",
            ok(page(1, json!([{"id": 8, "status": "failed"}]))),
        );
        mock.on(Method::Delete, "/posts/8/", json_response(403, json!({})));
        let mut view = StatusView::new(StatusKind::Failed);
        view.load(&api, &ChannelCache::new()).await;

        view.act(&api, PostAction::Delete).await;
        view.confirm_pending(&api).await;

        assert_eq!(view.posts.len(), 1);
        assert_eq!(view.notice.as_deref(), Some("Could not delete the post"));
    }

    #[test]
    fn test_sent_has_no_actions() {
        let mut view = StatusView::new(StatusKind::Sent);
        view.posts = vec![serde_json::from_value(json!({"id": 1, "status": "sent"})).unwrap()];
        assert_eq!(view.request(PostAction::Delete), None);
        assert_eq!(view.pending, None);
    }
}
