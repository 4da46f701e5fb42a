//! Media gallery picker

use std::collections::HashSet;

use tracing::{info, warn};

use crate::api::media::UploadFile;
use crate::api::{ApiClient, ProgressFn};
use crate::error::ApiError;
use crate::models::{MediaAsset, MediaId, StorageInfo};

/// Bytes sent so far for the running upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadProgress {
    pub file_name: String,
    pub sent: u64,
    pub total: u64,
}

impl UploadProgress {
    pub fn percent(&self) -> u16 {
        if self.total == 0 {
            return 0;
        }
        u16::try_from((self.sent.min(self.total) * 100) / self.total).unwrap_or(100)
    }
}

#[derive(Debug, Clone, Default)]
pub struct GalleryView {
    pub items: Vec<MediaAsset>,
    pub storage: Option<StorageInfo>,
    pub selection: HashSet<MediaId>,
    pub cursor: usize,
    pub loading: bool,
    pub error: Option<String>,
    pub upload: Option<UploadProgress>,
    pub pending_delete: Option<MediaId>,
}

impl GalleryView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from whatever the composer already has attached
    pub fn open(&mut self, parent_selection: &[MediaId]) {
        self.selection = parent_selection.iter().copied().collect();
        self.cursor = 0;
        self.pending_delete = None;
        self.error = None;
    }

    pub fn apply_list(&mut self, result: Result<Vec<MediaAsset>, ApiError>) {
        self.loading = false;
        match result {
            Ok(items) => {
                self.items = items;
                self.cursor = self.cursor.min(self.items.len().saturating_sub(1));
            }
            Err(err) => {
                warn!(error = %err, "media list failed");
                self.error = Some(err.user_message("Could not load your media"));
            }
        }
    }

    /// Quota failures keep the previous figures
    pub fn apply_storage(&mut self, result: Result<StorageInfo, ApiError>) {
        match result {
            Ok(info) => self.storage = Some(info),
            Err(err) => warn!(error = %err, "storage info failed"),
        }
    }

    pub async fn load(&mut self, api: &ApiClient) {
        self.loading = true;
        let (list, storage) = tokio::join!(api.media_list(), api.storage_info());
        self.apply_list(list);
        self.apply_storage(storage);
    }

    pub fn storage_danger(&self) -> bool {
        self.storage.is_some_and(|s| s.is_danger())
    }

    pub fn current(&self) -> Option<&MediaAsset> {
        self.items.get(self.cursor)
    }

    pub fn cursor_next(&mut self) {
        if !self.items.is_empty() {
            self.cursor = (self.cursor + 1).min(self.items.len() - 1);
        }
    }

    pub const fn cursor_prev(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn is_selected(&self, id: MediaId) -> bool {
        self.selection.contains(&id)
    }

    pub fn toggle(&mut self, id: MediaId) {
        if !self.selection.remove(&id) {
            self.selection.insert(id);
        }
    }

    pub fn toggle_current(&mut self) {
        if let Some(id) = self.current().map(|m| m.id) {
            self.toggle(id);
        }
    }

    pub fn can_confirm(&self) -> bool {
        self.items.iter().any(|m| self.selection.contains(&m.id))
    }

    /// Full replacement list for the composer, in gallery order
    pub fn confirm(&self) -> Option<Vec<MediaAsset>> {
        if !self.can_confirm() {
            return None;
        }
        Some(
            self.items
                .iter()
                .filter(|m| self.selection.contains(&m.id))
                .cloned()
                .collect(),
        )
    }

    pub fn begin_upload(&mut self, file: &UploadFile) {
        self.upload = Some(UploadProgress {
            file_name: file.file_name.clone(),
            sent: 0,
            total: file.len(),
        });
        self.error = None;
    }

    pub fn set_progress(&mut self, sent: u64, total: u64) {
        if let Some(upload) = self.upload.as_mut() {
            upload.sent = sent;
            upload.total = total;
        }
    }

    pub fn finish_upload(&mut self, result: Result<Option<MediaAsset>, ApiError>) {
        let name = self.upload.take().map(|u| u.file_name).unwrap_or_default();
        match result {
            Ok(_) => info!(file = %name, "media uploaded"),
            Err(err) => self.error = Some(err.user_message("Upload failed")),
        }
    }

    /// Upload one file, then refresh the list and quota
    pub async fn upload(&mut self, api: &ApiClient, file: UploadFile, progress: Option<ProgressFn>) {
        self.begin_upload(&file);
        let result = api.upload_media(&file, progress).await;
        let uploaded = result.is_ok();
        self.finish_upload(result);
        if uploaded {
            self.load(api).await;
        }
    }

    pub fn request_delete(&mut self) {
        self.pending_delete = self.current().map(|m| m.id);
    }

    pub const fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    pub fn finish_delete(&mut self, id: MediaId, result: Result<(), ApiError>) {
        match result {
            Ok(()) => {
                self.items.retain(|m| m.id != id);
                self.selection.remove(&id);
                self.cursor = self.cursor.min(self.items.len().saturating_sub(1));
            }
            Err(err) => self.error = Some(err.user_message("Could not delete the file")),
        }
    }

    pub async fn confirm_delete(&mut self, api: &ApiClient) {
        let Some(id) = self.pending_delete.take() else {
            return;
        };
        let result = api.delete_media(id).await;
        let deleted = result.is_ok();
        self.finish_delete(id, result);
        if deleted {
            self.apply_storage(api.storage_info().await);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Method;
    use crate::api::mock::{client, json_response, ok};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    const LIST: &str = "/posts/media/user-media/user_media_list/";
    const STORAGE: &str = "/posts/media/user-media/storage_info/";

    fn items() -> serde_json::Value {
        json!([
            {"id": 1, "title": "a.png", "media_type": "image"},
            {"id": 2, "title": "b.mp4", "media_type": "video"},
            {"id": 3, "title": "c.pdf", "media_type": "file"}
        ])
    }

    fn storage(used: f64) -> serde_json::Value {
        json!({"used_space_mb": used, "total_space_mb": 100.0, "used_percentage": used})
    }

    #[tokio::test]
    async fn test_open_reconciles_and_confirms_in_gallery_order() {
        let (api, mock, _) = client();
        mock.on(Method::Get, LIST, ok(items()));
        mock.on(Method::Get, STORAGE, ok(storage(85.0)));
        let mut view = GalleryView::new();

        view.open(&[3, 99]);
        view.load(&api).await;
        view.toggle(1);

        let picked: Vec<_> = view.confirm().unwrap().iter().map(|m| m.id).collect();
        assert_eq!(picked, vec![1, 3]);
        assert!(view.storage_danger());
    }

    #[tokio::test]
    async fn test_confirm_disabled_when_empty() {
        let (api, mock, _) = client();
        mock.on(Method::Get, LIST, ok(items()));
        mock.on(Method::Get, STORAGE, ok(storage(10.0)));
        let mut view = GalleryView::new();
        view.open(&[]);
        view.load(&api).await;

        assert!(!view.can_confirm());
        assert!(view.confirm().is_none());
        assert!(!view.storage_danger());
    }

    #[tokio::test]
    async fn test_upload_reports_progress_and_reloads() {
        let (api, mock, _) = client();
        mock.on(Method::Post, "/posts/media/user-media/", ok(json!({"id": 4, "title": "d.png"})));
        mock.on(Method::Get, LIST, ok(items()));
        mock.on(Method::Get, STORAGE, ok(storage(20.0)));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let progress: ProgressFn = Arc::new(move |sent: u64, total: u64| {
            sink.lock().unwrap().push((sent, total));
        });
        let mut view = GalleryView::new();

        view.upload(&api, UploadFile::new("d.png", vec![1, 2, 3]), Some(progress))
            .await;

        let sent = mock.last(Method::Post, "/posts/media/user-media/").unwrap();
        assert!(sent.has_part("file"));
        assert!(!seen.lock().unwrap().is_empty());
        assert!(view.upload.is_none());
        assert_eq!(view.items.len(), 3);
        assert_eq!(mock.calls(Method::Get, LIST), 1);
    }

    #[tokio::test]
    async fn test_delete_with_confirm() {
        let (api, mock, _) = client();
        mock.on(Method::Get, LIST, ok(items()));
        mock.on(Method::Get, STORAGE, ok(storage(50.0)));
        mock.on(Method::Delete, "/posts/media/user-media/1/", json_response(204, json!(null)));
        mock.on(Method::Get, STORAGE, ok(storage(40.0)));
        let mut view = GalleryView::new();
        view.open(&[1]);
        view.load(&api).await;

        view.request_delete();
        assert_eq!(view.pending_delete, Some(1));
        view.confirm_delete(&api).await;

        assert_eq!(view.items.len(), 2);
        assert!(!view.is_selected(1));
        assert!(view.storage.is_some_and(|s| (s.percent() - 40.0).abs() < f64::EPSILON));
    }

    #[test]
    fn test_progress_percent() {
        let progress = UploadProgress {
            file_name: "x".into(),
            sent: 50,
            total: 200,
        };
        assert_eq!(progress.percent(), 25);
    }
}
