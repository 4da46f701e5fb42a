//! Media gallery endpoints

use std::path::Path;
use std::sync::Arc;

use super::{ApiClient, ApiRequest, FormPart, ProgressFn};
use crate::error::ApiError;
use crate::models::{ListOrPage, MediaAsset, MediaId, MediaKind, StorageInfo};

const MEDIA_ROOT: &str = "/posts/media/user-media/";

/// A file read into memory, ready for multipart upload
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub mime: String,
    pub bytes: Arc<Vec<u8>>,
}

impl UploadFile {
    pub fn new(file_name: &str, bytes: Vec<u8>) -> Self {
        let ext = file_name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or_default();
        Self {
            file_name: file_name.to_string(),
            mime: MediaKind::mime_for(ext).to_string(),
            bytes: Arc::new(bytes),
        }
    }

    /// Read a local file
    pub async fn read(path: &Path) -> Result<Self, ApiError> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self::new(&name, bytes))
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn part(&self, field: &str) -> FormPart {
        FormPart::file(field, &self.file_name, &self.mime, self.bytes.clone())
    }
}

impl ApiClient {
    pub async fn media_list(&self) -> Result<Vec<MediaAsset>, ApiError> {
        let list: ListOrPage<MediaAsset> = self
            .get(&format!("{MEDIA_ROOT}user_media_list/"))
            .await?;
        Ok(list.into_items())
    }

    pub async fn storage_info(&self) -> Result<StorageInfo, ApiError> {
        self.get(&format!("{MEDIA_ROOT}storage_info/")).await
    }

    /// Upload one file into the gallery
    pub async fn upload_media(
        &self,
        file: &UploadFile,
        progress: Option<ProgressFn>,
    ) -> Result<Option<MediaAsset>, ApiError> {
        let mut request = ApiRequest::post(MEDIA_ROOT).multipart(vec![file.part("file")]);
        if let Some(progress) = progress {
            request = request.on_progress(progress);
        }
        self.fetch_or_default(request).await
    }

    pub async fn delete_media(&self, id: MediaId) -> Result<(), ApiError> {
        self.execute(ApiRequest::delete(format!("{MEDIA_ROOT}{id}/")))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Method;
    use crate::api::mock::{client, ok};
    use serde_json::json;

    #[test]
    fn test_upload_file_mime_from_extension() {
        let file = UploadFile::new("clip.MP4", vec![0; 3]);
        assert_eq!(file.mime, "video/mp4");
        assert_eq!(file.len(), 3);
        assert_eq!(UploadFile::new("README", vec![]).mime, "application/octet-stream");
    }

    #[tokio::test]
    async fn test_read_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = UploadFile::read(&dir.path().join("nope.png")).await.unwrap_err();
        assert!(matches!(err, ApiError::Io(_)));
    }

    #[tokio::test]
    async fn test_upload_sends_file_field() {
        let (api, mock, _) = client();
        mock.on(
            Method::Post,
            MEDIA_ROOT,
            ok(json!({"id": 8, "title": "a.png", "media_type": "image"})),
        );
        let file = UploadFile::new("a.png", vec![1, 2, 3]);

        let asset = api.upload_media(&file, None).await.unwrap().unwrap();

        assert_eq!(asset.id, 8);
        assert!(mock.last(Method::Post, MEDIA_ROOT).unwrap().has_part("file"));
    }

    #[tokio::test]
    async fn test_storage_info() {
        let (api, mock, _) = client();
        mock.on(
            Method::Get,
            "/posts/media/user-media/storage_info/",
            ok(json!({"used_space_mb": 85.0, "total_space_mb": 100.0, "used_percentage": 85.0})),
        );
        assert!(api.storage_info().await.unwrap().is_danger());
    }
}
