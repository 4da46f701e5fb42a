//! Gallery media model

use serde::{Deserialize, Serialize};

/// Server id of a gallery item
pub type MediaId = u64;

/// Broad kind of a media file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Still image
    Image,
    /// Video clip
    Video,
    /// Audio clip
    Audio,
    /// Anything else (documents, archives)
    #[default]
    #[serde(other)]
    File,
}

impl MediaKind {
    /// MIME type used for uploads
    pub fn mime_for(ext: &str) -> &'static str {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" => "image/jpeg",
            "png" => "image/png",
            "gif" => "image/gif",
            "webp" => "image/webp",
            "mp4" => "video/mp4",
            "webm" => "video/webm",
            "mov" => "video/quicktime",
            "mp3" => "audio/mpeg",
            "wav" => "audio/wav",
            "ogg" => "audio/ogg",
            "pdf" => "application/pdf",
            "zip" => "application/zip",
            _ => "application/octet-stream",
        }
    }

    /// Get the emoji icon
    pub const fn emoji(&self) -> &'static str {
        match self {
            Self::Image => "🖼️",
            Self::Video => "🎥",
            Self::Audio => "🎵",
            Self::File => "📄",
        }
    }
}

/// A file in the user's media gallery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAsset {
    /// Server id
    pub id: MediaId,
    /// Display title (usually the original file name)
    #[serde(default)]
    pub title: String,
    /// Broad kind
    #[serde(default, alias = "type")]
    pub media_type: MediaKind,
    /// Download URL
    #[serde(default, alias = "url")]
    pub file_url: Option<String>,
    /// Size in bytes
    #[serde(default)]
    pub size: Option<u64>,
}

impl MediaAsset {
    /// Human-readable size
    pub fn size_display(&self) -> String {
        match self.size {
            None => "-".to_string(),
            Some(bytes) if bytes < 1024 => format!("{bytes} B"),
            Some(bytes) if bytes < 1024 * 1024 => format!("{:.1} KB", bytes as f64 / 1024.0),
            Some(bytes) => format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0)),
        }
    }
}

/// Storage quota as reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StorageInfo {
    /// Megabytes in use
    pub used_space_mb: f64,
    /// Megabytes allotted
    pub total_space_mb: f64,
    /// Percentage used
    #[serde(default)]
    pub used_percentage: f64,
}

impl StorageInfo {
    /// Usage above which the quota bar turns red
    pub const DANGER_PERCENT: f64 = 80.0;

    /// Percentage used, derived when the server omitted it
    pub fn percent(&self) -> f64 {
        if self.used_percentage > 0.0 {
            self.used_percentage.min(100.0)
        } else if self.total_space_mb > 0.0 {
            (self.used_space_mb / self.total_space_mb * 100.0).min(100.0)
        } else {
            0.0
        }
    }

    /// Whether usage is in the danger zone
    pub fn is_danger(&self) -> bool {
        self.percent() > Self::DANGER_PERCENT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_gallery_item() {
        let json = r#"{"id": 3, "title": "cat.png", "media_type": "image", "file_url": "https://cdn/cat.png", "size": 2048}"#;
        let asset: MediaAsset = serde_json::from_str(json).unwrap();
        assert_eq!(asset.media_type, MediaKind::Image);
        assert_eq!(asset.size_display(), "2.0 KB");

        let odd: MediaAsset = serde_json::from_str(r#"{"id": 4, "media_type": "document"}"#).unwrap();
        assert_eq!(odd.media_type, MediaKind::File);
    }

    #[test]
    fn test_storage_percent() {
        let info = StorageInfo {
            used_space_mb: 90.0,
            total_space_mb: 100.0,
            used_percentage: 0.0,
        };
        assert!((info.percent() - 90.0).abs() < f64::EPSILON);
        assert!(info.is_danger());
        assert!(!StorageInfo::default().is_danger());
    }
}
