//! New post editor

use chrono::{DateTime, Utc};
use tracing::info;

use super::{Field, Form, FormState};
use crate::api::media::UploadFile;
use crate::api::{ApiClient, FormPart, ProgressFn};
use crate::error::ApiError;
use crate::models::{ChannelId, MediaAsset, Post, PostType};
use crate::schedule;
use crate::validation::FieldErrors;

/// Where attached media comes from
///
/// Gallery items are sent by reference as `media_ids`. Direct upload sends
/// the file bytes as `media_files` with the post.
#[derive(Debug, Clone)]
pub enum MediaSource {
    Gallery(Vec<MediaAsset>),
    Upload(Vec<UploadFile>),
}

impl Default for MediaSource {
    fn default() -> Self {
        Self::Gallery(Vec::new())
    }
}

impl MediaSource {
    pub fn len(&self) -> usize {
        match self {
            Self::Gallery(items) => items.len(),
            Self::Upload(files) => files.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Short names for the attachment list
    pub fn labels(&self) -> Vec<String> {
        match self {
            Self::Gallery(items) => items
                .iter()
                .map(|m| format!("{} {}", m.media_type.emoji(), m.title))
                .collect(),
            Self::Upload(files) => files
                .iter()
                .map(|f| format!("📎 {} ({} bytes)", f.file_name, f.len()))
                .collect(),
        }
    }

    /// Ids currently picked from the gallery
    pub fn gallery_ids(&self) -> Vec<u64> {
        match self {
            Self::Gallery(items) => items.iter().map(|m| m.id).collect(),
            Self::Upload(_) => Vec::new(),
        }
    }

    fn parts(&self) -> Vec<FormPart> {
        match self {
            Self::Gallery(items) => items
                .iter()
                .map(|m| FormPart::text("media_ids", m.id.to_string()))
                .collect(),
            Self::Upload(files) => files.iter().map(|f| f.part("media_files")).collect(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ComposerView {
    pub content: String,
    /// Channel ids in the order they were picked
    pub channels: Vec<ChannelId>,
    pub has_media: bool,
    pub media: MediaSource,
    /// Free-form schedule input; empty sends right away
    pub schedule: String,
    pub state: FormState,
}

impl ComposerView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_selected(&self, id: ChannelId) -> bool {
        self.channels.contains(&id)
    }

    pub fn toggle_channel(&mut self, id: ChannelId) {
        if let Some(pos) = self.channels.iter().position(|c| *c == id) {
            self.channels.remove(pos);
        } else {
            self.channels.push(id);
        }
    }

    /// Turning media off drops whatever was attached
    pub fn set_has_media(&mut self, has_media: bool) {
        self.has_media = has_media;
        if !has_media {
            self.media = MediaSource::default();
        }
    }

    pub fn toggle_media(&mut self) {
        self.set_has_media(!self.has_media);
    }

    /// Replace the attachment list with the gallery's confirmed selection
    pub fn set_gallery_media(&mut self, items: Vec<MediaAsset>) {
        self.has_media = true;
        self.media = MediaSource::Gallery(items);
    }

    /// Attach a local file for direct upload; switching sources starts over
    pub fn add_file(&mut self, file: UploadFile) {
        self.has_media = true;
        if let MediaSource::Upload(files) = &mut self.media {
            files.push(file);
        } else {
            self.media = MediaSource::Upload(vec![file]);
        }
    }

    pub fn remove_media(&mut self, index: usize) {
        match &mut self.media {
            MediaSource::Gallery(items) if index < items.len() => {
                items.remove(index);
            }
            MediaSource::Upload(files) if index < files.len() => {
                files.remove(index);
            }
            _ => {}
        }
    }

    /// Schedule preview for the editor footer
    pub fn schedule_preview(&self, now: DateTime<Utc>) -> Option<Result<String, String>> {
        if self.schedule.trim().is_empty() {
            return None;
        }
        Some(
            schedule::parse_future(&self.schedule, now)
                .map(schedule::display_local)
                .map_err(|e| e.to_string()),
        )
    }

    /// First failing rule only, checked in a fixed order
    pub fn validate(&self, now: DateTime<Utc>) -> Result<Option<DateTime<Utc>>, FieldErrors> {
        let fail = |field: &str, msg: String| {
            let mut errors = FieldErrors::new();
            errors.insert(field.to_string(), msg);
            Err(errors)
        };

        if self.channels.is_empty() {
            return fail("channels", "Select at least one channel".into());
        }
        if self.content.trim().is_empty() && !self.has_media {
            return fail("content", "Write some text or attach media".into());
        }
        if self.has_media && self.media.is_empty() {
            return fail("media", "Attach at least one media file".into());
        }
        if self.schedule.trim().is_empty() {
            return Ok(None);
        }
        match schedule::parse_future(&self.schedule, now) {
            Ok(at) => Ok(Some(at)),
            Err(err) => fail("schedule", err.to_string()),
        }
    }

    /// Validate at `now` and build the multipart body
    pub fn begin_submit_at(&mut self, now: DateTime<Utc>) -> Option<Vec<FormPart>> {
        let scheduled = match self.validate(now) {
            Ok(scheduled) => scheduled,
            Err(errors) => {
                self.state = FormState::FieldErrors(errors);
                return None;
            }
        };
        self.state = FormState::Submitting;

        let mut parts = vec![FormPart::text("content", self.content.trim())];
        parts.extend(
            self.channels
                .iter()
                .map(|id| FormPart::text("channels", id.to_string())),
        );
        let kind = if self.has_media {
            PostType::Media
        } else {
            PostType::Text
        };
        parts.push(FormPart::text("types", kind.as_str()));
        if self.has_media {
            parts.extend(self.media.parts());
        }
        if let Some(at) = scheduled {
            parts.push(FormPart::text("scheduled_time", at.to_rfc3339()));
        }
        Some(parts)
    }

    pub fn begin_submit(&mut self) -> Option<Vec<FormPart>> {
        self.begin_submit_at(Utc::now())
    }

    /// The draft resets after a successful create
    pub fn finish_submit(&mut self, result: Result<Option<Post>, ApiError>) {
        match result {
            Ok(post) => {
                let message = match post.as_ref().and_then(|p| p.scheduled_time) {
                    Some(at) => format!("Post scheduled for {}", schedule::display_local(at)),
                    None => "Post created".to_string(),
                };
                if let Some(post) = &post {
                    info!(post = post.id, "post created");
                }
                *self = Self::default();
                self.state = FormState::Success(message);
            }
            Err(err) => {
                let message = err
                    .field_error("types")
                    .unwrap_or_else(|| err.user_message("Could not send the post"));
                self.state = FormState::GeneralError(message);
            }
        }
    }

    pub async fn submit(&mut self, api: &ApiClient, progress: Option<ProgressFn>) {
        let Some(parts) = self.begin_submit() else {
            return;
        };
        let result = api.create_post(parts, progress).await;
        self.finish_submit(result);
    }
}

impl Form for ComposerView {
    fn title(&self) -> &'static str {
        "New post"
    }

    fn fields(&self) -> Vec<Field> {
        vec![
            Field::text("content", "Text"),
            Field::text("schedule", "Send at (empty = now)"),
        ]
    }

    fn value(&self, field: &str) -> &str {
        match field {
            "content" => &self.content,
            "schedule" => &self.schedule,
            _ => "",
        }
    }

    fn value_mut(&mut self, field: &str) -> Option<&mut String> {
        match field {
            "content" => Some(&mut self.content),
            "schedule" => Some(&mut self.schedule),
            _ => None,
        }
    }

    fn state(&self) -> &FormState {
        &self.state
    }

    fn hint(&self) -> Option<String> {
        self.schedule_preview(Utc::now()).map(|preview| match preview {
            Ok(at) => format!("Will be sent at {at}"),
            Err(err) => err,
        })
    }
}
