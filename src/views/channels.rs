//! Channel management

use tracing::debug;

use super::{Field, Form, FormState, gate};
use crate::api::ApiClient;
use crate::cache::ChannelCache;
use crate::error::ApiError;
use crate::models::{Channel, ChannelDraft, ChannelId};
use crate::validation::{FieldErrors, check_required};

/// Server message first, then the first name/username complaint
fn channel_error(err: &ApiError, fallback: &str) -> String {
    err.server_message()
        .or_else(|| err.field_error("username"))
        .or_else(|| err.field_error("name"))
        .unwrap_or_else(|| err.user_message(fallback))
}

/// Add or edit form; `id` is `None` for a new channel
#[derive(Debug, Clone, Default)]
pub struct ChannelEditor {
    pub id: Option<ChannelId>,
    pub draft: ChannelDraft,
    pub state: FormState,
}

impl ChannelEditor {
    pub fn create() -> Self {
        Self::default()
    }

    pub fn edit(channel: &Channel) -> Self {
        Self {
            id: Some(channel.id),
            draft: ChannelDraft::from(channel),
            state: FormState::Idle,
        }
    }

    pub const fn toggle_platform(&mut self) {
        self.draft.platform = self.draft.platform.toggle();
    }

    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        check_required("name", &self.draft.name, "Name", &mut errors);
        check_required("username", &self.draft.username, "Username", &mut errors);
        errors
    }

    pub fn begin_submit(&mut self) -> Option<(Option<ChannelId>, ChannelDraft)> {
        let errors = self.validate();
        gate(&mut self.state, errors).then(|| {
            (
                self.id,
                ChannelDraft {
                    name: self.draft.name.trim().to_string(),
                    username: self.draft.username.trim().to_string(),
                    platform: self.draft.platform,
                },
            )
        })
    }
}

impl Form for ChannelEditor {
    fn title(&self) -> &'static str {
        if self.id.is_some() {
            "Edit channel"
        } else {
            "Add channel"
        }
    }

    fn fields(&self) -> Vec<Field> {
        vec![
            Field::text("name", "Name"),
            Field::text("username", "Username (@handle)"),
        ]
    }

    fn value(&self, field: &str) -> &str {
        match field {
            "name" => &self.draft.name,
            "username" => &self.draft.username,
            _ => "",
        }
    }

    fn value_mut(&mut self, field: &str) -> Option<&mut String> {
        match field {
            "name" => Some(&mut self.draft.name),
            "username" => Some(&mut self.draft.username),
            _ => None,
        }
    }

    fn state(&self) -> &FormState {
        &self.state
    }

    fn hint(&self) -> Option<String> {
        Some(format!(
            "Platform: {} {} (Tab to switch)",
            self.draft.platform.emoji(),
            self.draft.platform.name()
        ))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChannelsView {
    pub channels: Vec<Channel>,
    pub selected: usize,
    pub loading: bool,
    pub editor: Option<ChannelEditor>,
    /// Channel waiting for delete confirmation
    pub pending_delete: Option<ChannelId>,
    pub error: Option<String>,
}

impl ChannelsView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected_channel(&self) -> Option<&Channel> {
        self.channels.get(self.selected)
    }

    pub fn select_next(&mut self) {
        if !self.channels.is_empty() {
            self.selected = (self.selected + 1).min(self.channels.len() - 1);
        }
    }

    pub const fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn apply_list(&mut self, result: Result<Vec<Channel>, ApiError>, cache: &ChannelCache) {
        self.loading = false;
        match result {
            Ok(channels) => {
                cache.prime(&channels);
                self.channels = channels;
                self.selected = self.selected.min(self.channels.len().saturating_sub(1));
                self.error = None;
            }
            Err(err) => {
                self.error = Some(err.user_message("Could not load channels"));
            }
        }
    }

    pub async fn load(&mut self, api: &ApiClient, cache: &ChannelCache) {
        self.loading = true;
        let result = api.channels().await;
        self.apply_list(result, cache);
    }

    pub fn open_create(&mut self) {
        self.editor = Some(ChannelEditor::create());
    }

    pub fn open_edit(&mut self) {
        self.editor = self.selected_channel().map(ChannelEditor::edit);
    }

    pub fn close_editor(&mut self) {
        self.editor = None;
    }

    /// Result of a create or update; the editor closes on success
    pub fn finish_save(&mut self, result: Result<Channel, ApiError>, cache: &ChannelCache) {
        let Some(editor) = self.editor.as_mut() else {
            return;
        };
        match result {
            Ok(channel) => {
                cache.forget(channel.id);
                cache.prime(std::slice::from_ref(&channel));
                match self.channels.iter_mut().find(|c| c.id == channel.id) {
                    Some(existing) => *existing = channel,
                    None => self.channels.push(channel),
                }
                self.editor = None;
                self.error = None;
            }
            Err(err) => {
                let fallback = if editor.id.is_some() {
                    "Could not update the channel"
                } else {
                    "Could not add the channel"
                };
                editor.state = FormState::GeneralError(channel_error(&err, fallback));
            }
        }
    }

    pub async fn save(&mut self, api: &ApiClient, cache: &ChannelCache) {
        let Some((id, draft)) = self.editor.as_mut().and_then(ChannelEditor::begin_submit) else {
            return;
        };
        let result = match id {
            Some(id) => api.update_channel(id, &draft).await,
            None => api.create_channel(&draft).await,
        };
        self.finish_save(result, cache);
    }

    /// First step of deleting: remember which channel to drop
    pub fn request_delete(&mut self) {
        self.pending_delete = self.selected_channel().map(|c| c.id);
    }

    pub const fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    pub fn finish_delete(&mut self, id: ChannelId, result: Result<(), ApiError>, cache: &ChannelCache) {
        match result {
            Ok(()) => {
                debug!(channel = id, "channel deleted");
                cache.forget(id);
                self.channels.retain(|c| c.id != id);
                if self.editor.as_ref().is_some_and(|e| e.id == Some(id)) {
                    self.editor = None;
                }
                self.selected = self.selected.min(self.channels.len().saturating_sub(1));
                self.error = None;
            }
            Err(err) => {
                self.error = Some(err.user_message("Could not delete the channel"));
            }
        }
    }

    /// Second step: only runs after `request_delete`
    pub async fn confirm_delete(&mut self, api: &ApiClient, cache: &ChannelCache) {
        let Some(id) = self.pending_delete.take() else {
            return;
        };
        let result = api.delete_channel(id).await;
        self.finish_delete(id, result, cache);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Method;
    use crate::api::mock::{client, json_response, ok};
    use crate::models::Platform;
    use serde_json::json;

    fn channel(id: u64, name: &str) -> serde_json::Value {
        json!({"id": id, "name": name, "username": "@c", "platform": "telegram", "is_verified": true})
    }

    async fn loaded(api: &ApiClient, cache: &ChannelCache) -> ChannelsView {
        let mut view = ChannelsView::new();
        view.load(api, cache).await;
        view
    }

    #[tokio::test]
    async fn test_load_primes_cache() {
        let (api, mock, _) = client();
        mock.on(Method::Get, "/channels/", ok(json!([channel(1, "news")])));
        let cache = ChannelCache::new();

        let view = loaded(&api, &cache).await;

        assert_eq!(view.channels.len(), 1);
        assert_eq!(cache.peek(1).map(|c| c.name), Some("news".to_string()));
    }

    #[tokio::test]
    async fn test_create_appends_and_closes_editor() {
        let (api, mock, _) = client();
        mock.on(Method::Get, "/channels/", ok(json!([])));
        mock.on(Method::Post, "/channels/create/", ok(json!({"id": 5, "name": "new", "username": "@new", "platform": "bale"})));
        let cache = ChannelCache::new();
        let mut view = loaded(&api, &cache).await;

        view.open_create();
        if let Some(editor) = view.editor.as_mut() {
            editor.draft.name = "new".into();
            editor.draft.username = "@new".into();
            editor.toggle_platform();
        }
        view.save(&api, &cache).await;

        assert!(view.editor.is_none());
        assert_eq!(view.channels[0].platform, Platform::Bale);
        let sent = mock.last(Method::Post, "/channels/create/").unwrap();
        assert_eq!(sent.json(), json!({"name": "new", "username": "@new", "platform": "bale"}));
    }

    #[tokio::test]
    async fn test_save_error_uses_field_message() {
        let (api, mock, _) = client();
        mock.on(Method::Get, "/channels/", ok(json!([])));
        mock.on(
            Method::Post,
            "/channels/create/",
            json_response(400, json!({"username": ["bot is not admin"]})),
        );
        let cache = ChannelCache::new();
        let mut view = loaded(&api, &cache).await;
        view.open_create();
        if let Some(editor) = view.editor.as_mut() {
            editor.draft.name = "x".into();
            editor.draft.username = "@x".into();
        }

        view.save(&api, &cache).await;

        let editor = view.editor.as_ref().unwrap();
        assert_eq!(editor.state, FormState::GeneralError("bot is not admin".into()));
    }

    #[tokio::test]
    async fn test_edit_replaces_and_refreshes_cache() {
        let (api, mock, _) = client();
        mock.on(Method::Get, "/channels/", ok(json!([channel(2, "old")])));
        mock.on(Method::Put, "/channels/2/", ok(channel(2, "renamed")));
        let cache = ChannelCache::new();
        let mut view = loaded(&api, &cache).await;

        view.open_edit();
        if let Some(editor) = view.editor.as_mut() {
            editor.draft.name = "renamed".into();
        }
        view.save(&api, &cache).await;

        assert_eq!(view.channels[0].name, "renamed");
        assert_eq!(cache.peek(2).map(|c| c.name), Some("renamed".to_string()));
    }

    #[tokio::test]
    async fn test_delete_needs_confirmation() {
        let (api, mock, _) = client();
        mock.on(Method::Get, "/channels/", ok(json!([channel(3, "a"), channel(4, "b")])));
        mock.on(Method::Delete, "/channels/3/", json_response(204, json!(null)));
        let cache = ChannelCache::new();
        let mut view = loaded(&api, &cache).await;

        view.confirm_delete(&api, &cache).await;
        assert_eq!(mock.calls(Method::Delete, "/channels/3/"), 0);

        view.request_delete();
        view.confirm_delete(&api, &cache).await;

        assert_eq!(view.channels.len(), 1);
        assert_eq!(view.channels[0].id, 4);
        assert!(cache.peek(3).is_none());
    }

    #[test]
    fn test_empty_fields_blocked() {
        let mut editor = ChannelEditor::create();
        assert!(editor.begin_submit().is_none());
        assert!(editor.state.field_error("name").is_some());
        assert!(editor.state.field_error("username").is_some());
    }
}
