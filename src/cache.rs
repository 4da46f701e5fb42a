//! Channel lookup cache shared by every post list
//!
//! Each id maps to a once-cell, so concurrent lookups of the same channel
//! share a single request and a filled entry is never fetched again.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures_util::future::join_all;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::api::ApiClient;
use crate::error::ApiError;
use crate::models::{Channel, ChannelId};

#[derive(Debug, Default)]
pub struct ChannelCache {
    entries: Mutex<HashMap<ChannelId, Arc<OnceCell<Channel>>>>,
}

impl ChannelCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, id: ChannelId) -> Arc<OnceCell<Channel>> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        entries.entry(id).or_default().clone()
    }

    /// Cached channel, if already resolved
    pub fn peek(&self, id: ChannelId) -> Option<Channel> {
        let entries = self.entries.lock().ok()?;
        entries.get(&id)?.get().cloned()
    }

    /// Resolve one channel, fetching it at most once
    ///
    /// A failed fetch leaves the entry empty so a later call can try again.
    pub async fn get(&self, api: &ApiClient, id: ChannelId) -> Result<Channel, ApiError> {
        let slot = self.slot(id);
        let channel = slot
            .get_or_try_init(|| async {
                debug!(channel = id, "resolving channel");
                api.channel(id).await
            })
            .await?;
        Ok(channel.clone())
    }

    /// Resolve several ids concurrently; unknown ones are skipped
    pub async fn resolve(&self, api: &ApiClient, ids: &[ChannelId]) -> Vec<Channel> {
        let mut unique = ids.to_vec();
        unique.sort_unstable();
        unique.dedup();

        join_all(unique.iter().map(|id| self.get(api, *id)))
            .await
            .into_iter()
            .filter_map(Result::ok)
            .collect()
    }

    /// Seed the cache from a full channel listing
    pub fn prime(&self, channels: &[Channel]) {
        for channel in channels {
            // An already filled cell keeps its value
            let _ = self.slot(channel.id).set(channel.clone());
        }
    }

    /// Drop an entry after the channel was edited or deleted
    pub fn forget(&self, id: ChannelId) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(&id);
        }
    }

    /// Forget every channel, e.g. when the user logs out
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    /// Display names for a post's channel list, falling back to `#id`
    pub fn labels(&self, ids: &[ChannelId]) -> Vec<String> {
        ids.iter()
            .map(|id| {
                self.peek(*id)
                    .map_or_else(|| format!("#{id}"), |channel| channel.name)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Method;
    use crate::api::mock::{client, json_response, ok};
    use serde_json::json;

    fn channel(id: u64) -> serde_json::Value {
        json!({"id": id, "name": format!("ch{id}"), "username": "@c", "platform": "telegram"})
    }

    #[tokio::test]
    async fn test_filled_entry_never_refetched() {
        let (api, mock, _) = client();
        mock.on(Method::Get, "/channels/1/", ok(channel(1)));
        let cache = ChannelCache::new();

        let first = cache.get(&api, 1).await.unwrap();
        let second = cache.get(&api, 1).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(mock.calls(Method::Get, "/channels/1/"), 1);
    }

    #[tokio::test]
    async fn test_concurrent_lookups_share_one_request() {
        let (api, mock, _) = client();
        mock.on(Method::Get, "/channels/2/", ok(channel(2)));
        let cache = ChannelCache::new();

        let (a, b) = tokio::join!(cache.get(&api, 2), cache.get(&api, 2));

        assert!(a.is_ok() && b.is_ok());
        assert_eq!(mock.calls(Method::Get, "/channels/2/"), 1);
    }

    #[tokio::test]
    async fn test_failed_lookup_can_retry() {
        let (api, mock, _) = client();
        mock.on(Method::Get, "/channels/3/", json_response(500, json!({})));
        mock.on(Method::Get, "/channels/3/", ok(channel(3)));
        let cache = ChannelCache::new();

        assert!(cache.get(&api, 3).await.is_err());
        assert_eq!(cache.get(&api, 3).await.unwrap().name, "ch3");
        assert_eq!(mock.calls(Method::Get, "/channels/3/"), 2);
    }

    #[tokio::test]
    async fn test_primed_entries_skip_network() {
        let (api, mock, _) = client();
        let cache = ChannelCache::new();
        let listed: Vec<Channel> = serde_json::from_value(json!([channel(4), channel(5)])).unwrap();
        cache.prime(&listed);

        let resolved = cache.resolve(&api, &[5, 4, 5]).await;

        assert_eq!(resolved.len(), 2);
        assert_eq!(mock.total_calls(), 0);
        assert_eq!(cache.labels(&[4, 9]), vec!["ch4".to_string(), "#9".to_string()]);
    }

    #[tokio::test]
    async fn test_forget_forces_refetch() {
        let (api, mock, _) = client();
        mock.on(Method::Get, "/channels/6/", ok(channel(6)));
        mock.on(Method::Get, "/channels/6/", ok(channel(6)));
        let cache = ChannelCache::new();

        cache.get(&api, 6).await.unwrap();
        cache.forget(6);
        cache.get(&api, 6).await.unwrap();

        assert_eq!(mock.calls(Method::Get, "/channels/6/"), 2);
    }

    #[test]
    fn test_clear_drops_primed_channels() {
        let cache = ChannelCache::new();
        let listed: Vec<Channel> = serde_json::from_value(json!([channel(7)])).unwrap();
        cache.prime(&listed);
        assert_eq!(cache.labels(&[7]), vec!["ch7".to_string()]);

        cache.clear();

        assert_eq!(cache.labels(&[7]), vec!["#7".to_string()]);
    }
}
