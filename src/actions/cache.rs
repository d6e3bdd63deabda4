//! Metadata caching to avoid repeated GitHub lookups.
//!
//! Both hits and "repository not found" answers are cached. Errors are not.

use std::time::Duration;

use moka::future::Cache;

use super::client::{ActionMetadata, GitHubClient};
use super::reference::{parse_action_ref, ActionRef};
use crate::error::Result;

/// Default cache capacity (number of action references).
const DEFAULT_CACHE_CAPACITY: u64 = 500;

/// Caching front for [`GitHubClient`].
#[derive(Clone)]
pub struct MetadataCache {
    client: GitHubClient,
    cache: Cache<ActionRef, Option<ActionMetadata>>,
}

impl MetadataCache {
    pub fn new(client: GitHubClient, ttl: Duration) -> Self {
        Self::with_capacity(client, ttl, DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_capacity(client: GitHubClient, ttl: Duration, max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .build();
        Self { client, cache }
    }

    /// Cached equivalent of [`GitHubClient::fetch_action_metadata`].
    pub async fn get(&self, reference: &str) -> Result<Option<ActionMetadata>> {
        match parse_action_ref(reference) {
            Some(action) => self.get_ref(&action).await,
            None => Ok(None),
        }
    }

    pub async fn get_ref(&self, action: &ActionRef) -> Result<Option<ActionMetadata>> {
        if let Some(cached) = self.cache.get(action).await {
            return Ok(cached);
        }

        let metadata = self.client.fetch(action).await?;
        self.cache.insert(action.clone(), metadata.clone()).await;
        Ok(metadata)
    }

    /// Resolve several references, keeping input order. Failed lookups are
    /// returned in place rather than aborting the batch.
    pub async fn get_many(
        &self,
        actions: &[ActionRef],
    ) -> Vec<(ActionRef, Result<Option<ActionMetadata>>)> {
        let mut results = Vec::with_capacity(actions.len());
        for action in actions {
            results.push((action.clone(), self.get_ref(action).await));
        }
        results
    }

    pub async fn invalidate(&self, action: &ActionRef) {
        self.cache.invalidate(action).await;
    }

    pub async fn clear(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }

    pub async fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }
}
