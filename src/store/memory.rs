use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::ProfileStore;
use crate::error::CoreError;
use crate::preferences::{MealHistoryEntry, UserProfile};

#[derive(Default)]
struct Inner {
    profiles: HashMap<String, UserProfile>,
    history: HashMap<String, Vec<MealHistoryEntry>>,
}

/// Process-local store. Used by tests and by `STORE_BACKEND=memory`.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn get(&self, user_id: &str) -> Result<Option<UserProfile>, CoreError> {
        Ok(self.inner.read().await.profiles.get(user_id).cloned())
    }

    async fn create(&self, profile: UserProfile) -> Result<UserProfile, CoreError> {
        let mut inner = self.inner.write().await;
        if inner.profiles.contains_key(&profile.user_id) {
            return Err(CoreError::ProfileExists(profile.user_id));
        }
        inner
            .profiles
            .insert(profile.user_id.clone(), profile.clone());
        Ok(profile)
    }

    async fn put(&self, profile: &UserProfile) -> Result<(), CoreError> {
        self.inner
            .write()
            .await
            .profiles
            .insert(profile.user_id.clone(), profile.clone());
        Ok(())
    }

    async fn append_history(&self, entry: &MealHistoryEntry) -> Result<(), CoreError> {
        self.inner
            .write()
            .await
            .history
            .entry(entry.user_id.clone())
            .or_default()
            .push(entry.clone());
        Ok(())
    }

    async fn commit_update(
        &self,
        profile: &UserProfile,
        entry: &MealHistoryEntry,
    ) -> Result<(), CoreError> {
        let mut inner = self.inner.write().await;
        inner
            .profiles
            .insert(profile.user_id.clone(), profile.clone());
        inner
            .history
            .entry(entry.user_id.clone())
            .or_default()
            .push(entry.clone());
        Ok(())
    }

    async fn list_recent_history(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<MealHistoryEntry>, CoreError> {
        let inner = self.inner.read().await;
        let Some(entries) = inner.history.get(user_id) else {
            return Ok(Vec::new());
        };
        // newest append wins ties on equal timestamps
        let mut out: Vec<MealHistoryEntry> = entries.iter().rev().cloned().collect();
        out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        out.truncate(limit);
        Ok(out)
    }

    async fn count_history(&self, user_id: &str) -> Result<u64, CoreError> {
        let inner = self.inner.read().await;
        Ok(inner.history.get(user_id).map_or(0, |h| h.len() as u64))
    }

    async fn delete(&self, user_id: &str) -> Result<bool, CoreError> {
        let mut inner = self.inner.write().await;
        inner.history.remove(user_id);
        Ok(inner.profiles.remove(user_id).is_some())
    }
}
