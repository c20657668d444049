use async_trait::async_trait;

use crate::error::CoreError;
use crate::preferences::{MealHistoryEntry, UserProfile};

mod memory;
mod postgres;
mod rows;

pub use memory::MemoryStore;
pub use postgres::PgProfileStore;

/// Persistence for profiles and their meal history, keyed by `user_id`.
///
/// A `get` followed by a `put` is not atomic here; callers serialize
/// updates per user (see `locks::UserLocks`).
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get(&self, user_id: &str) -> Result<Option<UserProfile>, CoreError>;

    /// Inserts a new profile, failing with `ProfileExists` if the id is taken.
    async fn create(&self, profile: UserProfile) -> Result<UserProfile, CoreError>;

    /// Upsert, full replace.
    async fn put(&self, profile: &UserProfile) -> Result<(), CoreError>;

    async fn append_history(&self, entry: &MealHistoryEntry) -> Result<(), CoreError>;

    /// Persists the result of one aggregation step.
    async fn commit_update(
        &self,
        profile: &UserProfile,
        entry: &MealHistoryEntry,
    ) -> Result<(), CoreError> {
        self.put(profile).await?;
        self.append_history(entry).await
    }

    /// Most recent first.
    async fn list_recent_history(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<MealHistoryEntry>, CoreError>;

    async fn count_history(&self, user_id: &str) -> Result<u64, CoreError>;

    /// Removes the profile and all of its history in one step. Returns
    /// whether a profile existed.
    async fn delete(&self, user_id: &str) -> Result<bool, CoreError>;

    async fn close(&self) {}
}
