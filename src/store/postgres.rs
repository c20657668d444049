use anyhow::Context;
use async_trait::async_trait;
use sqlx::{
    postgres::{PgArguments, PgPoolOptions},
    query::Query,
    types::Json,
    PgPool, Postgres,
};
use tracing::{debug, info};
use uuid::Uuid;

use super::rows::{HistoryRow, ProfileRow};
use super::ProfileStore;
use crate::error::CoreError;
use crate::preferences::{MealHistoryEntry, UserProfile};

const PROFILE_COLUMNS: &str = "user_id, user_name, liked_foods, disliked_foods, meal_count, \
     total_waste_percentage, created_at, updated_at";

/// PostgreSQL store: one row per profile, one row per analyzed meal.
#[derive(Clone)]
pub struct PgProfileStore {
    db: PgPool,
}

impl PgProfileStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("connect to database")?;
        Ok(Self { db })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.db)
            .await
            .context("run migrations")?;
        info!("migrations applied");
        Ok(())
    }
}

fn sorted(foods: &std::collections::BTreeSet<String>) -> Vec<String> {
    foods.iter().cloned().collect()
}

fn upsert_profile(p: &UserProfile) -> Query<'_, Postgres, PgArguments> {
    sqlx::query(
        r#"
        INSERT INTO user_profiles (user_id, user_name, liked_foods, disliked_foods,
                                   meal_count, total_waste_percentage, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (user_id) DO UPDATE
           SET user_name = EXCLUDED.user_name,
               liked_foods = EXCLUDED.liked_foods,
               disliked_foods = EXCLUDED.disliked_foods,
               meal_count = EXCLUDED.meal_count,
               total_waste_percentage = EXCLUDED.total_waste_percentage,
               created_at = EXCLUDED.created_at,
               updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(&p.user_id)
    .bind(&p.user_name)
    .bind(sorted(&p.liked_foods))
    .bind(sorted(&p.disliked_foods))
    .bind(p.meal_count as i64)
    .bind(p.total_waste_percentage)
    .bind(p.created_at)
    .bind(p.updated_at)
}

fn insert_history(e: &MealHistoryEntry) -> Query<'_, Postgres, PgArguments> {
    let a = &e.analysis;
    sqlx::query(
        r#"
        INSERT INTO meal_history (id, user_id, created_at, original_meal, thrown_away,
                                  eaten, food_preferences, waste_summary)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&e.user_id)
    .bind(e.timestamp)
    .bind(Json(&a.original_meal))
    .bind(Json(&a.thrown_away))
    .bind(Json(&a.eaten))
    .bind(Json(&a.food_preferences))
    .bind(Json(&a.waste_summary))
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn get(&self, user_id: &str) -> Result<Option<UserProfile>, CoreError> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {} FROM user_profiles WHERE user_id = $1",
            PROFILE_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(UserProfile::from))
    }

    async fn create(&self, profile: UserProfile) -> Result<UserProfile, CoreError> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            r#"
            INSERT INTO user_profiles (user_id, user_name, liked_foods, disliked_foods,
                                       meal_count, total_waste_percentage, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (user_id) DO NOTHING
            RETURNING {}
            "#,
            PROFILE_COLUMNS
        ))
        .bind(&profile.user_id)
        .bind(&profile.user_name)
        .bind(sorted(&profile.liked_foods))
        .bind(sorted(&profile.disliked_foods))
        .bind(profile.meal_count as i64)
        .bind(profile.total_waste_percentage)
        .bind(profile.created_at)
        .bind(profile.updated_at)
        .fetch_optional(&self.db)
        .await?;
        row.map(UserProfile::from)
            .ok_or(CoreError::ProfileExists(profile.user_id))
    }

    async fn put(&self, profile: &UserProfile) -> Result<(), CoreError> {
        upsert_profile(profile).execute(&self.db).await?;
        Ok(())
    }

    async fn append_history(&self, entry: &MealHistoryEntry) -> Result<(), CoreError> {
        insert_history(entry).execute(&self.db).await?;
        Ok(())
    }

    async fn commit_update(
        &self,
        profile: &UserProfile,
        entry: &MealHistoryEntry,
    ) -> Result<(), CoreError> {
        let mut tx = self.db.begin().await?;
        upsert_profile(profile).execute(&mut *tx).await?;
        insert_history(entry).execute(&mut *tx).await?;
        tx.commit().await?;
        debug!(user_id = %profile.user_id, meal_count = profile.meal_count, "profile committed");
        Ok(())
    }

    async fn list_recent_history(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<MealHistoryEntry>, CoreError> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT id, user_id, created_at, original_meal, thrown_away,
                   eaten, food_preferences, waste_summary
              FROM meal_history
             WHERE user_id = $1
             ORDER BY created_at DESC, seq DESC
             LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(MealHistoryEntry::from).collect())
    }

    async fn count_history(&self, user_id: &str) -> Result<u64, CoreError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM meal_history WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.db)
                .await?;
        Ok(count.max(0) as u64)
    }

    async fn delete(&self, user_id: &str) -> Result<bool, CoreError> {
        let mut tx = self.db.begin().await?;
        sqlx::query("DELETE FROM meal_history WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        let removed = sqlx::query("DELETE FROM user_profiles WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;
        Ok(removed > 0)
    }

    async fn close(&self) {
        self.db.close().await;
    }
}
