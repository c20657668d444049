use time::OffsetDateTime;
use tracing::{debug, info, instrument};

use super::dto::{ProfileSummary, RecentMeal};
use crate::analysis::WasteAnalysisRecord;
use crate::error::CoreError;
use crate::preferences::{self, MealHistoryEntry, UserProfile};
use crate::state::AppState;
use crate::vision::{analyze_image, ImageSource};

pub const RECENT_MEALS: usize = 5;
pub const MAX_HISTORY_LIMIT: usize = 100;

#[instrument(skip(st))]
pub async fn create_profile(
    st: &AppState,
    user_id: &str,
    user_name: Option<String>,
) -> Result<UserProfile, CoreError> {
    let _guard = st.locks.lock(user_id).await;
    let profile = st
        .store
        .create(UserProfile::new(user_id, user_name, OffsetDateTime::now_utc()))
        .await?;
    info!(%user_id, "profile created");
    Ok(profile)
}

/// Folds one validated analysis into the user's profile, creating the
/// profile if this is the user's first meal.
#[instrument(skip(st, analysis), fields(meal = %analysis.original_meal.name))]
pub async fn update_preferences(
    st: &AppState,
    user_id: &str,
    analysis: &WasteAnalysisRecord,
) -> Result<UserProfile, CoreError> {
    let _guard = st.locks.lock(user_id).await;

    let current = st.store.get(user_id).await?;
    if current.is_none() {
        debug!(%user_id, "no profile yet; starting a fresh one");
    }
    let (profile, entry) = preferences::apply(
        user_id,
        current.as_ref(),
        analysis,
        OffsetDateTime::now_utc(),
    )?;
    st.store.commit_update(&profile, &entry).await?;

    info!(
        %user_id,
        meal_count = profile.meal_count,
        average_waste = profile.total_waste_percentage,
        "preferences updated"
    );
    Ok(profile)
}

/// Photo to updated profile. The vision call runs before the user lock is
/// taken so a slow model never blocks other updates for the same user.
#[instrument(skip(st, image))]
pub async fn analyze_meal(
    st: &AppState,
    user_id: &str,
    image: &ImageSource,
) -> Result<(WasteAnalysisRecord, UserProfile), CoreError> {
    let analysis = analyze_image(st.vision.as_ref(), image).await?;
    let profile = update_preferences(st, user_id, &analysis).await?;
    Ok((analysis, profile))
}

pub async fn get_profile(st: &AppState, user_id: &str) -> Result<UserProfile, CoreError> {
    st.store
        .get(user_id)
        .await?
        .ok_or_else(|| CoreError::ProfileNotFound(user_id.to_string()))
}

#[instrument(skip(st))]
pub async fn profile_summary(st: &AppState, user_id: &str) -> Result<ProfileSummary, CoreError> {
    let profile = get_profile(st, user_id).await?;
    let history_count = st.store.count_history(user_id).await?;
    let recent = st.store.list_recent_history(user_id, RECENT_MEALS).await?;

    Ok(ProfileSummary {
        user_id: profile.user_id,
        user_name: profile.user_name,
        liked_foods: profile.liked_foods.into_iter().collect(),
        disliked_foods: profile.disliked_foods.into_iter().collect(),
        total_meals_analyzed: profile.meal_count,
        average_waste_percentage: profile.total_waste_percentage,
        history_count,
        recent_meals: recent.iter().map(RecentMeal::from).collect(),
        created_at: profile.created_at,
        updated_at: profile.updated_at,
    })
}

/// Unknown users have an empty history rather than a 404.
pub async fn meal_history(
    st: &AppState,
    user_id: &str,
    limit: usize,
) -> Result<Vec<MealHistoryEntry>, CoreError> {
    let limit = limit.clamp(1, MAX_HISTORY_LIMIT);
    st.store.list_recent_history(user_id, limit).await
}

#[instrument(skip(st))]
pub async fn delete_profile(st: &AppState, user_id: &str) -> Result<(), CoreError> {
    let _guard = st.locks.lock(user_id).await;
    if !st.store.delete(user_id).await? {
        return Err(CoreError::ProfileNotFound(user_id.to_string()));
    }
    info!(%user_id, "profile deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{parse_analysis, tests::loaded_fries};
    use crate::store::ProfileStore;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::BTreeSet;
    use std::sync::Arc;

    fn analysis(likes: &[&str], dislikes: &[&str], waste: &str) -> WasteAnalysisRecord {
        let mut v = loaded_fries();
        v["food_preferences"]["likely_likes"] = json!(likes);
        v["food_preferences"]["likely_dislikes"] = json!(dislikes);
        v["waste_summary"]["total_waste_percentage"] = json!(waste);
        parse_analysis(v).unwrap()
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn update_creates_profile_lazily_and_records_history() {
        let st = AppState::fake(loaded_fries());
        let p = update_preferences(&st, "user123", &analysis(&["fries"], &["toppings"], "35%"))
            .await
            .unwrap();
        assert_eq!(p.meal_count, 1);
        assert_eq!(p.total_waste_percentage, 35.0);

        let stored = st.store.get("user123").await.unwrap().unwrap();
        assert_eq!(stored, p);
        assert_eq!(st.store.count_history("user123").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn rice_scenario_end_to_end() {
        let st = AppState::fake(loaded_fries());
        update_preferences(&st, "u", &analysis(&["rice"], &[], "20%"))
            .await
            .unwrap();
        let p = update_preferences(&st, "u", &analysis(&[], &["rice"], "40%"))
            .await
            .unwrap();
        assert_eq!(p.meal_count, 2);
        assert_eq!(p.total_waste_percentage, 30.0);
        assert!(p.liked_foods.is_empty());
        assert_eq!(p.disliked_foods, set(&["rice"]));
    }

    #[tokio::test]
    async fn malformed_analysis_leaves_profile_unchanged() {
        let st = AppState::fake(loaded_fries());
        let before = update_preferences(&st, "u", &analysis(&["rice"], &[], "20%"))
            .await
            .unwrap();

        let mut v = loaded_fries();
        v["waste_summary"]["total_waste_percentage"] = json!("high");
        assert!(matches!(parse_analysis(v), Err(CoreError::MalformedAnalysis(_))));

        // a record that slipped past the boundary is still refused
        let mut sneaky = analysis(&["kale"], &[], "20%");
        sneaky.waste_summary.total_waste_percentage = "high".into();
        let err = update_preferences(&st, "u", &sneaky).await.unwrap_err();
        assert!(matches!(err, CoreError::MalformedAnalysis(_)));

        assert_eq!(st.store.get("u").await.unwrap().unwrap(), before);
        assert_eq!(st.store.count_history("u").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn concurrent_updates_for_one_user_are_not_lost() {
        let st = AppState::fake(loaded_fries());
        let mut tasks = Vec::new();
        for i in 0..20 {
            let st = st.clone();
            tasks.push(tokio::spawn(async move {
                let food = format!("food{}", i);
                update_preferences(&st, "busy", &analysis(&[food.as_str()], &[], "50%"))
                    .await
                    .unwrap();
            }));
        }
        for t in tasks {
            t.await.unwrap();
        }
        let p = get_profile(&st, "busy").await.unwrap();
        assert_eq!(p.meal_count, 20);
        assert_eq!(p.liked_foods.len(), 20);
        assert_eq!(p.total_waste_percentage, 50.0);
        assert_eq!(st.store.count_history("busy").await.unwrap(), 20);
    }

    #[tokio::test]
    async fn analyze_meal_runs_vision_then_updates() {
        let st = AppState::fake(loaded_fries());
        let (a, p) = analyze_meal(&st, "u", &ImageSource::Url("https://x/p.jpg".into()))
            .await
            .unwrap();
        assert_eq!(a.original_meal.name, "Loaded Fries");
        assert_eq!(p.liked_foods, set(&["fries"]));
        assert_eq!(p.disliked_foods, set(&["toppings"]));
    }

    #[tokio::test]
    async fn create_get_summary_delete() {
        let st = AppState::fake(loaded_fries());
        let created = create_profile(&st, "u", Some("Ada".into())).await.unwrap();
        assert_eq!(created.user_name.as_deref(), Some("Ada"));
        assert!(matches!(
            create_profile(&st, "u", None).await,
            Err(CoreError::ProfileExists(_))
        ));

        for waste in ["10%", "20%", "30%", "40%", "50%", "60%"] {
            update_preferences(&st, "u", &analysis(&[], &[], waste))
                .await
                .unwrap();
        }
        let summary = profile_summary(&st, "u").await.unwrap();
        assert_eq!(summary.user_name.as_deref(), Some("Ada"));
        assert_eq!(summary.total_meals_analyzed, 6);
        assert_eq!(summary.history_count, 6);
        assert_eq!(summary.recent_meals.len(), RECENT_MEALS);
        assert_eq!(summary.average_waste_percentage, 35.0);
        assert_eq!(summary.created_at, created.created_at);

        delete_profile(&st, "u").await.unwrap();
        assert!(matches!(
            get_profile(&st, "u").await,
            Err(CoreError::ProfileNotFound(_))
        ));
        assert!(meal_history(&st, "u", 10).await.unwrap().is_empty());
        assert!(matches!(
            delete_profile(&st, "u").await,
            Err(CoreError::ProfileNotFound(_))
        ));
    }

    #[tokio::test]
    async fn history_limit_is_clamped() {
        let st = AppState::fake(loaded_fries());
        for _ in 0..3 {
            update_preferences(&st, "u", &analysis(&[], &[], "5%"))
                .await
                .unwrap();
        }
        assert_eq!(meal_history(&st, "u", 0).await.unwrap().len(), 1);
        assert_eq!(meal_history(&st, "u", 10_000).await.unwrap().len(), 3);
        assert!(meal_history(&st, "nobody", 10).await.unwrap().is_empty());
    }

    struct DownStore;

    #[async_trait]
    impl ProfileStore for DownStore {
        async fn get(&self, _: &str) -> Result<Option<UserProfile>, CoreError> {
            Err(CoreError::StoreUnavailable("connection refused".into()))
        }
        async fn create(&self, _: UserProfile) -> Result<UserProfile, CoreError> {
            Err(CoreError::StoreUnavailable("connection refused".into()))
        }
        async fn put(&self, _: &UserProfile) -> Result<(), CoreError> {
            Err(CoreError::StoreUnavailable("connection refused".into()))
        }
        async fn append_history(&self, _: &MealHistoryEntry) -> Result<(), CoreError> {
            Err(CoreError::StoreUnavailable("connection refused".into()))
        }
        async fn list_recent_history(
            &self,
            _: &str,
            _: usize,
        ) -> Result<Vec<MealHistoryEntry>, CoreError> {
            Err(CoreError::StoreUnavailable("connection refused".into()))
        }
        async fn count_history(&self, _: &str) -> Result<u64, CoreError> {
            Err(CoreError::StoreUnavailable("connection refused".into()))
        }
        async fn delete(&self, _: &str) -> Result<bool, CoreError> {
            Err(CoreError::StoreUnavailable("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn store_failures_propagate_unchanged() {
        let fake = AppState::fake(loaded_fries());
        let st = AppState::from_parts(fake.config.clone(), Arc::new(DownStore), fake.vision.clone());
        let err = update_preferences(&st, "u", &analysis(&[], &[], "5%"))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::StoreUnavailable(msg) if msg == "connection refused"));
    }
}
