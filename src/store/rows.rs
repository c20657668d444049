use sqlx::{types::Json, FromRow};
use time::OffsetDateTime;

use crate::analysis::{FoodPortion, FoodPreferences, OriginalMeal, WasteAnalysisRecord, WasteSummary};
use crate::preferences::{MealHistoryEntry, UserProfile};

#[derive(Debug, FromRow)]
pub struct ProfileRow {
    pub user_id: String,
    pub user_name: Option<String>,
    pub liked_foods: Vec<String>,
    pub disliked_foods: Vec<String>,
    pub meal_count: i64,
    pub total_waste_percentage: f64,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl From<ProfileRow> for UserProfile {
    fn from(r: ProfileRow) -> Self {
        Self {
            user_id: r.user_id,
            user_name: r.user_name,
            liked_foods: r.liked_foods.into_iter().collect(),
            disliked_foods: r.disliked_foods.into_iter().collect(),
            meal_count: r.meal_count.max(0) as u64,
            total_waste_percentage: r.total_waste_percentage,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

// `id` is selected but never leaves the store.
#[derive(Debug, FromRow)]
pub struct HistoryRow {
    #[allow(dead_code)]
    pub id: uuid::Uuid,
    pub user_id: String,
    pub created_at: OffsetDateTime,
    pub original_meal: Json<OriginalMeal>,
    pub thrown_away: Json<Vec<FoodPortion>>,
    pub eaten: Json<Vec<FoodPortion>>,
    pub food_preferences: Json<FoodPreferences>,
    pub waste_summary: Json<WasteSummary>,
}

impl From<HistoryRow> for MealHistoryEntry {
    fn from(r: HistoryRow) -> Self {
        Self {
            user_id: r.user_id,
            timestamp: r.created_at,
            analysis: WasteAnalysisRecord {
                original_meal: r.original_meal.0,
                thrown_away: r.thrown_away.0,
                eaten: r.eaten.0,
                food_preferences: r.food_preferences.0,
                waste_summary: r.waste_summary.0,
            },
        }
    }
}
