use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::analysis::WasteAnalysisRecord;
use crate::preferences::{MealHistoryEntry, UserProfile};

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub user_id: Option<String>,
    pub user_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePreferencesRequest {
    pub user_id: Option<String>,
    // validated by analysis::parse_analysis, not by serde
    pub waste_analysis: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub success: bool,
    pub user: UserProfile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MealAnalyzedResponse {
    pub success: bool,
    pub analysis: WasteAnalysisRecord,
    pub user: UserProfile,
}

#[derive(Debug, Serialize)]
pub struct RecentMeal {
    pub meal_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub waste_percentage: String,
}

impl From<&MealHistoryEntry> for RecentMeal {
    fn from(e: &MealHistoryEntry) -> Self {
        Self {
            meal_name: e.analysis.original_meal.name.clone(),
            timestamp: e.timestamp,
            waste_percentage: e.analysis.waste_summary.total_waste_percentage.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileSummary {
    pub user_id: String,
    pub user_name: Option<String>,
    pub liked_foods: Vec<String>,
    pub disliked_foods: Vec<String>,
    pub total_meals_analyzed: u64,
    pub average_waste_percentage: f64,
    pub history_count: u64,
    pub recent_meals: Vec<RecentMeal>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub success: bool,
    pub summary: ProfileSummary,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub success: bool,
    pub count: usize,
    pub history: Vec<MealHistoryEntry>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}
fn default_limit() -> usize { 10 }
