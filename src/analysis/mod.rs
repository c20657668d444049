mod dto;
pub mod handlers;
mod model;
mod validate;

use crate::state::AppState;
use axum::Router;

pub use dto::AnalysisResponse;
pub use model::{
    FoodPortion, FoodPreferences, OriginalMeal, WasteAnalysisRecord, WasteLevel, WasteSummary,
};
pub use validate::{parse_analysis, parse_percentage};

pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    handlers::analyze_routes(max_upload_bytes)
}
