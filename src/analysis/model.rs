use serde::{Deserialize, Serialize};

/// What the plate held before anyone ate from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OriginalMeal {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodPortion {
    pub item: String,
    pub quantity: String,
    pub percentage_of_original: String, // "<number>%"
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodPreferences {
    pub likely_dislikes: Vec<String>,
    pub likely_likes: Vec<String>,
    pub insights: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WasteLevel {
    Low,
    Medium,
    High,
}

impl WasteLevel {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WasteSummary {
    pub total_waste_percentage: String, // "<number>%"
    pub waste_value: WasteLevel,
}

/// Validated result of analyzing one meal photo.
///
/// Only built through `TryFrom<RawWasteAnalysis>`, so every percentage in
/// here is known to parse and every nested section is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WasteAnalysisRecord {
    pub original_meal: OriginalMeal,
    pub thrown_away: Vec<FoodPortion>,
    pub eaten: Vec<FoodPortion>,
    pub food_preferences: FoodPreferences,
    pub waste_summary: WasteSummary,
}
