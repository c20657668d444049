use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

use super::model::{
    FoodPortion, FoodPreferences, OriginalMeal, WasteAnalysisRecord, WasteLevel, WasteSummary,
};
use crate::error::CoreError;

// Mirror of the analysis JSON with every field optional, so a missing
// section is reported by path instead of as a serde error.

#[derive(Debug, Default, Deserialize)]
pub struct RawWasteAnalysis {
    pub original_meal: Option<RawOriginalMeal>,
    pub thrown_away: Option<Vec<RawFoodPortion>>,
    pub eaten: Option<Vec<RawFoodPortion>>,
    pub food_preferences: Option<RawFoodPreferences>,
    pub waste_summary: Option<RawWasteSummary>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawOriginalMeal {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawFoodPortion {
    pub item: Option<String>,
    pub quantity: Option<String>,
    pub percentage_of_original: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawFoodPreferences {
    pub likely_dislikes: Option<Vec<String>>,
    pub likely_likes: Option<Vec<String>>,
    pub insights: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawWasteSummary {
    pub total_waste_percentage: Option<String>,
    pub waste_value: Option<String>,
}

/// Parses `"<number>%"` into a value in `[0, 100]`.
pub fn parse_percentage(raw: &str) -> Result<f64, CoreError> {
    lazy_static! {
        static ref PERCENT_RE: Regex = Regex::new(r"^\s*(\d+(?:\.\d+)?)\s*%\s*$").unwrap();
    }
    let caps = PERCENT_RE
        .captures(raw)
        .ok_or_else(|| CoreError::malformed(format!("{:?} is not a percentage", raw)))?;
    let value: f64 = caps[1]
        .parse()
        .map_err(|_| CoreError::malformed(format!("{:?} is not a percentage", raw)))?;
    if !(0.0..=100.0).contains(&value) {
        return Err(CoreError::malformed(format!(
            "{:?} is outside 0%..100%",
            raw
        )));
    }
    Ok(value)
}

/// Entry point for untrusted JSON, from the vision model or a client.
pub fn parse_analysis(value: serde_json::Value) -> Result<WasteAnalysisRecord, CoreError> {
    let raw: RawWasteAnalysis = serde_json::from_value(value)
        .map_err(|e| CoreError::malformed(format!("unexpected analysis shape: {}", e)))?;
    WasteAnalysisRecord::try_from(raw)
}

fn check_percentage(raw: &str, path: &str) -> Result<(), CoreError> {
    parse_percentage(raw).map(|_| ()).map_err(|e| match e {
        CoreError::MalformedAnalysis(msg) => CoreError::malformed(format!("{}: {}", path, msg)),
        other => other,
    })
}

fn required<T>(field: Option<T>, path: &str) -> Result<T, CoreError> {
    field.ok_or_else(|| CoreError::malformed(format!("missing field `{}`", path)))
}

fn portions(raw: Option<Vec<RawFoodPortion>>, path: &str) -> Result<Vec<FoodPortion>, CoreError> {
    required(raw, path)?
        .into_iter()
        .enumerate()
        .map(|(i, p)| {
            let at = format!("{}[{}]", path, i);
            let percentage_of_original = required(
                p.percentage_of_original,
                &format!("{}.percentage_of_original", at),
            )?;
            check_percentage(&percentage_of_original, &at)?;
            Ok(FoodPortion {
                item: required(p.item, &format!("{}.item", at))?,
                quantity: p.quantity.unwrap_or_default(),
                percentage_of_original,
            })
        })
        .collect()
}

impl TryFrom<RawWasteAnalysis> for WasteAnalysisRecord {
    type Error = CoreError;

    fn try_from(raw: RawWasteAnalysis) -> Result<Self, Self::Error> {
        let meal = required(raw.original_meal, "original_meal")?;
        let original_meal = OriginalMeal {
            name: required(meal.name, "original_meal.name")?,
            description: meal.description.unwrap_or_default(),
        };

        let thrown_away = portions(raw.thrown_away, "thrown_away")?;
        let eaten = portions(raw.eaten, "eaten")?;

        let prefs = required(raw.food_preferences, "food_preferences")?;
        let food_preferences = FoodPreferences {
            likely_dislikes: prefs.likely_dislikes.unwrap_or_default(),
            likely_likes: prefs.likely_likes.unwrap_or_default(),
            insights: prefs.insights.unwrap_or_default(),
        };

        let summary = required(raw.waste_summary, "waste_summary")?;
        let total_waste_percentage = required(
            summary.total_waste_percentage,
            "waste_summary.total_waste_percentage",
        )?;
        check_percentage(&total_waste_percentage, "waste_summary.total_waste_percentage")?;
        let waste_value = required(summary.waste_value, "waste_summary.waste_value")?;
        let waste_value = WasteLevel::parse(&waste_value).ok_or_else(|| {
            CoreError::malformed(format!(
                "waste_summary.waste_value {:?} is not low/medium/high",
                waste_value
            ))
        })?;

        Ok(Self {
            original_meal,
            thrown_away,
            eaten,
            food_preferences,
            waste_summary: WasteSummary {
                total_waste_percentage,
                waste_value,
            },
        })
    }
}
