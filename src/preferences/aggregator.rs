use std::collections::HashSet;

use time::OffsetDateTime;

use super::profile::{MealHistoryEntry, UserProfile};
use crate::analysis::{parse_percentage, WasteAnalysisRecord};
use crate::error::CoreError;

/// Lower-cases and trims a food name; empty names are dropped.
pub fn normalize_food_name(name: &str) -> Option<String> {
    let n = name.trim().to_lowercase();
    (!n.is_empty()).then_some(n)
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Folds one analysis into a profile.
///
/// `profile == None` starts from an empty profile for `user_id`. The input is
/// never touched; the caller persists both returned values.
pub fn apply(
    user_id: &str,
    profile: Option<&UserProfile>,
    analysis: &WasteAnalysisRecord,
    now: OffsetDateTime,
) -> Result<(UserProfile, MealHistoryEntry), CoreError> {
    let waste = parse_percentage(&analysis.waste_summary.total_waste_percentage)?;

    let mut next = match profile {
        Some(p) => {
            debug_assert_eq!(p.user_id, user_id);
            p.clone()
        }
        None => UserProfile::new(user_id, None, now),
    };

    let prefs = &analysis.food_preferences;
    let likes: Vec<String> = prefs
        .likely_likes
        .iter()
        .filter_map(|f| normalize_food_name(f))
        .collect();
    let liked_now: HashSet<&str> = likes.iter().map(String::as_str).collect();

    for food in &likes {
        if !next.liked_foods.contains(food) {
            next.disliked_foods.remove(food);
            next.liked_foods.insert(food.clone());
        }
    }

    // A name liked in this same analysis keeps its like.
    for food in prefs
        .likely_dislikes
        .iter()
        .filter_map(|f| normalize_food_name(f))
    {
        if liked_now.contains(food.as_str()) {
            continue;
        }
        if !next.disliked_foods.contains(&food) {
            next.liked_foods.remove(&food);
            next.disliked_foods.insert(food);
        }
    }

    let n = next.meal_count as f64;
    next.total_waste_percentage = round2((next.total_waste_percentage * n + waste) / (n + 1.0));
    next.meal_count += 1;
    next.updated_at = now;

    let entry = MealHistoryEntry {
        user_id: user_id.to_string(),
        timestamp: now,
        analysis: analysis.clone(),
    };

    Ok((next, entry))
}
