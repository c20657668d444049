use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::analysis::WasteAnalysisRecord;

/// Running per-user record of food preferences and waste statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub user_name: Option<String>,
    pub liked_foods: BTreeSet<String>,
    pub disliked_foods: BTreeSet<String>,
    pub meal_count: u64,
    /// Mean of every folded-in meal's waste percentage, 2dp.
    pub total_waste_percentage: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl UserProfile {
    pub fn new(user_id: impl Into<String>, user_name: Option<String>, now: OffsetDateTime) -> Self {
        Self {
            user_id: user_id.into(),
            user_name,
            liked_foods: BTreeSet::new(),
            disliked_foods: BTreeSet::new(),
            meal_count: 0,
            total_waste_percentage: 0.0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One analyzed meal, kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealHistoryEntry {
    pub user_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    #[serde(flatten)]
    pub analysis: WasteAnalysisRecord,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn new_profile_starts_empty() {
        let now = datetime!(2024-05-01 12:00 UTC);
        let p = UserProfile::new("user123", Some("Ada".into()), now);
        assert_eq!(p.meal_count, 0);
        assert_eq!(p.total_waste_percentage, 0.0);
        assert!(p.liked_foods.is_empty() && p.disliked_foods.is_empty());
        assert_eq!(p.created_at, p.updated_at);
    }

    #[test]
    fn food_sets_serialize_sorted() {
        let mut p = UserProfile::new("u", None, datetime!(2024-05-01 12:00 UTC));
        p.liked_foods.insert("rice".into());
        p.liked_foods.insert("apple".into());
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["liked_foods"], serde_json::json!(["apple", "rice"]));
        assert_eq!(json["created_at"], "2024-05-01T12:00:00Z");
    }
}
