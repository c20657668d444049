use crate::error::CoreError;

pub const WASTE_PROMPT: &str = r#"Analyze this image of unfinished food carefully.

Your task is to:
1. Identify what the ORIGINAL meal was before eating
2. Identify what food was THROWN AWAY (left on plate/uneaten)
3. Estimate what food was EATEN (consumed/missing from original meal)
4. Infer food preferences based on what was eaten vs thrown away

Return your response ONLY as a JSON object with this EXACT structure:
{
    "original_meal": {
        "name": "name of the dish/meal",
        "description": "brief description of what the meal originally was"
    },
    "thrown_away": [
        {
            "item": "food item name",
            "quantity": "estimated quantity (e.g., '1/2 cup', '3 pieces')",
            "percentage_of_original": "estimated percentage left uneaten, formatted like '30%'"
        }
    ],
    "eaten": [
        {
            "item": "food item name",
            "quantity": "estimated quantity consumed",
            "percentage_of_original": "estimated percentage that was eaten, formatted like '70%'"
        }
    ],
    "food_preferences": {
        "likely_dislikes": ["foods they seem to dislike based on what was thrown away"],
        "likely_likes": ["foods they seem to like based on what was eaten"],
        "insights": "brief insight about their eating preferences"
    },
    "waste_summary": {
        "total_waste_percentage": "overall waste percentage, formatted like '35%'",
        "waste_value": "low, medium or high"
    }
}

Return ONLY the JSON object, no other text or markdown."#;

/// Drops a surrounding markdown code fence, if the model added one.
pub fn strip_code_fences(text: &str) -> &str {
    let mut t = text.trim();
    if let Some(rest) = t.strip_prefix("```json") {
        t = rest;
    } else if let Some(rest) = t.strip_prefix("```") {
        t = rest;
    }
    if let Some(rest) = t.strip_suffix("```") {
        t = rest;
    }
    t.trim()
}

pub fn parse_model_json(text: &str) -> Result<serde_json::Value, CoreError> {
    serde_json::from_str(strip_code_fences(text)).map_err(|e| {
        CoreError::VisionUnavailable(format!("model did not answer with JSON: {}", e))
    })
}
