use serde::{Deserialize, Serialize};

use super::model::WasteAnalysisRecord;

#[derive(Debug, Deserialize)]
pub struct AnalyzeUrlRequest {
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub success: bool,
    pub analysis: WasteAnalysisRecord,
}
