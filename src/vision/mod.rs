use async_trait::async_trait;
use bytes::Bytes;
use tracing::instrument;

use crate::analysis::{parse_analysis, WasteAnalysisRecord};
use crate::error::CoreError;

mod openai;
mod prompt;

pub use openai::OpenAiVision;

/// Where the meal photo comes from.
#[derive(Debug, Clone)]
pub enum ImageSource {
    Bytes { body: Bytes, content_type: String },
    Url(String),
}

impl ImageSource {
    /// URL form accepted by the chat-completions `image_url` part.
    pub fn to_url(&self) -> String {
        use base64::{engine::general_purpose, Engine as _};
        match self {
            ImageSource::Bytes { body, content_type } => format!(
                "data:{};base64,{}",
                content_type,
                general_purpose::STANDARD.encode(body)
            ),
            ImageSource::Url(url) => url.clone(),
        }
    }
}

/// Vision model that looks at a meal photo and answers with analysis JSON.
/// The JSON is untrusted; see [`analyze_image`].
#[async_trait]
pub trait VisionClient: Send + Sync {
    async fn describe_waste(&self, image: &ImageSource) -> Result<serde_json::Value, CoreError>;
}

/// Runs the vision model and validates its answer.
#[instrument(skip(vision, image))]
pub async fn analyze_image(
    vision: &dyn VisionClient,
    image: &ImageSource,
) -> Result<WasteAnalysisRecord, CoreError> {
    let raw = vision.describe_waste(image).await?;
    parse_analysis(raw)
}
