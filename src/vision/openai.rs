use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::prompt::{parse_model_json, WASTE_PROMPT};
use super::{ImageSource, VisionClient};
use crate::config::VisionConfig;
use crate::error::CoreError;

/// Chat-completions client for OpenAI (or any compatible endpoint).
#[derive(Debug, Clone)]
pub struct OpenAiVision {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Part<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl OpenAiVision {
    pub fn new(config: &VisionConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }
}

#[async_trait]
impl VisionClient for OpenAiVision {
    async fn describe_waste(&self, image: &ImageSource) -> Result<serde_json::Value, CoreError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| CoreError::VisionUnavailable("OPENAI_API_KEY is not set".into()))?;

        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: vec![
                    Part::Text { text: WASTE_PROMPT },
                    Part::ImageUrl {
                        image_url: ImageUrl {
                            url: image.to_url(),
                        },
                    },
                ],
            }],
            max_tokens: self.max_tokens,
        };

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "vision request failed");
                CoreError::VisionUnavailable(format!("request failed: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(%status, %body, "vision api error");
            return Err(CoreError::VisionUnavailable(format!(
                "vision api returned {}",
                status
            )));
        }

        let chat: ChatResponse = response.json().await.map_err(|e| {
            error!(error = %e, "vision response unreadable");
            CoreError::VisionUnavailable(format!("unreadable response: {}", e))
        })?;

        let text = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| CoreError::VisionUnavailable("empty response from model".into()))?;
        debug!(chars = text.len(), model = %self.model, "vision answered");

        parse_model_json(&text)
    }
}
