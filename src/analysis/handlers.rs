use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::{info, instrument, warn};

use super::dto::{AnalysisResponse, AnalyzeUrlRequest};
use crate::{
    error::reject,
    state::AppState,
    vision::{analyze_image, ImageSource},
};

pub fn analyze_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/analyze/image", post(analyze_upload))
        .route("/analyze/url", post(analyze_url))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

/// Pulls the `file` part out of a multipart body.
pub(crate) async fn read_upload(mp: &mut Multipart) -> Result<ImageSource, (StatusCode, String)> {
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "image/jpeg".into());
        let body = field
            .bytes()
            .await
            .map_err(|e| (StatusCode::BAD_REQUEST, format!("failed to read file: {}", e)))?;
        if body.is_empty() {
            warn!("empty upload");
            return Err((StatusCode::BAD_REQUEST, "file is empty".into()));
        }
        return Ok(ImageSource::Bytes { body, content_type });
    }
    Err((StatusCode::BAD_REQUEST, "file is required".into()))
}

/// POST /analyze/image (multipart, field `file`)
#[instrument(skip(state, mp))]
pub async fn analyze_upload(
    State(state): State<AppState>,
    mut mp: Multipart,
) -> Result<Json<AnalysisResponse>, (StatusCode, String)> {
    let image = read_upload(&mut mp).await?;
    let analysis = analyze_image(state.vision.as_ref(), &image)
        .await
        .map_err(reject)?;
    info!(meal = %analysis.original_meal.name, "image analyzed");
    Ok(Json(AnalysisResponse {
        success: true,
        analysis,
    }))
}

/// POST /analyze/url { image_url }
#[instrument(skip(state, body))]
pub async fn analyze_url(
    State(state): State<AppState>,
    Json(body): Json<AnalyzeUrlRequest>,
) -> Result<Json<AnalysisResponse>, (StatusCode, String)> {
    let url = body
        .image_url
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .ok_or((StatusCode::BAD_REQUEST, "image_url is required".to_string()))?;
    let analysis = analyze_image(state.vision.as_ref(), &ImageSource::Url(url))
        .await
        .map_err(reject)?;
    info!(meal = %analysis.original_meal.name, "url analyzed");
    Ok(Json(AnalysisResponse {
        success: true,
        analysis,
    }))
}
