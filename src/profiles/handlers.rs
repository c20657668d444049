use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};

use super::dto::{
    CreateUserRequest, HistoryQuery, HistoryResponse, MealAnalyzedResponse, MessageResponse,
    SummaryResponse, UpdatePreferencesRequest, UserResponse,
};
use super::services;
use crate::{
    analysis::{handlers::read_upload, parse_analysis},
    error::reject,
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/user/:user_id", get(get_user).delete(delete_user))
        .route("/user/:user_id/summary", get(get_summary))
        .route("/user/:user_id/history", get(get_history))
}

pub fn write_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/user/create", post(create_user))
        .route("/user/preferences/update", post(update_preferences))
        .route(
            "/user/:user_id/meals",
            post(analyze_meal).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
}

fn user_id_from(raw: Option<String>) -> Result<String, (StatusCode, String)> {
    raw.map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            warn!("missing user_id");
            (StatusCode::BAD_REQUEST, "user_id is required".to_string())
        })
}

// --- handlers ---

/// POST /user/create { user_id, user_name? }
#[instrument(skip(state, body))]
pub async fn create_user(
    State(state): State<AppState>,
    Json(body): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), (StatusCode, String)> {
    let user_id = user_id_from(body.user_id)?;
    let user = services::create_profile(&state, &user_id, body.user_name)
        .await
        .map_err(reject)?;
    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            success: true,
            user,
            message: Some("User created successfully".into()),
        }),
    ))
}

/// POST /user/preferences/update { user_id, waste_analysis }
#[instrument(skip(state, body))]
pub async fn update_preferences(
    State(state): State<AppState>,
    Json(body): Json<UpdatePreferencesRequest>,
) -> Result<Json<UserResponse>, (StatusCode, String)> {
    let user_id = user_id_from(body.user_id)?;
    let raw = body
        .waste_analysis
        .filter(|v| !v.is_null())
        .ok_or((StatusCode::BAD_REQUEST, "waste_analysis is required".to_string()))?;
    let analysis = parse_analysis(raw).map_err(reject)?;

    let user = services::update_preferences(&state, &user_id, &analysis)
        .await
        .map_err(reject)?;
    Ok(Json(UserResponse {
        success: true,
        user,
        message: Some("Preferences updated successfully".into()),
    }))
}

/// POST /user/:user_id/meals (multipart, field `file`)
#[instrument(skip(state, mp))]
pub async fn analyze_meal(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    mut mp: Multipart,
) -> Result<Json<MealAnalyzedResponse>, (StatusCode, String)> {
    let user_id = user_id_from(Some(user_id))?;
    let image = read_upload(&mut mp).await?;
    let (analysis, user) = services::analyze_meal(&state, &user_id, &image)
        .await
        .map_err(reject)?;
    Ok(Json(MealAnalyzedResponse {
        success: true,
        analysis,
        user,
    }))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserResponse>, (StatusCode, String)> {
    let user = services::get_profile(&state, &user_id)
        .await
        .map_err(reject)?;
    Ok(Json(UserResponse {
        success: true,
        user,
        message: None,
    }))
}

#[instrument(skip(state))]
pub async fn get_summary(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<SummaryResponse>, (StatusCode, String)> {
    let summary = services::profile_summary(&state, &user_id)
        .await
        .map_err(reject)?;
    Ok(Json(SummaryResponse {
        success: true,
        summary,
    }))
}

/// GET /user/:user_id/history?limit=N
#[instrument(skip(state))]
pub async fn get_history(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(q): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, (StatusCode, String)> {
    let history = services::meal_history(&state, &user_id, q.limit)
        .await
        .map_err(reject)?;
    Ok(Json(HistoryResponse {
        success: true,
        count: history.len(),
        history,
    }))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    services::delete_profile(&state, &user_id)
        .await
        .map_err(reject)?;
    Ok(Json(MessageResponse {
        success: true,
        message: "User deleted successfully".into(),
    }))
}
