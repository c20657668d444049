use std::net::SocketAddr;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::{analysis, profiles};

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub fn build_app(state: AppState) -> Router {
    let max_upload = state.config.max_upload_bytes;
    Router::new()
        .nest(
            "/api",
            Router::new()
                .merge(analysis::router(max_upload))
                .merge(profiles::router(max_upload))
                .route("/health", get(health)),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router, state: AppState) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.shutdown().await;
    tracing::info!("store closed; bye");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tests::loaded_fries;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    async fn call(app: Router, req: Request<Body>) -> (StatusCode, Value) {
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    fn multipart(uri: &str, field: &str, data: &[u8]) -> Request<Body> {
        let boundary = "XBOUNDARYX";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{b}\r\nContent-Disposition: form-data; name=\"{f}\"; filename=\"plate.jpg\"\r\nContent-Type: image/jpeg\r\n\r\n",
                b = boundary,
                f = field
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
        Request::post(uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let app = build_app(AppState::fake(loaded_fries()));
        let (status, body) = call(app, get("/api/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn create_then_conflict() {
        let state = AppState::fake(loaded_fries());
        let req = || post_json("/api/user/create", json!({"user_id": "user123", "user_name": "Ada"}));

        let (status, body) = call(build_app(state.clone()), req()).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["user"]["user_id"], "user123");
        assert_eq!(body["user"]["meal_count"], 0);

        let (status, _) = call(build_app(state), req()).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn create_requires_user_id() {
        let app = build_app(AppState::fake(loaded_fries()));
        let (status, _) = call(app, post_json("/api/user/create", json!({"user_id": "  "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn update_then_read_back() {
        let state = AppState::fake(loaded_fries());
        let (status, body) = call(
            build_app(state.clone()),
            post_json(
                "/api/user/preferences/update",
                json!({"user_id": "user123", "waste_analysis": loaded_fries()}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["liked_foods"], json!(["fries"]));
        assert_eq!(body["user"]["disliked_foods"], json!(["toppings"]));
        assert_eq!(body["user"]["total_waste_percentage"], 35.0);
        assert!(body["user"].get("_id").is_none());

        let (status, body) = call(build_app(state.clone()), get("/api/user/user123")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["meal_count"], 1);

        let (status, body) = call(build_app(state.clone()), get("/api/user/user123/summary")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["summary"]["total_meals_analyzed"], 1);
        assert_eq!(body["summary"]["recent_meals"][0]["meal_name"], "Loaded Fries");
        assert_eq!(body["summary"]["recent_meals"][0]["waste_percentage"], "35%");

        let (status, body) = call(build_app(state), get("/api/user/user123/history?limit=5")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);
        assert_eq!(body["history"][0]["user_id"], "user123");
        assert_eq!(body["history"][0]["waste_summary"]["waste_value"], "medium");
    }

    #[tokio::test]
    async fn update_rejects_malformed_analysis() {
        let mut bad = loaded_fries();
        bad.as_object_mut().unwrap().remove("food_preferences");
        let state = AppState::fake(loaded_fries());
        let (status, body) = call(
            build_app(state.clone()),
            post_json(
                "/api/user/preferences/update",
                json!({"user_id": "u", "waste_analysis": bad}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body.as_str().unwrap().contains("food_preferences"));

        let (status, _) = call(build_app(state), get("/api/user/u")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn update_requires_analysis() {
        let app = build_app(AppState::fake(loaded_fries()));
        let (status, _) = call(
            app,
            post_json("/api/user/preferences/update", json!({"user_id": "u"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_user_is_404_but_history_is_empty() {
        let state = AppState::fake(loaded_fries());
        let (status, _) = call(build_app(state.clone()), get("/api/user/ghost/summary")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = call(build_app(state.clone()), get("/api/user/ghost/history")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 0);

        let req = Request::delete("/api/user/ghost").body(Body::empty()).unwrap();
        let (status, _) = call(build_app(state), req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_removes_user() {
        let state = AppState::fake(loaded_fries());
        call(
            build_app(state.clone()),
            post_json("/api/user/create", json!({"user_id": "u"})),
        )
        .await;
        let req = Request::delete("/api/user/u").body(Body::empty()).unwrap();
        let (status, body) = call(build_app(state.clone()), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        let (status, _) = call(build_app(state), get("/api/user/u")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn analyze_url_uses_vision() {
        let app = build_app(AppState::fake(loaded_fries()));
        let (status, body) = call(
            app,
            post_json("/api/analyze/url", json!({"image_url": "https://x/plate.jpg"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["analysis"]["original_meal"]["name"], "Loaded Fries");
    }

    #[tokio::test]
    async fn analyze_url_requires_url() {
        let app = build_app(AppState::fake(loaded_fries()));
        let (status, _) = call(app, post_json("/api/analyze/url", json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn analyze_upload_and_meal_upload() {
        let state = AppState::fake(loaded_fries());
        let (status, body) = call(
            build_app(state.clone()),
            multipart("/api/analyze/image", "file", b"\xff\xd8\xff"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["analysis"]["waste_summary"]["total_waste_percentage"], "35%");

        let (status, body) = call(
            build_app(state.clone()),
            multipart("/api/user/user123/meals", "file", b"\xff\xd8\xff"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["meal_count"], 1);
        assert_eq!(body["user"]["liked_foods"], json!(["fries"]));

        let (status, _) = call(
            build_app(state),
            multipart("/api/analyze/image", "photo", b"\xff\xd8\xff"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_vision_output_is_422() {
        let mut broken = loaded_fries();
        broken["waste_summary"]["total_waste_percentage"] = json!("lots");
        let app = build_app(AppState::fake(broken));
        let (status, _) = call(
            app,
            post_json("/api/analyze/url", json!({"image_url": "https://x/plate.jpg"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
