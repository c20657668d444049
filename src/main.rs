mod analysis;
mod app;
mod config;
mod error;
mod locks;
mod preferences;
mod profiles;
mod state;
mod store;
mod vision;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "mealwaste=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let state = state::AppState::init().await?;
    tracing::info!(
        backend = ?state.config.store_backend,
        model = %state.config.vision.model,
        "state ready"
    );

    let app = app::build_app(state.clone());
    app::serve(app, state).await
}
