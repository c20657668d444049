use axum::http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("malformed analysis: {0}")]
    MalformedAnalysis(String),

    #[error("profile not found: {0}")]
    ProfileNotFound(String),

    #[error("profile already exists: {0}")]
    ProfileExists(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Reserved for optimistic stores; the caller retries the whole update.
    #[error("conflicting update for {0}")]
    ConflictingUpdate(String),

    #[error("vision analysis failed: {0}")]
    VisionUnavailable(String),
}

impl CoreError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedAnalysis(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::MalformedAnalysis(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::ProfileNotFound(_) => StatusCode::NOT_FOUND,
            Self::ProfileExists(_) | Self::ConflictingUpdate(_) => StatusCode::CONFLICT,
            Self::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::VisionUnavailable(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<sqlx::Error> for CoreError {
    fn from(e: sqlx::Error) -> Self {
        Self::StoreUnavailable(e.to_string())
    }
}

/// Handler rejection in the `(StatusCode, String)` shape used by every route.
pub fn reject(e: CoreError) -> (StatusCode, String) {
    match &e {
        CoreError::StoreUnavailable(_) | CoreError::VisionUnavailable(_) => {
            tracing::error!(error = %e, "request failed")
        }
        _ => tracing::warn!(error = %e, "request rejected"),
    }
    (e.status(), e.to_string())
}
