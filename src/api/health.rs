use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use tracing::error;

use crate::app::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) struct HealthReport {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

impl HealthReport {
    fn ready() -> Self {
        Self {
            status: "ready",
            detail: None,
        }
    }

    fn degraded(detail: impl Into<String>) -> Self {
        Self {
            status: "degraded",
            detail: Some(detail.into()),
        }
    }
}

pub(crate) async fn ready(
    State(state): State<AppState>,
) -> Result<Json<HealthReport>, (StatusCode, Json<HealthReport>)> {
    let wallpaper_dir = state.config().wallpaper_dir();
    if !wallpaper_dir.is_dir() {
        error!(path = %wallpaper_dir.display(), "wallpaper directory is not available");
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthReport::degraded(format!(
                "wallpaper directory missing: {}",
                wallpaper_dir.display()
            ))),
        ));
    }

    Ok(Json(HealthReport::ready()))
}

pub(crate) async fn live(State(_state): State<AppState>) -> Json<HealthReport> {
    Json(HealthReport {
        status: "live",
        detail: None,
    })
}
