use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;

use crate::app::AppState;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// GET /v1/wallpaper/latest
///
/// Returns the most recent pipeline run result, including per-stage
/// attempts and the wallpaper path when one was produced.
pub(crate) async fn get_latest_wallpaper(State(state): State<AppState>) -> impl IntoResponse {
    match state.scheduler().latest_result().await {
        Some(result) => (StatusCode::OK, Json(result)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "no wallpaper run recorded yet".to_string(),
            }),
        )
            .into_response(),
    }
}
