use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::{
    app::AppState,
    pipeline::report::RunStatus,
    scheduler::{JobContext, Trigger},
};

#[derive(Debug, Serialize)]
struct GenerateWallpaperResponse {
    job_id: Uuid,
    status: &'static str,
}

/// POST /v1/generate/wallpaper
///
/// Accepts immediately and runs the pipeline in the background. The
/// outcome is available from the latest-wallpaper endpoint.
pub(crate) async fn trigger_wallpaper(State(state): State<AppState>) -> impl IntoResponse {
    let job_id = Uuid::new_v4();
    let job = JobContext::new(job_id, Trigger::Manual);
    let scheduler = state.scheduler().clone();

    tokio::spawn(async move {
        let result = scheduler.run_job(job).await;
        match result.status {
            RunStatus::Succeeded => info!(%job_id, "manual wallpaper job completed"),
            RunStatus::PartiallySucceeded => info!(
                %job_id,
                wallpaper_path = ?result.wallpaper_path,
                "manual wallpaper job generated but did not apply"
            ),
            RunStatus::Failed => info!(%job_id, error = ?result.error, "manual wallpaper job failed"),
        }
    });

    let body = Json(GenerateWallpaperResponse {
        job_id,
        status: "accepted",
    });

    (StatusCode::ACCEPTED, body).into_response()
}
