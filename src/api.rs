pub(crate) mod fetch;
pub(crate) mod generate;
pub(crate) mod health;

use axum::{
    Router,
    routing::{get, post},
};

use crate::app::AppState;

pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route("/health/ready", get(health::ready))
        .route("/health/live", get(health::live))
        .route("/v1/generate/wallpaper", post(generate::trigger_wallpaper))
        .route("/v1/wallpaper/latest", get(fetch::get_latest_wallpaper))
        .with_state(state)
}
