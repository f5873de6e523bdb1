use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;

use crate::{
    api,
    clients::{DuckDuckGoClient, LlmClient, PollinationsClient},
    config::Config,
    observability,
    pipeline::WallpaperPipeline,
    scheduler::Scheduler,
};

#[derive(Clone)]
pub(crate) struct AppState {
    registry: Arc<ComponentRegistry>,
}

pub struct ComponentRegistry {
    config: Arc<Config>,
    scheduler: Scheduler,
}

impl AppState {
    pub(crate) fn new(registry: Arc<ComponentRegistry>) -> Self {
        Self { registry }
    }

    pub(crate) fn scheduler(&self) -> &Scheduler {
        &self.registry.scheduler
    }

    pub(crate) fn config(&self) -> &Config {
        &self.registry.config
    }
}

impl ComponentRegistry {
    /// Initialize telemetry, clients and the pipeline from the loaded
    /// configuration.
    ///
    /// # Errors
    /// Returns an error when telemetry or a client fails to build, or
    /// when the wallpaper directory cannot be created.
    pub fn build(config: Config) -> Result<Self> {
        observability::init()?;
        let config = Arc::new(config);

        std::fs::create_dir_all(config.wallpaper_dir()).with_context(|| {
            format!(
                "failed to create wallpaper directory {}",
                config.wallpaper_dir().display()
            )
        })?;

        let search = Arc::new(DuckDuckGoClient::new(
            config.search_base_url(),
            config.search_timeout(),
        )?);
        let image = Arc::new(PollinationsClient::new(
            config.image_base_url(),
            config.image_timeout(),
        )?);
        let llm = LlmClient::from_config(&config)?.map(Arc::new);
        if llm.is_none() {
            tracing::info!(
                provider = config.llm_provider(),
                "no LLM API key configured, running with rule-based scoring only"
            );
        }

        let pipeline = Arc::new(WallpaperPipeline::new(&config, llm, search, image));
        let scheduler = Scheduler::new(pipeline);

        Ok(Self { config, scheduler })
    }

    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }
}

pub fn build_router(registry: Arc<ComponentRegistry>) -> Router {
    api::router(AppState::new(registry))
}
