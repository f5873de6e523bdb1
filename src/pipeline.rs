//! Weekly wallpaper pipeline orchestration.
//!
//! Four stages run in fixed order: discover, select, generate, apply.
//! Discovery, generation and application are wrapped in the retry
//! policy; selection is deterministic and never retried. The run
//! itself is infallible: every failure mode folds into the returned
//! [`OrchestrationResult`].

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::{
    clients::{DuckDuckGoClient, LlmClient, PollinationsClient},
    config::Config,
    scheduler::JobContext,
    util::retry::RetryConfig,
    util::time::WeekContext,
};

pub mod apply;
pub mod discover;
pub mod generate;
pub mod rank;
pub mod report;

use apply::{ApplyStage, DesktopApplyStage, platform_applier};
use discover::{DiscoverStage, SearchDiscoverStage};
use generate::{GenerateStage, ImageGenerateStage};
use rank::{RankingPipeline, RankingSelectStage, SelectStage, ThemePreferences};
use report::{OrchestrationResult, RunStatus, SelectedThemeSummary, StageName, StageOutcome};

pub struct WallpaperPipeline {
    stages: PipelineStages,
    retry: RetryConfig,
}

struct PipelineStages {
    discover: Arc<dyn DiscoverStage>,
    select: Arc<dyn SelectStage>,
    generate: Arc<dyn GenerateStage>,
    apply: Arc<dyn ApplyStage>,
}

pub struct PipelineBuilder {
    retry: RetryConfig,
    discover: Option<Arc<dyn DiscoverStage>>,
    select: Option<Arc<dyn SelectStage>>,
    generate: Option<Arc<dyn GenerateStage>>,
    apply: Option<Arc<dyn ApplyStage>>,
}

impl WallpaperPipeline {
    pub fn new(
        config: &Config,
        llm: Option<Arc<LlmClient>>,
        search: Arc<DuckDuckGoClient>,
        image: Arc<PollinationsClient>,
    ) -> Self {
        let retry = RetryConfig {
            max_attempts: config.workflow_max_retries(),
            base_delay_ms: config.workflow_backoff_base_ms(),
            max_delay_ms: config.workflow_backoff_cap_ms(),
        };
        let preferences = ThemePreferences {
            prefer_indian_culture: config.prefer_indian_culture(),
            prefer_indian_achievements: config.prefer_indian_achievements(),
            global_requires_high_popularity: config.global_requires_high_popularity(),
        };

        PipelineBuilder::new(retry)
            .with_discover_stage(Arc::new(SearchDiscoverStage::new(
                search,
                llm.clone(),
                config.discovery_min_relevance(),
            )))
            .with_select_stage(Arc::new(RankingSelectStage::new(RankingPipeline::new(
                preferences,
                llm,
            ))))
            .with_generate_stage(Arc::new(ImageGenerateStage::new(
                image,
                config.wallpaper_dir(),
                config.wallpaper_width(),
                config.wallpaper_height(),
            )))
            .with_apply_stage(Arc::new(DesktopApplyStage::new(platform_applier())))
            .build()
    }

    #[must_use]
    pub fn builder(retry: RetryConfig) -> PipelineBuilder {
        PipelineBuilder::new(retry)
    }

    /// Run the full pipeline for one job. Never returns an error; the
    /// result carries the per-stage account instead.
    #[allow(clippy::too_many_lines)]
    pub async fn run(&self, job: &JobContext) -> OrchestrationResult {
        let week = WeekContext::now();
        debug!(job_id = %job.job_id, week = week.week_number, "wallpaper pipeline started");

        let mut stages = Vec::new();

        // Discovery, retried.
        let themes = match self
            .run_with_retry(StageName::Discovery, || {
                self.stages.discover.discover(job, &week)
            })
            .await
        {
            Ok((themes, attempts)) => {
                stages.push(StageOutcome::succeeded(StageName::Discovery, attempts));
                themes
            }
            Err((cause, attempts)) => {
                let message = cause.to_string();
                stages.push(StageOutcome::failed(
                    StageName::Discovery,
                    attempts,
                    &message,
                ));
                error!(job_id = %job.job_id, error = %cause, "discovery exhausted all attempts");
                return OrchestrationResult {
                    job_id: job.job_id,
                    status: RunStatus::Failed,
                    stages,
                    selected_theme: None,
                    wallpaper_path: None,
                    error: Some(message),
                };
            }
        };

        // Selection is deterministic, a single attempt.
        let selection = match self.stages.select.select(job, themes, &week).await {
            Ok(selection) => {
                stages.push(StageOutcome::succeeded(StageName::Selection, 1));
                selection
            }
            Err(cause) => {
                let message = cause.to_string();
                stages.push(StageOutcome::failed(StageName::Selection, 1, &message));
                error!(job_id = %job.job_id, error = %cause, "selection failed");
                return OrchestrationResult {
                    job_id: job.job_id,
                    status: RunStatus::Failed,
                    stages,
                    selected_theme: None,
                    wallpaper_path: None,
                    error: Some(message),
                };
            }
        };

        let selected_theme = SelectedThemeSummary {
            name: selection.selected.theme.name.clone(),
            category: selection.selected.theme.category,
            combined_score: selection.selected.combined_score,
        };

        // Generation, retried.
        let artifact = match self
            .run_with_retry(StageName::Generation, || {
                self.stages.generate.generate(job, &selection)
            })
            .await
        {
            Ok((artifact, attempts)) => {
                stages.push(StageOutcome::succeeded(StageName::Generation, attempts));
                artifact
            }
            Err((cause, attempts)) => {
                let message = cause.to_string();
                stages.push(StageOutcome::failed(
                    StageName::Generation,
                    attempts,
                    &message,
                ));
                error!(job_id = %job.job_id, error = %cause, "generation exhausted all attempts");
                return OrchestrationResult {
                    job_id: job.job_id,
                    status: RunStatus::Failed,
                    stages,
                    selected_theme: Some(selected_theme),
                    wallpaper_path: None,
                    error: Some(message),
                };
            }
        };

        // Application, retried. Exhaustion keeps the saved artifact.
        match self
            .run_with_retry(StageName::Application, || {
                self.stages.apply.apply(job, &artifact)
            })
            .await
        {
            Ok(((), attempts)) => {
                stages.push(StageOutcome::succeeded(StageName::Application, attempts));
                info!(job_id = %job.job_id, theme = %selected_theme.name, "wallpaper pipeline completed");
                OrchestrationResult {
                    job_id: job.job_id,
                    status: RunStatus::Succeeded,
                    stages,
                    selected_theme: Some(selected_theme),
                    wallpaper_path: Some(artifact.file_path),
                    error: None,
                }
            }
            Err((cause, attempts)) => {
                let message = cause.to_string();
                stages.push(StageOutcome::failed(
                    StageName::Application,
                    attempts,
                    &message,
                ));
                warn!(
                    job_id = %job.job_id,
                    path = %artifact.file_path.display(),
                    error = %cause,
                    "wallpaper saved but could not be applied"
                );
                OrchestrationResult {
                    job_id: job.job_id,
                    status: RunStatus::PartiallySucceeded,
                    stages,
                    selected_theme: Some(selected_theme),
                    wallpaper_path: Some(artifact.file_path),
                    error: Some(message),
                }
            }
        }
    }

    /// Drive one stage through the retry policy. Returns the value and
    /// the number of attempts spent, or the last error and the attempt
    /// count on exhaustion.
    async fn run_with_retry<T, F, Fut>(
        &self,
        stage: StageName,
        mut operation: F,
    ) -> Result<(T, u32), (anyhow::Error, u32)>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let mut attempt = 1u32;
        loop {
            match operation().await {
                Ok(value) => return Ok((value, attempt)),
                Err(cause) => {
                    if !self.retry.can_retry(attempt) {
                        return Err((cause, attempt));
                    }
                    warn!(
                        stage = %stage,
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        error = %cause,
                        "stage failed, retrying"
                    );
                    tokio::time::sleep(self.retry.delay_for_attempt(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }
}

impl PipelineBuilder {
    #[must_use]
    pub fn new(retry: RetryConfig) -> Self {
        Self {
            retry,
            discover: None,
            select: None,
            generate: None,
            apply: None,
        }
    }

    #[must_use]
    pub fn with_discover_stage(mut self, stage: Arc<dyn DiscoverStage>) -> Self {
        self.discover = Some(stage);
        self
    }

    #[must_use]
    pub fn with_select_stage(mut self, stage: Arc<dyn SelectStage>) -> Self {
        self.select = Some(stage);
        self
    }

    #[must_use]
    pub fn with_generate_stage(mut self, stage: Arc<dyn GenerateStage>) -> Self {
        self.generate = Some(stage);
        self
    }

    #[must_use]
    pub fn with_apply_stage(mut self, stage: Arc<dyn ApplyStage>) -> Self {
        self.apply = Some(stage);
        self
    }

    /// # Panics
    /// Panics when any stage is missing.
    #[must_use]
    pub fn build(self) -> WallpaperPipeline {
        let stages = PipelineStages {
            discover: self
                .discover
                .unwrap_or_else(|| panic!("discover stage must be configured before build")),
            select: self
                .select
                .unwrap_or_else(|| panic!("select stage must be configured before build")),
            generate: self
                .generate
                .unwrap_or_else(|| panic!("generate stage must be configured before build")),
            apply: self
                .apply
                .unwrap_or_else(|| panic!("apply stage must be configured before build")),
        };

        WallpaperPipeline {
            stages,
            retry: self.retry,
        }
    }
}
