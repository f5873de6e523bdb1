use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::pipeline::{WallpaperPipeline, report::OrchestrationResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    Scheduled,
    Manual,
}

#[derive(Debug, Clone)]
pub struct JobContext {
    pub job_id: Uuid,
    pub trigger: Trigger,
}

impl JobContext {
    #[must_use]
    pub fn new(job_id: Uuid, trigger: Trigger) -> Self {
        Self { job_id, trigger }
    }
}

/// Runs pipeline jobs and remembers the most recent outcome for the
/// fetch endpoint.
#[derive(Clone)]
pub struct Scheduler {
    pipeline: Arc<WallpaperPipeline>,
    last_result: Arc<RwLock<Option<OrchestrationResult>>>,
}

impl Scheduler {
    #[must_use]
    pub fn new(pipeline: Arc<WallpaperPipeline>) -> Self {
        Self {
            pipeline,
            last_result: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn run_job(&self, context: JobContext) -> OrchestrationResult {
        tracing::info!(
            job_id = %context.job_id,
            trigger = ?context.trigger,
            "running wallpaper job"
        );

        let result = self.pipeline.run(&context).await;
        *self.last_result.write().await = Some(result.clone());

        result
    }

    pub async fn latest_result(&self) -> Option<OrchestrationResult> {
        self.last_result.read().await.clone()
    }
}
