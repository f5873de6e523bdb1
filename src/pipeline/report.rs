//! Run outcome reporting types.
//!
//! A pipeline run never returns `Err`; every failure mode is folded
//! into an [`OrchestrationResult`] so callers always get a full
//! per-stage account of what happened.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Succeeded,
    /// Wallpaper was generated and saved, but could not be applied to
    /// the desktop. The artifact path is still reported.
    PartiallySucceeded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    Discovery,
    Selection,
    Generation,
    Application,
}

impl StageName {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Discovery => "discovery",
            Self::Selection => "selection",
            Self::Generation => "generation",
            Self::Application => "application",
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-stage record: how many attempts were spent and whether the last
/// one failed.
#[derive(Debug, Clone, Serialize)]
pub struct StageOutcome {
    pub stage: StageName,
    pub attempts: u32,
    pub error: Option<String>,
}

impl StageOutcome {
    #[must_use]
    pub fn succeeded(stage: StageName, attempts: u32) -> Self {
        Self {
            stage,
            attempts,
            error: None,
        }
    }

    #[must_use]
    pub fn failed(stage: StageName, attempts: u32, error: impl Into<String>) -> Self {
        Self {
            stage,
            attempts,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SelectedThemeSummary {
    pub name: String,
    pub category: crate::pipeline::discover::SourceCategory,
    pub combined_score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrchestrationResult {
    pub job_id: Uuid,
    pub status: RunStatus,
    pub stages: Vec<StageOutcome>,
    pub selected_theme: Option<SelectedThemeSummary>,
    pub wallpaper_path: Option<PathBuf>,
    pub error: Option<String>,
}

impl OrchestrationResult {
    /// Outcome for the named stage, if the run reached it.
    #[must_use]
    pub fn stage(&self, name: StageName) -> Option<&StageOutcome> {
        self.stages.iter().find(|outcome| outcome.stage == name)
    }
}
