//! Theme ranking and selection.
//!
//! Every discovered theme gets a deterministic rule score; when an LLM
//! is available a second aesthetic score is blended in. Selection is
//! fully deterministic for a given input order.

pub mod brief;
pub(crate) mod stages;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::clients::LlmClient;
use crate::pipeline::discover::Theme;
use crate::scheduler::JobContext;
use crate::util::time::WeekContext;

pub use brief::StyleBrief;

#[derive(Debug, Clone, Serialize)]
pub struct RankedTheme {
    pub theme: Theme,
    pub rule_score: f64,
    pub llm_score: Option<f64>,
    pub combined_score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Selection {
    pub selected: RankedTheme,
    pub brief: StyleBrief,
    pub all_ranked: Vec<RankedTheme>,
}

#[derive(Debug, Error)]
pub enum RankError {
    /// Discovery produced no usable candidates.
    #[error("no themes available for selection")]
    EmptyInput,
}

#[derive(Debug, Clone, Copy)]
pub struct ThemePreferences {
    pub prefer_indian_culture: bool,
    pub prefer_indian_achievements: bool,
    pub global_requires_high_popularity: bool,
}

impl Default for ThemePreferences {
    fn default() -> Self {
        Self {
            prefer_indian_culture: true,
            prefer_indian_achievements: true,
            global_requires_high_popularity: true,
        }
    }
}

pub struct RankingPipeline {
    preferences: ThemePreferences,
    llm: Option<Arc<LlmClient>>,
}

impl RankingPipeline {
    pub fn new(preferences: ThemePreferences, llm: Option<Arc<LlmClient>>) -> Self {
        Self { preferences, llm }
    }

    /// Score every theme and pick a winner.
    ///
    /// Ordering: combined score descending, then category priority,
    /// then discovery order (the sort is stable).
    ///
    /// # Errors
    /// Returns [`RankError::EmptyInput`] when `themes` is empty.
    pub async fn rank(
        &self,
        themes: &[Theme],
        week: &WeekContext,
    ) -> Result<Selection, RankError> {
        if themes.is_empty() {
            return Err(RankError::EmptyInput);
        }

        let llm_scores = match &self.llm {
            Some(llm) => stages::llm_scores(llm, themes, week).await,
            None => None,
        };

        let mut ranked: Vec<RankedTheme> = themes
            .iter()
            .enumerate()
            .map(|(index, theme)| {
                let rule_score = stages::rule_score(theme, &self.preferences);
                let llm_score = llm_scores
                    .as_ref()
                    .map(|scores| scores.get(index).copied().unwrap_or(stages::NEUTRAL_LLM_SCORE));
                let combined_score = stages::combined_score(rule_score, llm_score);
                RankedTheme {
                    theme: theme.clone(),
                    rule_score,
                    llm_score,
                    combined_score,
                }
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.combined_score
                .partial_cmp(&a.combined_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.theme.category.priority().cmp(&a.theme.category.priority()))
        });

        let selected = ranked[0].clone();
        debug!(
            theme = %selected.theme.name,
            rule_score = selected.rule_score,
            llm_score = ?selected.llm_score,
            combined_score = selected.combined_score,
            "theme selected"
        );

        let brief = brief::generate(self.llm.as_deref(), &selected.theme).await;

        Ok(Selection {
            selected,
            brief,
            all_ranked: ranked,
        })
    }
}

#[async_trait]
pub trait SelectStage: Send + Sync {
    async fn select(
        &self,
        job: &JobContext,
        themes: Vec<Theme>,
        week: &WeekContext,
    ) -> Result<Selection, RankError>;
}

pub struct RankingSelectStage {
    pipeline: RankingPipeline,
}

impl RankingSelectStage {
    pub fn new(pipeline: RankingPipeline) -> Self {
        Self { pipeline }
    }
}

#[async_trait]
impl SelectStage for RankingSelectStage {
    async fn select(
        &self,
        job: &JobContext,
        themes: Vec<Theme>,
        week: &WeekContext,
    ) -> Result<Selection, RankError> {
        let selection = self.pipeline.rank(&themes, week).await?;
        info!(
            job_id = %job.job_id,
            theme = %selection.selected.theme.name,
            category = selection.selected.theme.category.as_str(),
            candidates = selection.all_ranked.len(),
            "selection completed"
        );
        Ok(selection)
    }
}
