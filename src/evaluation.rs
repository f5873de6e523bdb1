//! Offline quality checks for pipeline stage outputs.
//!
//! Each check scores a stage output in `[0, 100]` against a fixed
//! threshold. Evaluations are advisory: they report quality, they never
//! block a run.

use serde::Serialize;

use crate::pipeline::discover::{SourceCategory, Theme};
use crate::pipeline::generate::WallpaperArtifact;
use crate::pipeline::rank::{Selection, ThemePreferences};
use crate::pipeline::report::StageName;
use crate::util::image::{self, DARK_LUMINANCE_THRESHOLD};

/// Relevance assumed for themes that carry no metadata scores.
const DEFAULT_RELEVANCE: f64 = 60.0;

#[derive(Debug, Clone, Serialize)]
pub struct MetricScore {
    pub name: &'static str,
    pub score: f64,
    pub threshold: f64,
}

impl MetricScore {
    fn new(name: &'static str, score: f64, threshold: f64) -> Self {
        Self {
            name,
            score: score.clamp(0.0, 100.0),
            threshold,
        }
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.score >= self.threshold
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StageEvaluation {
    pub stage: StageName,
    pub overall_score: f64,
    pub metrics: Vec<MetricScore>,
    pub warnings: Vec<String>,
}

impl StageEvaluation {
    #[allow(clippy::cast_precision_loss)]
    fn from_metrics(stage: StageName, metrics: Vec<MetricScore>) -> Self {
        let overall_score = if metrics.is_empty() {
            0.0
        } else {
            metrics.iter().map(|m| m.score).sum::<f64>() / metrics.len() as f64
        };
        let warnings = metrics
            .iter()
            .filter(|m| !m.passed())
            .map(|m| {
                format!(
                    "{} scored {:.1}, below threshold {:.1}",
                    m.name, m.score, m.threshold
                )
            })
            .collect();

        Self {
            stage,
            overall_score,
            metrics,
            warnings,
        }
    }

    /// Every metric met its threshold.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.metrics.iter().all(MetricScore::passed)
    }
}

/// Score a discovery batch: relevance, candidate quality, name
/// uniqueness and category coverage.
#[must_use]
pub fn evaluate_discovery(themes: &[Theme]) -> StageEvaluation {
    let metrics = vec![
        MetricScore::new("relevance", relevance_score(themes), 80.0),
        MetricScore::new("quality", quality_score(themes), 85.0),
        MetricScore::new("deduplication", deduplication_score(themes), 90.0),
        MetricScore::new("coverage", coverage_score(themes), 70.0),
    ];

    StageEvaluation::from_metrics(StageName::Discovery, metrics)
}

/// Score a selection against the configured preferences and the
/// completeness of its style brief.
#[must_use]
pub fn evaluate_selection(selection: &Selection, preferences: &ThemePreferences) -> StageEvaluation {
    let category_fit = match selection.selected.theme.category {
        SourceCategory::IndianCulture => 90.0,
        SourceCategory::IndianAchievement => 85.0,
        SourceCategory::Global => 70.0,
    };

    let metrics = vec![
        MetricScore::new("category_fit", category_fit, 85.0),
        MetricScore::new(
            "preference_adherence",
            preference_adherence_score(selection, preferences),
            90.0,
        ),
        MetricScore::new("brief_completeness", brief_completeness_score(selection), 85.0),
    ];

    StageEvaluation::from_metrics(StageName::Selection, metrics)
}

/// Score a generated wallpaper by re-reading it from disk: the file
/// must decode, match the recorded resolution and stay dark.
///
/// # Errors
/// Fails when the artifact cannot be read or decoded.
pub fn evaluate_generation(artifact: &WallpaperArtifact) -> anyhow::Result<StageEvaluation> {
    let bytes = std::fs::read(&artifact.file_path)?;
    let decoded = image::decode(&bytes)?;

    let resolution = if decoded.width() == artifact.width && decoded.height() == artifact.height {
        100.0
    } else {
        0.0
    };
    let file_size = if bytes.is_empty() { 0.0 } else { 100.0 };

    let metrics = vec![
        MetricScore::new("resolution", resolution, 100.0),
        MetricScore::new("file_size", file_size, 100.0),
        MetricScore::new(
            "dark_theme_compliance",
            darkness_score(image::mean_luminance(&decoded)),
            90.0,
        ),
    ];

    Ok(StageEvaluation::from_metrics(StageName::Generation, metrics))
}

/// Score the application stage outcome.
#[must_use]
pub fn evaluate_application(succeeded: bool) -> StageEvaluation {
    let score = if succeeded { 100.0 } else { 0.0 };
    let metrics = vec![MetricScore::new("application_success", score, 95.0)];

    StageEvaluation::from_metrics(StageName::Application, metrics)
}

#[allow(clippy::cast_precision_loss)]
fn relevance_score(themes: &[Theme]) -> f64 {
    if themes.is_empty() {
        return 0.0;
    }

    let scores: Vec<f64> = themes
        .iter()
        .filter_map(|theme| theme.metadata.relevance.map(f64::from))
        .collect();
    if scores.is_empty() {
        return DEFAULT_RELEVANCE;
    }

    scores.iter().sum::<f64>() / scores.len() as f64
}

/// Per-theme quality points: name shape, description shape and
/// metadata presence, averaged over the batch.
#[allow(clippy::cast_precision_loss)]
fn quality_score(themes: &[Theme]) -> f64 {
    if themes.is_empty() {
        return 0.0;
    }

    let total: f64 = themes
        .iter()
        .map(|theme| {
            let mut points = 0.0;
            let name_len = theme.name.chars().count();
            if name_len > 3 && name_len < 50 {
                points += 20.0;
            }
            if !theme
                .name
                .chars()
                .rev()
                .take(4)
                .any(|c| c.is_ascii_digit())
            {
                points += 10.0;
            }

            let desc_len = theme.description.chars().count();
            if desc_len > 20 {
                points += 30.0;
            }
            if desc_len > 0 && desc_len < 500 {
                points += 10.0;
            }

            if theme.metadata.relevance.is_some() {
                points += 10.0;
            }
            if theme.metadata.significance.is_some() {
                points += 10.0;
            }
            if theme.metadata.visual_appeal.is_some() {
                points += 10.0;
            }

            points
        })
        .sum();

    total / themes.len() as f64
}

#[allow(clippy::cast_precision_loss)]
fn deduplication_score(themes: &[Theme]) -> f64 {
    if themes.is_empty() {
        return 100.0;
    }

    let unique: std::collections::HashSet<String> =
        themes.iter().map(Theme::normalized_name).collect();

    unique.len() as f64 / themes.len() as f64 * 100.0
}

#[allow(clippy::cast_precision_loss)]
fn coverage_score(themes: &[Theme]) -> f64 {
    const ALL_CATEGORIES: [SourceCategory; 3] = [
        SourceCategory::IndianCulture,
        SourceCategory::IndianAchievement,
        SourceCategory::Global,
    ];

    let found = ALL_CATEGORIES
        .iter()
        .filter(|category| themes.iter().any(|theme| theme.category == **category))
        .count();

    found as f64 / ALL_CATEGORIES.len() as f64 * 100.0
}

fn preference_adherence_score(selection: &Selection, preferences: &ThemePreferences) -> f64 {
    let prefers_indian =
        preferences.prefer_indian_culture || preferences.prefer_indian_achievements;
    let indian_available = selection
        .all_ranked
        .iter()
        .any(|ranked| ranked.theme.category != SourceCategory::Global);

    if prefers_indian && indian_available {
        if selection.selected.theme.category == SourceCategory::Global {
            50.0
        } else {
            100.0
        }
    } else {
        100.0
    }
}

fn brief_completeness_score(selection: &Selection) -> f64 {
    let brief = &selection.brief;
    let mut points = 0.0;
    if !brief.prompt.is_empty() {
        points += 40.0;
    }
    if !brief.color_palette.is_empty() {
        points += 20.0;
    }
    if !brief.key_elements.is_empty() {
        points += 20.0;
    }
    if brief.style_description.as_ref().is_some_and(|d| !d.is_empty()) {
        points += 20.0;
    }

    points
}

/// Map mean luminance to a darkness score: full marks at or below the
/// dark threshold, falling off linearly to zero at full white.
fn darkness_score(luminance: f64) -> f64 {
    if luminance <= DARK_LUMINANCE_THRESHOLD {
        return 100.0;
    }

    let excess = (luminance - DARK_LUMINANCE_THRESHOLD) / (1.0 - DARK_LUMINANCE_THRESHOLD);
    ((1.0 - excess) * 100.0).clamp(0.0, 100.0)
}
