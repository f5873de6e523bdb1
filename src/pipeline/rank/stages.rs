//! Scoring rules for theme ranking.

use tracing::warn;

use crate::clients::LlmClient;
use crate::pipeline::discover::{SourceCategory, Theme};
use crate::util::json::extract_object;
use crate::util::time::WeekContext;

const RULE_WEIGHT: f64 = 0.4;
const LLM_WEIGHT: f64 = 0.6;

const CULTURE_PREFERRED: f64 = 90.0;
const CULTURE_BASE: f64 = 55.0;
const ACHIEVEMENT_PREFERRED: f64 = 75.0;
const ACHIEVEMENT_BASE: f64 = 50.0;
const GLOBAL_BASE: f64 = 45.0;
const GLOBAL_GATED: f64 = 30.0;
const POPULARITY_BONUS_WEIGHT: f64 = 0.25;
const HIGH_POPULARITY_THRESHOLD: u8 = 80;

/// Score assumed for a theme the LLM failed to mention.
pub(crate) const NEUTRAL_LLM_SCORE: f64 = 50.0;

/// Deterministic preference score in `[0, 100]`.
///
/// Global themes earn a popularity bonus from their strongest metadata
/// signal, but are gated down when high popularity is required and the
/// signal falls short.
pub(crate) fn rule_score(theme: &Theme, preferences: &super::ThemePreferences) -> f64 {
    let score = match theme.category {
        SourceCategory::IndianCulture => {
            if preferences.prefer_indian_culture {
                CULTURE_PREFERRED
            } else {
                CULTURE_BASE
            }
        }
        SourceCategory::IndianAchievement => {
            if preferences.prefer_indian_achievements {
                ACHIEVEMENT_PREFERRED
            } else {
                ACHIEVEMENT_BASE
            }
        }
        SourceCategory::Global => {
            let signal = popularity_signal(theme);
            if preferences.global_requires_high_popularity && signal < HIGH_POPULARITY_THRESHOLD {
                GLOBAL_GATED
            } else {
                GLOBAL_BASE + f64::from(signal) * POPULARITY_BONUS_WEIGHT
            }
        }
    };

    score.clamp(0.0, 100.0)
}

/// Strongest available popularity signal for a theme.
fn popularity_signal(theme: &Theme) -> u8 {
    theme
        .metadata
        .relevance
        .unwrap_or(0)
        .max(theme.metadata.significance.unwrap_or(0))
}

/// Blend rule and LLM scores. Without an LLM score the rule score
/// stands alone.
pub(crate) fn combined_score(rule_score: f64, llm_score: Option<f64>) -> f64 {
    let combined = match llm_score {
        Some(llm) => RULE_WEIGHT * rule_score + LLM_WEIGHT * llm,
        None => rule_score,
    };
    combined.clamp(0.0, 100.0)
}

/// Ask the LLM for a wallpaper-suitability score per theme.
///
/// Returns one score per input theme, in input order. Any failure
/// yields `None` so ranking falls back to rule scores alone.
pub(crate) async fn llm_scores(
    llm: &LlmClient,
    themes: &[Theme],
    week: &WeekContext,
) -> Option<Vec<f64>> {
    let listing: Vec<String> = themes
        .iter()
        .enumerate()
        .map(|(index, theme)| {
            format!(
                "{index}. {} ({}): {}",
                theme.name,
                theme.category.as_str(),
                theme.description
            )
        })
        .collect();

    let prompt = format!(
        "Rate each theme below for how well it would work as a dark, \
         minimalistic desktop wallpaper for the week of {date}.\n\
         Respond with a JSON object only, mapping each theme's index to \
         an integer score from 0 to 100. Example: {{\"0\": 85, \"1\": 40}}\n\n\
         Themes:\n{listing}",
        date = week.date,
        listing = listing.join("\n"),
    );

    let response = match llm.generate_text(&prompt).await {
        Ok(response) => response,
        Err(error) => {
            warn!(error = %error, "LLM scoring failed, using rule scores only");
            return None;
        }
    };

    let Some(parsed) = extract_object(&response) else {
        warn!("LLM scoring response carried no JSON object, using rule scores only");
        return None;
    };

    let scores = (0..themes.len())
        .map(|index| {
            parsed[index.to_string()]
                .as_f64()
                .map_or(NEUTRAL_LLM_SCORE, |score| score.clamp(0.0, 100.0))
        })
        .collect();

    Some(scores)
}
