//! Theme discovery stage.
//!
//! Runs a fixed set of search queries per source category, then asks
//! the LLM to distill the raw hits into scored theme candidates. When
//! no LLM is configured the stage falls back to using the hits
//! directly, without metadata scores.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::clients::search::SearchHit;
use crate::clients::{DuckDuckGoClient, LlmClient};
use crate::scheduler::JobContext;
use crate::util::json::extract_array;
use crate::util::time::WeekContext;

/// Where a theme candidate came from. Priority drives tie-breaking
/// during selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceCategory {
    IndianCulture,
    IndianAchievement,
    Global,
}

impl SourceCategory {
    #[must_use]
    pub const fn priority(self) -> u8 {
        match self {
            Self::IndianCulture => 2,
            Self::IndianAchievement => 1,
            Self::Global => 0,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::IndianCulture => "indian_culture",
            Self::IndianAchievement => "indian_achievement",
            Self::Global => "global",
        }
    }
}

/// Optional enrichment produced during discovery. All scores are
/// percentages in `[0, 100]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeMetadata {
    pub relevance: Option<u8>,
    pub significance: Option<u8>,
    pub visual_appeal: Option<u8>,
    #[serde(default)]
    pub visual_elements: Vec<String>,
    #[serde(default)]
    pub colors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    pub name: String,
    pub description: String,
    pub category: SourceCategory,
    #[serde(default)]
    pub metadata: ThemeMetadata,
}

impl Theme {
    /// Whitespace-collapsed lowercase name, used for deduplication.
    #[must_use]
    pub fn normalized_name(&self) -> String {
        self.name
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }
}

#[derive(Debug, Error)]
pub enum DiscoverError {
    /// Every configured query failed; there is nothing to select from.
    #[error("discovery sources unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait DiscoverStage: Send + Sync {
    async fn discover(&self, job: &JobContext, week: &WeekContext) -> Result<Vec<Theme>>;
}

const MAX_HITS_PER_QUERY: usize = 5;

pub struct SearchDiscoverStage {
    search: Arc<DuckDuckGoClient>,
    llm: Option<Arc<LlmClient>>,
    min_relevance: u8,
}

impl SearchDiscoverStage {
    pub fn new(
        search: Arc<DuckDuckGoClient>,
        llm: Option<Arc<LlmClient>>,
        min_relevance: u8,
    ) -> Self {
        Self {
            search,
            llm,
            min_relevance,
        }
    }

    fn category_queries(week: &WeekContext) -> Vec<(SourceCategory, Vec<String>)> {
        let month = &week.month_name;
        let year = week.year;
        vec![
            (
                SourceCategory::IndianCulture,
                vec![
                    format!("Indian festivals {month} {year}"),
                    format!("Hindu festivals {month} {year}"),
                    format!("Indian cultural celebrations {month} {year}"),
                ],
            ),
            (
                SourceCategory::IndianAchievement,
                vec![
                    format!("India achievements news {month} {year}"),
                    format!("ISRO India space news {year}"),
                    format!("India sports victory {month} {year}"),
                ],
            ),
            (
                SourceCategory::Global,
                vec![
                    format!("major world events {month} {year}"),
                    format!("global observances {month} {year}"),
                ],
            ),
        ]
    }

    async fn gather_hits(
        &self,
        week: &WeekContext,
    ) -> Result<Vec<(SourceCategory, Vec<SearchHit>)>, DiscoverError> {
        let mut gathered = Vec::new();
        let mut last_error = None;
        let mut any_succeeded = false;

        for (category, queries) in Self::category_queries(week) {
            let mut hits = Vec::new();
            for query in &queries {
                match self.search.search(query, MAX_HITS_PER_QUERY).await {
                    Ok(mut results) => {
                        any_succeeded = true;
                        hits.append(&mut results);
                    }
                    Err(error) => {
                        warn!(%query, error = %error, "search query failed");
                        last_error = Some(error.to_string());
                    }
                }
            }
            gathered.push((category, hits));
        }

        if !any_succeeded {
            return Err(DiscoverError::Unavailable(
                last_error.unwrap_or_else(|| "no search queries configured".to_string()),
            ));
        }

        Ok(gathered)
    }

    async fn extract_themes(
        &self,
        category: SourceCategory,
        hits: &[SearchHit],
        week: &WeekContext,
    ) -> Vec<Theme> {
        if hits.is_empty() {
            return Vec::new();
        }

        if let Some(llm) = &self.llm {
            match self.extract_with_llm(llm, category, hits, week).await {
                Ok(themes) => return themes,
                Err(error) => {
                    warn!(category = category.as_str(), error = %error, "LLM theme extraction failed, using raw hits");
                }
            }
        }

        hits.iter().map(|hit| theme_from_hit(category, hit)).collect()
    }

    async fn extract_with_llm(
        &self,
        llm: &LlmClient,
        category: SourceCategory,
        hits: &[SearchHit],
        week: &WeekContext,
    ) -> Result<Vec<Theme>> {
        let digest: Vec<String> = hits
            .iter()
            .map(|hit| format!("- {}: {}", hit.title, hit.snippet))
            .collect();

        let prompt = format!(
            "You are curating wallpaper themes for the week of {date} ({month} {year}).\n\
             From the search results below, extract up to 5 distinct themes in the \
             \"{category}\" category.\n\
             Respond with a JSON array only. Each element must have:\n\
             name (short string), description (one sentence),\n\
             relevance, significance, visual_appeal (integers 0-100),\n\
             visual_elements (array of strings), colors (array of hex strings).\n\n\
             Search results:\n{digest}",
            date = week.date,
            month = week.month_name,
            year = week.year,
            category = category.as_str(),
            digest = digest.join("\n"),
        );

        let response = llm.generate_text(&prompt).await?;
        let Some(parsed) = extract_array(&response) else {
            anyhow::bail!("LLM response carried no JSON array");
        };

        let mut themes = Vec::new();
        for entry in parsed.as_array().into_iter().flatten() {
            let Some(name) = entry["name"].as_str() else {
                continue;
            };
            let metadata = ThemeMetadata {
                relevance: entry["relevance"].as_u64().map(clamp_percentage),
                significance: entry["significance"].as_u64().map(clamp_percentage),
                visual_appeal: entry["visual_appeal"].as_u64().map(clamp_percentage),
                visual_elements: string_array(&entry["visual_elements"]),
                colors: string_array(&entry["colors"]),
            };
            themes.push(Theme {
                name: name.to_string(),
                description: entry["description"].as_str().unwrap_or_default().to_string(),
                category,
                metadata,
            });
        }

        // Low-relevance candidates are dropped here, before ranking.
        themes.retain(|theme| theme.metadata.relevance.unwrap_or(0) >= self.min_relevance);

        Ok(themes)
    }
}

#[async_trait]
impl DiscoverStage for SearchDiscoverStage {
    async fn discover(&self, job: &JobContext, week: &WeekContext) -> Result<Vec<Theme>> {
        let gathered = self.gather_hits(week).await?;

        let mut themes = Vec::new();
        for (category, hits) in &gathered {
            let mut extracted = self.extract_themes(*category, hits, week).await;
            themes.append(&mut extracted);
        }

        let themes = dedup_by_name(themes);
        debug!(job_id = %job.job_id, count = themes.len(), "theme discovery completed");

        Ok(themes)
    }
}

fn theme_from_hit(category: SourceCategory, hit: &SearchHit) -> Theme {
    Theme {
        name: hit.title.clone(),
        description: hit.snippet.clone(),
        category,
        metadata: ThemeMetadata::default(),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn clamp_percentage(value: u64) -> u8 {
    value.min(100) as u8
}

fn string_array(value: &serde_json::Value) -> Vec<String> {
    value
        .as_array()
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| entry.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Drop empty names and duplicates by normalized name. The first
/// occurrence wins, preserving discovery order.
#[must_use]
pub fn dedup_by_name(themes: Vec<Theme>) -> Vec<Theme> {
    let mut seen = std::collections::HashSet::new();
    themes
        .into_iter()
        .filter(|theme| {
            let key = theme.normalized_name();
            !key.is_empty() && seen.insert(key)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::llm::LlmProvider;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn theme(name: &str, category: SourceCategory) -> Theme {
        Theme {
            name: name.to_string(),
            description: String::new(),
            category,
            metadata: ThemeMetadata::default(),
        }
    }

    #[test]
    fn normalized_name_collapses_whitespace_and_case() {
        let t = theme("  Diwali   Festival ", SourceCategory::IndianCulture);

        assert_eq!(t.normalized_name(), "diwali festival");
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let themes = vec![
            theme("Diwali", SourceCategory::IndianCulture),
            theme("diwali", SourceCategory::Global),
            theme("Holi", SourceCategory::IndianCulture),
        ];

        let deduped = dedup_by_name(themes);

        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].name, "Diwali");
        assert_eq!(deduped[0].category, SourceCategory::IndianCulture);
        assert_eq!(deduped[1].name, "Holi");
    }

    #[test]
    fn dedup_drops_empty_names() {
        let themes = vec![
            theme("", SourceCategory::Global),
            theme("   ", SourceCategory::Global),
            theme("Chess Olympiad", SourceCategory::IndianAchievement),
        ];

        let deduped = dedup_by_name(themes);

        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].name, "Chess Olympiad");
    }

    fn stage(llm: Option<Arc<LlmClient>>, min_relevance: u8) -> SearchDiscoverStage {
        let search = Arc::new(
            DuckDuckGoClient::new("http://127.0.0.1:1/", Duration::from_secs(1)).expect("client"),
        );
        SearchDiscoverStage::new(search, llm, min_relevance)
    }

    fn hits() -> Vec<SearchHit> {
        vec![
            SearchHit {
                title: "Diwali 2026".to_string(),
                snippet: "Festival of lights across India".to_string(),
            },
            SearchHit {
                title: "Village fair".to_string(),
                snippet: "A small local gathering".to_string(),
            },
        ]
    }

    fn week() -> WeekContext {
        WeekContext::from_date(chrono::NaiveDate::from_ymd_opt(2026, 10, 19).expect("date"))
    }

    async fn llm_returning(text: &str) -> (MockServer, Arc<LlmClient>) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": [{ "type": "text", "text": text }]
            })))
            .mount(&server)
            .await;
        let llm = Arc::new(LlmClient::for_tests(LlmProvider::Anthropic, &server.uri()));
        (server, llm)
    }

    #[tokio::test]
    async fn llm_extraction_parses_metadata_and_drops_low_relevance() {
        let response = serde_json::json!([
            {
                "name": "Diwali",
                "description": "Festival of lights",
                "relevance": 90,
                "significance": 85,
                "visual_appeal": 120,
                "visual_elements": ["diyas", "rangoli"],
                "colors": ["#1a1a1a"]
            },
            { "name": "Village fair", "description": "A small gathering", "relevance": 20 }
        ])
        .to_string();
        let (_server, llm) = llm_returning(&response).await;
        let stage = stage(Some(llm), 50);

        let themes = stage
            .extract_themes(SourceCategory::IndianCulture, &hits(), &week())
            .await;

        assert_eq!(themes.len(), 1);
        assert_eq!(themes[0].name, "Diwali");
        assert_eq!(themes[0].description, "Festival of lights");
        assert_eq!(themes[0].metadata.relevance, Some(90));
        assert_eq!(themes[0].metadata.visual_appeal, Some(100));
        assert_eq!(themes[0].metadata.visual_elements, vec!["diyas", "rangoli"]);
    }

    #[tokio::test]
    async fn llm_extraction_failure_falls_back_to_raw_hits() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let llm = Arc::new(LlmClient::for_tests(LlmProvider::Anthropic, &server.uri()));
        let stage = stage(Some(llm), 50);

        let themes = stage
            .extract_themes(SourceCategory::Global, &hits(), &week())
            .await;

        assert_eq!(themes.len(), 2);
        assert_eq!(themes[0].name, "Diwali 2026");
        assert_eq!(themes[0].description, "Festival of lights across India");
        assert_eq!(themes[0].metadata, ThemeMetadata::default());
    }

    #[tokio::test]
    async fn prose_llm_response_falls_back_to_raw_hits() {
        let (_server, llm) = llm_returning("no structured themes here.").await;
        let stage = stage(Some(llm), 50);

        let themes = stage
            .extract_themes(SourceCategory::IndianCulture, &hits(), &week())
            .await;

        assert_eq!(themes.len(), 2);
        assert_eq!(themes[1].name, "Village fair");
    }

    #[test]
    fn category_priority_orders_culture_first() {
        assert!(
            SourceCategory::IndianCulture.priority() > SourceCategory::IndianAchievement.priority()
        );
        assert!(SourceCategory::IndianAchievement.priority() > SourceCategory::Global.priority());
    }
}
