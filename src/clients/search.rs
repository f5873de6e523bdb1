//! DuckDuckGo Instant Answer API client used for theme discovery.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, Url};
use serde::Deserialize;

#[derive(Debug, Clone)]
pub struct DuckDuckGoClient {
    client: Client,
    base_url: Url,
}

/// One search result, reduced to the fields discovery cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub title: String,
    pub snippet: String,
}

#[derive(Debug, Deserialize)]
struct InstantAnswer {
    #[serde(rename = "Heading", default)]
    heading: String,
    #[serde(rename = "AbstractText", default)]
    abstract_text: String,
    #[serde(rename = "RelatedTopics", default)]
    related_topics: Vec<RelatedTopic>,
}

#[derive(Debug, Deserialize)]
struct RelatedTopic {
    #[serde(rename = "Text", default)]
    text: String,
    #[serde(rename = "Topics", default)]
    topics: Vec<RelatedTopic>,
}

impl DuckDuckGoClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build search client")?;

        let base_url = Url::parse(&base_url.into()).context("invalid search base URL")?;

        Ok(Self { client, base_url })
    }

    /// Run one instant-answer query and flatten the response into at
    /// most `max_results` hits.
    pub async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("format", "json")
            .append_pair("no_html", "1")
            .append_pair("skip_disambig", "1");

        let answer = self
            .client
            .get(url)
            .send()
            .await
            .context("search request failed")?
            .error_for_status()
            .context("search endpoint returned error status")?
            .json::<InstantAnswer>()
            .await
            .context("failed to deserialize search response")?;

        let mut hits = Vec::new();
        if !answer.heading.is_empty() {
            hits.push(SearchHit {
                title: answer.heading.clone(),
                snippet: answer.abstract_text.clone(),
            });
        }
        collect_topics(&answer.related_topics, &mut hits, max_results);
        hits.truncate(max_results);

        Ok(hits)
    }
}

fn collect_topics(topics: &[RelatedTopic], hits: &mut Vec<SearchHit>, max_results: usize) {
    for topic in topics {
        if hits.len() >= max_results {
            return;
        }
        if topic.text.is_empty() {
            collect_topics(&topic.topics, hits, max_results);
            continue;
        }
        hits.push(hit_from_text(&topic.text));
    }
}

/// Related-topic text reads "Title - description". Split on the first
/// separator so the title can serve as a theme name candidate.
fn hit_from_text(text: &str) -> SearchHit {
    match text.split_once(" - ") {
        Some((title, snippet)) => SearchHit {
            title: title.trim().to_string(),
            snippet: snippet.trim().to_string(),
        },
        None => SearchHit {
            title: text.trim().to_string(),
            snippet: String::new(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn search_flattens_heading_and_related_topics() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("q", "Diwali 2026"))
            .and(query_param("format", "json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "Heading": "Diwali",
                "AbstractText": "Festival of lights celebrated across India.",
                "RelatedTopics": [
                    { "Text": "Diwali decorations - Traditional lamps and rangoli." },
                    { "Topics": [ { "Text": "Lakshmi Puja - Worship during Diwali." } ] }
                ]
            })))
            .mount(&server)
            .await;

        let client = DuckDuckGoClient::new(server.uri(), Duration::from_secs(5))
            .expect("client should build");

        let hits = client.search("Diwali 2026", 10).await.expect("hits");

        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].title, "Diwali");
        assert_eq!(hits[1].title, "Diwali decorations");
        assert_eq!(hits[2].snippet, "Worship during Diwali.");
    }

    #[tokio::test]
    async fn search_caps_results_at_max() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "Heading": "",
                "AbstractText": "",
                "RelatedTopics": [
                    { "Text": "One - a" },
                    { "Text": "Two - b" },
                    { "Text": "Three - c" }
                ]
            })))
            .mount(&server)
            .await;

        let client = DuckDuckGoClient::new(server.uri(), Duration::from_secs(5))
            .expect("client should build");

        let hits = client.search("anything", 2).await.expect("hits");

        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn search_propagates_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = DuckDuckGoClient::new(server.uri(), Duration::from_secs(5))
            .expect("client should build");

        let error = client.search("anything", 5).await.expect_err("should fail");
        assert!(error.to_string().contains("error status"));
    }
}
