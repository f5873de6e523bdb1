//! Text generation client supporting Anthropic and OpenAI backends.
//!
//! The pipeline treats the LLM as an optional capability. When no API
//! key is configured, [`LlmClient::from_config`] returns `None` and
//! every caller falls back to its deterministic path.

use anyhow::{Context, Result, anyhow, bail};
use reqwest::{Client, Url};
use serde_json::{Value, json};

use crate::config::Config;

const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/";
const OPENAI_BASE_URL: &str = "https://api.openai.com/";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_COMPLETION_TOKENS: u32 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    Anthropic,
    OpenAi,
}

impl LlmProvider {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.to_lowercase().as_str() {
            "anthropic" => Ok(Self::Anthropic),
            "openai" => Ok(Self::OpenAi),
            other => bail!("unknown LLM provider: {other}"),
        }
    }

    #[must_use]
    pub fn default_model(self) -> &'static str {
        match self {
            Self::Anthropic => "claude-3-5-sonnet-20241022",
            Self::OpenAi => "gpt-4",
        }
    }

    fn default_base_url(self) -> &'static str {
        match self {
            Self::Anthropic => ANTHROPIC_BASE_URL,
            Self::OpenAi => OPENAI_BASE_URL,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmClient {
    client: Client,
    provider: LlmProvider,
    base_url: Url,
    api_key: String,
    model: String,
}

impl LlmClient {
    /// Build a client from configuration. Returns `None` when the
    /// configured provider has no API key.
    pub fn from_config(config: &Config) -> Result<Option<Self>> {
        let provider = LlmProvider::parse(config.llm_provider())?;
        let api_key = match provider {
            LlmProvider::Anthropic => config.anthropic_api_key(),
            LlmProvider::OpenAi => config.openai_api_key(),
        };
        let Some(api_key) = api_key else {
            return Ok(None);
        };

        let client = Client::builder()
            .timeout(config.llm_timeout())
            .build()
            .context("failed to build LLM client")?;

        let base_url = config
            .llm_base_url()
            .unwrap_or_else(|| provider.default_base_url());
        let base_url = Url::parse(base_url).context("invalid LLM base URL")?;

        let model = config
            .llm_model()
            .unwrap_or_else(|| provider.default_model())
            .to_string();

        Ok(Some(Self {
            client,
            provider,
            base_url,
            api_key: api_key.to_string(),
            model,
        }))
    }

    #[cfg(test)]
    pub(crate) fn for_tests(provider: LlmProvider, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            provider,
            base_url: Url::parse(base_url).expect("test base URL"),
            api_key: "test-key".to_string(),
            model: provider.default_model().to_string(),
        }
    }

    /// Send one prompt and return the model's text completion.
    pub async fn generate_text(&self, prompt: &str) -> Result<String> {
        match self.provider {
            LlmProvider::Anthropic => self.generate_anthropic(prompt).await,
            LlmProvider::OpenAi => self.generate_openai(prompt).await,
        }
    }

    async fn generate_anthropic(&self, prompt: &str) -> Result<String> {
        let url = self
            .base_url
            .join("v1/messages")
            .context("failed to build Anthropic messages URL")?;

        let body = json!({
            "model": self.model,
            "max_tokens": MAX_COMPLETION_TOKENS,
            "temperature": 0,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let response = self
            .client
            .post(url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .context("Anthropic request failed")?
            .error_for_status()
            .context("Anthropic endpoint returned error status")?
            .json::<Value>()
            .await
            .context("failed to deserialize Anthropic response")?;

        response["content"][0]["text"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("Anthropic response carried no text content"))
    }

    async fn generate_openai(&self, prompt: &str) -> Result<String> {
        let url = self
            .base_url
            .join("v1/chat/completions")
            .context("failed to build OpenAI completions URL")?;

        let body = json!({
            "model": self.model,
            "max_tokens": MAX_COMPLETION_TOKENS,
            "temperature": 0,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("OpenAI request failed")?
            .error_for_status()
            .context("OpenAI endpoint returned error status")?
            .json::<Value>()
            .await
            .context("failed to deserialize OpenAI response")?;

        response["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("OpenAI response carried no message content"))
    }
}
