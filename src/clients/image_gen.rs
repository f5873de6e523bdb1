//! Pollinations image generation client.

use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use reqwest::{Client, Url};

const IMAGE_MODEL: &str = "flux";

#[derive(Debug, Clone)]
pub struct PollinationsClient {
    client: Client,
    base_url: Url,
}

impl PollinationsClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build image generation client")?;

        let base_url = Url::parse(&base_url.into()).context("invalid image base URL")?;

        Ok(Self { client, base_url })
    }

    /// Generate one image for `prompt` at the requested resolution and
    /// return the raw encoded bytes.
    pub async fn generate(&self, prompt: &str, width: u32, height: u32) -> Result<Vec<u8>> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| anyhow!("image base URL cannot be a base"))?
            .pop_if_empty()
            .push("prompt")
            .push(prompt);
        url.query_pairs_mut()
            .append_pair("width", &width.to_string())
            .append_pair("height", &height.to_string())
            .append_pair("model", IMAGE_MODEL)
            .append_pair("nologo", "true");

        let bytes = self
            .client
            .get(url)
            .send()
            .await
            .context("image generation request failed")?
            .error_for_status()
            .context("image generation endpoint returned error status")?
            .bytes()
            .await
            .context("failed to read image generation response body")?;

        if bytes.is_empty() {
            bail!("image generation returned an empty body");
        }

        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn generate_encodes_prompt_in_path_and_resolution_in_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/prompt/diwali-dark-wallpaper"))
            .and(query_param("width", "1920"))
            .and(query_param("height", "1080"))
            .and(query_param("model", "flux"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x89, 0x50, 0x4e, 0x47]))
            .mount(&server)
            .await;

        let client = PollinationsClient::new(server.uri(), Duration::from_secs(5))
            .expect("client should build");

        let bytes = client
            .generate("diwali-dark-wallpaper", 1920, 1080)
            .await
            .expect("bytes");

        assert_eq!(bytes, vec![0x89, 0x50, 0x4e, 0x47]);
    }

    #[tokio::test]
    async fn generate_rejects_empty_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(Vec::new()))
            .mount(&server)
            .await;

        let client = PollinationsClient::new(server.uri(), Duration::from_secs(5))
            .expect("client should build");

        let error = client
            .generate("anything", 100, 100)
            .await
            .expect_err("should fail");
        assert!(error.to_string().contains("empty body"));
    }

    #[tokio::test]
    async fn generate_propagates_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let client = PollinationsClient::new(server.uri(), Duration::from_secs(5))
            .expect("client should build");

        let error = client
            .generate("anything", 100, 100)
            .await
            .expect_err("should fail");
        assert!(error.to_string().contains("error status"));
    }
}
