/// OpenAI embeddings client
use actionarc_core::Embedder;
use actionarc_domain::{ActionArcError, EmbeddingsConfig, Result};
use async_trait::async_trait;
use reqwest::Method;
use tracing::{debug, info, instrument};

use super::types::{EmbeddingRequest, EmbeddingResponse};
use crate::http::{read_json, HttpClient};

const OPENAI_EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";
const DEFAULT_MODEL: &str = "text-embedding-3-small";
/// Inputs per request; the endpoint accepts up to 2048.
const MAX_BATCH: usize = 512;

/// Text embedding client implementing the core [`Embedder`] port
pub struct EmbeddingClient {
    http_client: HttpClient,
    api_key: String,
    model: String,
    api_url: String,
}

impl EmbeddingClient {
    /// Create a new client
    ///
    /// # Arguments
    /// * `api_key` - OpenAI API key (required)
    /// * `http_client` - HTTP client with retry logic
    pub fn new(api_key: String, http_client: HttpClient) -> Self {
        Self {
            http_client,
            api_key,
            model: DEFAULT_MODEL.to_string(),
            api_url: OPENAI_EMBEDDINGS_URL.to_string(),
        }
    }

    /// Build from the `[embeddings]` config section.
    ///
    /// # Errors
    /// `ActionArcError::Config` when no API key is configured.
    pub fn from_config(config: &EmbeddingsConfig, http_client: HttpClient) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ActionArcError::Config("embeddings.api_key is not set".into()))?;

        Ok(Self::new(api_key, http_client)
            .with_model(config.model.clone())
            .with_api_url(config.endpoint.clone()))
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Alternate endpoint (Azure OpenAI, proxies, tests).
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let payload = EmbeddingRequest { model: &self.model, input: texts, encoding_format: "float" };

        let request = self
            .http_client
            .request(Method::POST, &self.api_url)
            .bearer_auth(&self.api_key)
            .json(&payload);

        let response = self.http_client.send(request).await?;
        let body: EmbeddingResponse = read_json(response, "openai").await?;

        if let Some(usage) = &body.usage {
            debug!(tokens = usage.total_tokens, inputs = texts.len(), "embedding batch complete");
        }

        order_by_index(body, texts.len())
    }
}

/// The API may return vectors in any order; `index` ties each to its input.
fn order_by_index(response: EmbeddingResponse, expected: usize) -> Result<Vec<Vec<f32>>> {
    let mut slots: Vec<Option<Vec<f32>>> = vec![None; expected];
    for item in response.data {
        let slot = slots.get_mut(item.index).ok_or_else(|| {
            ActionArcError::Internal(format!("embedding index {} out of range", item.index))
        })?;
        *slot = Some(item.embedding);
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(i, v)| v.ok_or_else(|| ActionArcError::Internal(format!("no embedding returned for input {i}"))))
        .collect()
}

#[async_trait]
impl Embedder for EmbeddingClient {
    #[instrument(skip(self, texts), fields(count = texts.len(), model = %self.model))]
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut vectors = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(MAX_BATCH) {
            vectors.extend(self.embed_batch(chunk).await?);
        }

        info!(count = vectors.len(), "Embedded texts with OpenAI");
        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client(server: &MockServer) -> EmbeddingClient {
        let http = HttpClient::builder()
            .no_proxy()
            .max_attempts(1)
            .base_backoff(Duration::from_millis(1))
            .build()
            .unwrap();
        EmbeddingClient::new("sk-test".into(), http).with_api_url(format!("{}/v1/embeddings", server.uri()))
    }

    #[tokio::test]
    async fn vectors_follow_input_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    { "index": 1, "embedding": [0.0, 1.0] },
                    { "index": 0, "embedding": [1.0, 0.0] }
                ],
                "usage": { "total_tokens": 4 }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let vectors = client(&server).embed(&["budget".into(), "lunch".into()]).await.unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[tokio::test]
    async fn empty_input_skips_the_request() {
        let server = MockServer::start().await;
        let vectors = client(&server).embed(&[]).await.unwrap();
        assert!(vectors.is_empty());
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_vector_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "index": 0, "embedding": [1.0] }]
            })))
            .mount(&server)
            .await;

        let err = client(&server).embed(&["a".into(), "b".into()]).await.unwrap_err();
        assert!(matches!(err, ActionArcError::Internal(_)));
    }

    #[tokio::test]
    async fn invalid_key_is_an_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": { "message": "Incorrect API key provided", "type": "invalid_request_error" }
            })))
            .mount(&server)
            .await;

        let err = client(&server).embed(&["a".into()]).await.unwrap_err();
        assert!(matches!(err, ActionArcError::Auth(msg) if msg.contains("Incorrect API key")));
    }

    #[test]
    fn from_config_requires_key() {
        let http = HttpClient::new().unwrap();
        let err = EmbeddingClient::from_config(&EmbeddingsConfig::default(), http).err().unwrap();
        assert!(matches!(err, ActionArcError::Config(_)));
    }
}
