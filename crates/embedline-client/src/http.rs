use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use serde_json::{Map, Value};

use embedline_core::error::{ClientError, EmbedlineError, Result};
use embedline_core::vector::EmbeddingVector;

use crate::client::EmbeddingClient;
use crate::response::parse_response;

/// Longest error body kept in a [`ClientError::Status`].
const MAX_ERROR_BODY: usize = 200;

/// Configuration for [`HttpEmbeddingClient`].
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Inference endpoints, used round-robin per request.
    pub endpoints: Vec<String>,
    /// JSON key holding the batch of texts (`"inputs"` for TEI, `"text"` for Cloudflare).
    pub input_key: String,
    /// Ask the server to truncate over-long inputs (`"truncate": true`).
    pub truncate: bool,
    /// Bearer token sent with every request.
    pub api_token: Option<String>,
    /// Timeout for one request/response cycle.
    pub timeout: Duration,
    /// Re-normalize every returned vector to unit length.
    pub normalize: bool,
    /// Keep only this many leading dimensions, then re-normalize.
    pub output_dim: Option<usize>,
    /// Idle connections kept per host.
    pub pool_max_idle_per_host: usize,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            endpoints: vec!["http://localhost:8080/embed".into()],
            input_key: "inputs".into(),
            truncate: false,
            api_token: None,
            timeout: Duration::from_secs(120),
            normalize: false,
            output_dim: None,
            pool_max_idle_per_host: 512,
        }
    }
}

impl HttpClientConfig {
    pub fn with_endpoints(mut self, endpoints: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.endpoints = endpoints.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_input_key(mut self, key: impl Into<String>) -> Self {
        self.input_key = key.into();
        self
    }

    pub fn with_truncate(mut self, truncate: bool) -> Self {
        self.truncate = truncate;
        self
    }

    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    pub fn with_output_dim(mut self, dim: Option<usize>) -> Self {
        self.output_dim = dim;
        self
    }

    pub fn with_pool_max_idle_per_host(mut self, n: usize) -> Self {
        self.pool_max_idle_per_host = n;
        self
    }
}

/// Embedding client for TEI, Cloudflare Workers AI and OpenAI-compatible
/// HTTP endpoints. Each call to [`EmbeddingClient::embed`] is exactly one
/// POST; retries are layered on with [`crate::retry::RetryingClient`].
pub struct HttpEmbeddingClient {
    client: Client,
    config: HttpClientConfig,
    next_endpoint: AtomicUsize,
}

impl HttpEmbeddingClient {
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        let endpoints: Vec<String> = config
            .endpoints
            .iter()
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .collect();
        if endpoints.is_empty() {
            return Err(EmbedlineError::Config(
                "at least one inference endpoint is required".into(),
            ));
        }
        if config.input_key.is_empty() {
            return Err(EmbedlineError::Config("input key must not be empty".into()));
        }

        let mut headers = HeaderMap::new();
        if let Some(token) = &config.api_token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token.trim()))
                .map_err(|e| EmbedlineError::Config(format!("invalid API token: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .default_headers(headers)
            .build()
            .map_err(|e| EmbedlineError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            config: HttpClientConfig {
                endpoints,
                ..config
            },
            next_endpoint: AtomicUsize::new(0),
        })
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Picks the next endpoint in round-robin order.
    fn endpoint(&self) -> &str {
        let i = self.next_endpoint.fetch_add(1, Ordering::Relaxed);
        &self.config.endpoints[i % self.config.endpoints.len()]
    }

    fn payload(&self, texts: &[String]) -> Value {
        let mut body = Map::new();
        body.insert(
            self.config.input_key.clone(),
            Value::from(texts.to_vec()),
        );
        if self.config.truncate {
            body.insert("truncate".into(), Value::Bool(true));
        }
        Value::Object(body)
    }

    fn post_process(&self, vectors: &mut [EmbeddingVector]) {
        if let Some(dim) = self.config.output_dim {
            vectors.iter_mut().for_each(|v| v.truncate_normalize(dim));
        } else if self.config.normalize {
            vectors.iter_mut().for_each(EmbeddingVector::normalize);
        }
    }
}

#[async_trait]
impl EmbeddingClient for HttpEmbeddingClient {
    async fn embed(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let url = self.endpoint();
        let response = self
            .client
            .post(url)
            .json(&self.payload(texts))
            .send()
            .await
            .map_err(|e| ClientError::Request(format!("{url}: {e}")))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(MAX_ERROR_BODY).collect();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ClientError::Request(format!("{url}: reading body: {e}")))?;
        let mut vectors = parse_response(&bytes)?;
        if vectors.len() != texts.len() {
            return Err(ClientError::LengthMismatch {
                expected: texts.len(),
                actual: vectors.len(),
            }
            .into());
        }
        self.post_process(&mut vectors);
        Ok(vectors)
    }
}
