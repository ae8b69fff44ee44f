// src/utils/http.rs

//! HTTP client utilities.
//!
//! Every outbound call (menu providers and the calendar API) goes through a
//! [`Fetcher`], which applies a per-attempt timeout and a bounded
//! fixed-delay retry loop on top of an [`HttpTransport`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{AppError, Result};

/// Timeout and retry bounds for one logical request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPolicy {
    /// Upper bound for a single attempt
    pub timeout: Duration,
    /// Attempts including the first one
    pub max_attempts: u32,
    /// Fixed pause between attempts (no backoff)
    pub retry_delay: Duration,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_attempts: 7,
            retry_delay: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
}

/// A transport-neutral request description.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub bearer: Option<String>,
    pub body: Option<Value>,
}

impl HttpRequest {
    fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            bearer: None,
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self {
            body: Some(body),
            ..Self::new(Method::Post, url)
        }
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::Delete, url)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 5xx and 429 are worth another attempt; other 4xx are not.
    pub fn is_retryable(&self) -> bool {
        self.status == 429 || (500..600).contains(&self.status)
    }
}

/// Failure below the HTTP status level.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("connection error: {0}")]
    Connect(String),
    #[error("request error: {0}")]
    Other(String),
}

/// Sends a single request attempt.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(
        &self,
        request: &HttpRequest,
        timeout: Duration,
    ) -> std::result::Result<HttpResponse, TransportError>;
}

/// Pauses between attempts and between paced calls.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real wall-clock sleeper.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

/// [`HttpTransport`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a configured asynchronous HTTP client.
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| AppError::config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

fn classify(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else if error.is_connect() {
        TransportError::Connect(error.to_string())
    } else {
        TransportError::Other(error.to_string())
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(
        &self,
        request: &HttpRequest,
        timeout: Duration,
    ) -> std::result::Result<HttpResponse, TransportError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self
            .client
            .request(method, &request.url)
            .timeout(timeout)
            .query(&request.query);
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(classify)?;
        Ok(HttpResponse { status, body })
    }
}

/// Applies the [`FetchPolicy`] to requests sent through a transport.
#[derive(Clone)]
pub struct Fetcher {
    transport: Arc<dyn HttpTransport>,
    sleeper: Arc<dyn Sleeper>,
    policy: FetchPolicy,
}

impl Fetcher {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        sleeper: Arc<dyn Sleeper>,
        policy: FetchPolicy,
    ) -> Self {
        Self {
            transport,
            sleeper,
            policy,
        }
    }

    pub fn policy(&self) -> &FetchPolicy {
        &self.policy
    }

    /// Cooperative rate limiting between calls issued by the same loop.
    pub async fn pause(&self, duration: Duration) {
        self.sleeper.sleep(duration).await;
    }

    /// Send a request, returning the first successful response.
    pub async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        self.execute_with(request, Ok).await
    }

    /// Send a request and decode a JSON body. Undecodable bodies are retried
    /// like transient failures.
    pub async fn fetch_json<T: DeserializeOwned>(&self, request: &HttpRequest) -> Result<T> {
        self.execute_with(request, |response| {
            serde_json::from_str(&response.body).map_err(|e| format!("invalid JSON: {e}"))
        })
        .await
    }

    async fn execute_with<T, F>(&self, request: &HttpRequest, decode: F) -> Result<T>
    where
        F: Fn(HttpResponse) -> std::result::Result<T, String>,
    {
        let attempts = self.policy.max_attempts.max(1);
        let mut last = String::new();

        for attempt in 1..=attempts {
            let failure = match self.transport.send(request, self.policy.timeout).await {
                Ok(response) if response.is_success() => match decode(response) {
                    Ok(value) => return Ok(value),
                    Err(message) => message,
                },
                Ok(response) if response.is_retryable() => format!("HTTP {}", response.status),
                Ok(response) => {
                    log::warn!("HTTP {} from {} (not retried)", response.status, request.url);
                    return Err(AppError::FetchClient {
                        url: request.url.clone(),
                        status: response.status,
                    });
                }
                Err(error) => error.to_string(),
            };

            log::warn!(
                "Request to {} failed, attempt {}/{}: {}",
                request.url,
                attempt,
                attempts,
                failure
            );
            last = failure;

            if attempt < attempts {
                self.sleeper.sleep(self.policy.retry_delay).await;
            }
        }

        Err(AppError::FetchExhausted {
            url: request.url.clone(),
            attempts,
            last,
        })
    }
}
