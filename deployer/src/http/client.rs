//! HTTP client implementation

use std::time::Duration;

use reqwest::{Client, Method};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error, warn};

use crate::errors::DeployError;
use crate::http::retry::RetryPolicy;

const API_KEY_HEADER: &str = "x-api-key";

/// Whether a request may be repeated after a transient failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Idempotency {
    Retryable,
    Once,
}

/// HTTP client for the provider API
pub struct HttpClient {
    client: Client,
    base_url: String,
    api_key: SecretString,
    retry: RetryPolicy,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(
        base_url: &str,
        api_key: &SecretString,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, DeployError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("cvm-deployer/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: SecretString::from(api_key.expose_secret().to_owned()),
            retry,
        })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, DeployError> {
        self.execute(Method::GET, path, None::<&()>, Idempotency::Retryable)
            .await
    }

    /// Make a POST request
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
        idempotency: Idempotency,
    ) -> Result<T, DeployError> {
        self.execute(Method::POST, path, Some(body), idempotency).await
    }

    /// Make a PUT request
    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, DeployError> {
        self.execute(Method::PUT, path, Some(body), Idempotency::Retryable)
            .await
    }

    async fn execute<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        idempotency: Idempotency,
    ) -> Result<T, DeployError> {
        let url = format!("{}{}", self.base_url, path);
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!("{} {} (attempt {})", method, url, attempt);

            let mut request = self
                .client
                .request(method.clone(), &url)
                .header(API_KEY_HEADER, self.api_key.expose_secret());
            if let Some(body) = body {
                request = request.json(body);
            }

            let (err, retryable) = match request.send().await {
                Ok(response) if response.status().is_success() => {
                    let text = response.text().await?;
                    return parse_body(&text);
                }
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    error!("HTTP {} {} failed: {} - {}", method, path, status, body);
                    let retryable = self.retry.is_retryable_status(status);
                    (DeployError::ProviderApi { status, body }, retryable)
                }
                Err(e) => {
                    error!("HTTP {} {} transport failure: {}", method, path, e);
                    let retryable = self.retry.is_retryable_error(&e);
                    (DeployError::HttpError(e), retryable)
                }
            };

            if idempotency == Idempotency::Once || !retryable || !self.retry.should_retry(attempt) {
                return Err(err);
            }

            let delay = self.retry.delay_for(attempt);
            warn!(
                "Retrying {} {} in {:?} (attempt {} of {})",
                method,
                path,
                delay,
                attempt + 1,
                self.retry.max_attempts
            );
            tokio::time::sleep(delay).await;
        }
    }
}

// Some endpoints answer 2xx with an empty body
fn parse_body<T: DeserializeOwned>(text: &str) -> Result<T, DeployError> {
    if text.trim().is_empty() {
        return Ok(serde_json::from_value(serde_json::Value::Null)?);
    }
    Ok(serde_json::from_str(text)?)
}
