//! Base HTTP client for the security API.

use crate::Result;
use reqwest::{header, Method, StatusCode, Url};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

/// Result from an integration call.
#[derive(Debug, Clone)]
pub enum IntegrationResult<T> {
    /// Successful result
    Success(T),
    /// The requested resource does not exist
    NotFound,
    /// Service unavailable (timeout or connection failure)
    Unavailable,
    /// Error occurred
    Error {
        /// HTTP status, when the server answered
        status: Option<u16>,
        /// Error detail
        message: String,
    },
}

impl<T> IntegrationResult<T> {
    /// Check if the result is successful.
    pub fn is_success(&self) -> bool {
        matches!(self, IntegrationResult::Success(_))
    }

    /// Get the value if successful.
    pub fn value(&self) -> Option<&T> {
        match self {
            IntegrationResult::Success(v) => Some(v),
            _ => None,
        }
    }

    /// Convert into a crate result. `NotFound` maps to [`crate::Error::NotFound`]
    /// for `name`.
    pub fn into_result(self, service: &str, name: &str) -> Result<T> {
        match self {
            IntegrationResult::Success(v) => Ok(v),
            IntegrationResult::NotFound => Err(crate::Error::not_found(name)),
            IntegrationResult::Unavailable => {
                Err(crate::Error::integration(service, "Service unavailable"))
            }
            IntegrationResult::Error {
                status: Some(status),
                message,
            } => Err(crate::Error::integration_status(service, status, message)),
            IntegrationResult::Error {
                status: None,
                message,
            } => Err(crate::Error::integration(service, message)),
        }
    }
}

/// Basic authentication credentials.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Username
    pub username: String,
    /// Password
    pub password: Option<String>,
}

/// Base client for the security API.
pub struct IntegrationClient {
    base_url: Url,
    timeout: Duration,
    credentials: Option<Credentials>,
    client: reqwest::Client,
}

impl IntegrationClient {
    /// Create a new integration client.
    pub fn new(base_url: &str, timeout: Duration, user_agent: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| crate::Error::config_key(format!("Invalid base URL: {}", e), "api.base_url"))?;
        if base_url.cannot_be_a_base() {
            return Err(crate::Error::config_key(
                "Base URL cannot have path segments",
                "api.base_url",
            ));
        }

        let mut headers = header::HeaderMap::new();
        headers.insert("kbn-xsrf", header::HeaderValue::from_static("true"));

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .default_headers(headers)
            .build()
            .map_err(|e| crate::Error::internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url,
            timeout,
            credentials: None,
            client,
        })
    }

    /// Authenticate requests with basic auth.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Get the timeout duration.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Build a URL from path segments. Segments are percent-encoded.
    pub fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Perform a GET request.
    pub async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> IntegrationResult<T> {
        self.send::<T, ()>(Method::GET, segments, None).await
    }

    /// Perform a POST request.
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> IntegrationResult<T> {
        self.send(Method::POST, segments, Some(body)).await
    }

    /// Perform a DELETE request.
    pub async fn delete<T: DeserializeOwned>(&self, segments: &[&str]) -> IntegrationResult<T> {
        self.send::<T, ()>(Method::DELETE, segments, None).await
    }

    async fn send<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
    ) -> IntegrationResult<T> {
        let url = self.url(segments);
        tracing::debug!(method = %method, url = %url, "Sending request");

        let mut request = self.client.request(method, url);
        if let Some(credentials) = &self.credentials {
            request = request.basic_auth(&credentials.username, credentials.password.as_ref());
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                return if e.is_timeout() || e.is_connect() {
                    IntegrationResult::Unavailable
                } else {
                    IntegrationResult::Error {
                        status: None,
                        message: format!("Request failed: {}", e),
                    }
                };
            }
        };

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return IntegrationResult::NotFound;
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return IntegrationResult::Error {
                status: Some(status.as_u16()),
                message: format!("HTTP error: {} {}", status, detail.trim()),
            };
        }

        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                return IntegrationResult::Error {
                    status: None,
                    message: format!("Failed to read response: {}", e),
                }
            }
        };
        let parsed = if bytes.is_empty() {
            serde_json::from_value(serde_json::Value::Null)
        } else {
            serde_json::from_slice(&bytes)
        };

        match parsed {
            Ok(data) => IntegrationResult::Success(data),
            Err(e) => IntegrationResult::Error {
                status: Some(status.as_u16()),
                message: format!("Failed to parse response: {}", e),
            },
        }
    }
}
