//! Client for shipping log entries to a running aggregator
//!
//! - [`LogClient`]: submits entries with retry and backoff
//! - [`AggregatorLayer`]: a `tracing` layer forwarding application events
//! - [`AsyncShipper`]: background task between the layer and the client

pub mod layer;
pub mod shipper;

pub use layer::AggregatorLayer;
pub use shipper::AsyncShipper;

use crate::models::{LogEntry, NewLogEntry};
use crate::store::LogFilter;
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// Environment variable consulted when no endpoint is configured
pub const ENDPOINT_ENV_VAR: &str = "LOG_AGGREGATOR_API_ENDPOINT";

const MIN_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Client errors
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("api_endpoint must be provided either as an argument or via the {ENDPOINT_ENV_VAR} environment variable")]
    MissingEndpoint,

    #[error("invalid api endpoint '{0}': {1}")]
    InvalidEndpoint(String, url::ParseError),

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("request rejected with status {status}: {body}")]
    Rejected { status: StatusCode, body: String },

    #[error("failed to send log after {attempts} attempts, last error: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Credentials attached to every request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientAuth {
    Basic {
        username: String,
        password: Option<String>,
    },
    Bearer(String),
    Headers(HashMap<String, String>),
}

/// Client settings
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Full URL of the submit endpoint, e.g. `http://localhost:8071/api/logs`
    pub api_endpoint: Option<String>,
    /// Host name reported with every entry
    pub host: String,
    pub auth: Option<ClientAuth>,
    pub timeout: Duration,
    /// Additional attempts after the first failure
    pub retry_attempts: u32,
    /// Base delay, multiplied by the attempt number
    pub retry_delay: Duration,
    pub verify_tls: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_endpoint: None,
            host: local_hostname(),
            auth: None,
            timeout: Duration::from_secs(5),
            retry_attempts: 3,
            retry_delay: Duration::from_secs(1),
            verify_tls: true,
        }
    }
}

impl ClientConfig {
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            api_endpoint: Some(endpoint.into()),
            ..Self::default()
        }
    }

    /// Configured endpoint, falling back to the environment
    fn resolve_endpoint(&self) -> Result<Url, ClientError> {
        let raw = match &self.api_endpoint {
            Some(endpoint) if !endpoint.is_empty() => endpoint.clone(),
            _ => std::env::var(ENDPOINT_ENV_VAR)
                .ok()
                .filter(|v| !v.is_empty())
                .ok_or(ClientError::MissingEndpoint)?,
        };

        Url::parse(&raw).map_err(|e| ClientError::InvalidEndpoint(raw, e))
    }
}

/// Machine host name, or "unknown" when it cannot be determined
pub fn local_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| crate::models::DEFAULT_HOST.to_string())
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    id: i64,
}

/// HTTP client for the aggregation API
#[derive(Debug, Clone)]
pub struct LogClient {
    http: reqwest::Client,
    endpoint: Url,
    health_url: Url,
    host: String,
    auth: Option<ClientAuth>,
    retry_attempts: u32,
    retry_delay: Duration,
}

impl LogClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let endpoint = config.resolve_endpoint()?;
        let health_url = endpoint
            .join("health")
            .map_err(|e| ClientError::InvalidEndpoint(endpoint.to_string(), e))?;

        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(!config.verify_tls);

        if let Some(ClientAuth::Headers(headers)) = &config.auth {
            builder = builder.default_headers(header_map(headers)?);
        }

        Ok(Self {
            http: builder.build()?,
            endpoint,
            health_url,
            host: config.host,
            auth: config.auth,
            retry_attempts: config.retry_attempts,
            retry_delay: config.retry_delay.max(MIN_RETRY_DELAY),
        })
    }

    /// Build a client from `LOG_AGGREGATOR_API_ENDPOINT` and defaults
    pub fn from_env() -> Result<Self, ClientError> {
        Self::new(ClientConfig::default())
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Host name this client reports
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Submit one entry and return the id assigned by the server
    ///
    /// Connection failures, timeouts and 5xx responses are retried with
    /// linear backoff. 4xx responses fail immediately.
    pub async fn send(&self, entry: &NewLogEntry) -> Result<i64, ClientError> {
        let total_attempts = self.retry_attempts + 1;
        let mut last_error = String::new();

        for attempt in 1..=total_attempts {
            let request = self.authorize(self.http.post(self.endpoint.clone())).json(entry);

            match request.send().await {
                Ok(response) if response.status().is_success() => {
                    let body: SubmitResponse = response.json().await?;
                    return Ok(body.id);
                }
                Ok(response) if response.status().is_client_error() => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    return Err(ClientError::Rejected {
                        status,
                        body: truncate(&body, 200),
                    });
                }
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    last_error = format!("status {}: {}", status, truncate(&body, 200));
                }
                Err(e) if e.is_timeout() || e.is_connect() || e.is_request() => {
                    last_error = e.to_string();
                }
                Err(e) => return Err(ClientError::Http(e)),
            }

            if attempt < total_attempts {
                tokio::time::sleep(self.retry_delay * attempt).await;
            }
        }

        Err(ClientError::RetriesExhausted {
            attempts: total_attempts,
            last_error,
        })
    }

    /// Fetch entries from the query endpoint (same URL as submit)
    pub async fn query(&self, filter: &LogFilter) -> Result<Vec<LogEntry>, ClientError> {
        let params: Vec<(&str, &str)> = [
            ("host", filter.host()),
            ("host_process", filter.host_process()),
            ("log_level", filter.log_level()),
            ("timestamp_from", filter.timestamp_from()),
            ("timestamp_to", filter.timestamp_to()),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name, v)))
        .collect();

        let response = self
            .authorize(self.http.get(self.endpoint.clone()))
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Rejected {
                status,
                body: truncate(&body, 200),
            });
        }

        Ok(response.json().await?)
    }

    /// Check connectivity against the health endpoint next to the submit URL
    pub async fn check_connection(&self) -> bool {
        let request = self.authorize(self.http.get(self.health_url.clone()));

        match request.send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                eprintln!(
                    "log-aggregator client: health check failed (status {})",
                    response.status()
                );
                false
            }
            Err(e) => {
                eprintln!("log-aggregator client: health check failed: {}", e);
                false
            }
        }
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            Some(ClientAuth::Basic { username, password }) => {
                request.basic_auth(username, password.as_ref())
            }
            Some(ClientAuth::Bearer(token)) => request.bearer_auth(token),
            // Installed as default headers on the client
            Some(ClientAuth::Headers(_)) | None => request,
        }
    }
}

fn header_map(headers: &HashMap<String, String>) -> Result<reqwest::header::HeaderMap, ClientError> {
    let mut map = reqwest::header::HeaderMap::new();
    for (name, value) in headers {
        let name = reqwest::header::HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ClientError::InvalidHeader(name.clone()))?;
        let value = reqwest::header::HeaderValue::from_str(value)
            .map_err(|_| ClientError::InvalidHeader(name.to_string()))?;
        map.insert(name, value);
    }
    Ok(map)
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_url_is_sibling_of_endpoint() {
        let client = LogClient::new(ClientConfig::with_endpoint("http://localhost:8071/api/logs")).unwrap();
        assert_eq!(client.health_url.as_str(), "http://localhost:8071/api/health");
    }

    #[test]
    fn test_explicit_endpoint_is_used() {
        let client = LogClient::new(ClientConfig::with_endpoint("http://example.test/api/logs")).unwrap();
        assert_eq!(client.endpoint().as_str(), "http://example.test/api/logs");
    }

    #[test]
    fn test_invalid_endpoint_is_rejected() {
        let result = LogClient::new(ClientConfig::with_endpoint("not a url"));
        assert!(matches!(result, Err(ClientError::InvalidEndpoint(_, _))));
    }

    #[test]
    fn test_retry_delay_has_floor() {
        let config = ClientConfig {
            retry_delay: Duration::from_millis(1),
            ..ClientConfig::with_endpoint("http://localhost/api/logs")
        };
        let client = LogClient::new(config).unwrap();
        assert_eq!(client.retry_delay, MIN_RETRY_DELAY);
    }

    #[test]
    fn test_invalid_header_name_is_rejected() {
        let mut headers = HashMap::new();
        headers.insert("bad header".to_string(), "v".to_string());
        let config = ClientConfig {
            auth: Some(ClientAuth::Headers(headers)),
            ..ClientConfig::with_endpoint("http://localhost/api/logs")
        };
        assert!(matches!(
            LogClient::new(config),
            Err(ClientError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_truncate_counts_characters() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("abc", 10), "abc");
    }
}
