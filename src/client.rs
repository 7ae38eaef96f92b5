//! HTTP access to the system under test.
//!
//! Actions talk to the target through the [`HttpClient`] trait. [`ShopClient`]
//! is the reqwest implementation; each virtual user gets its own instance with
//! its own cookie jar so sessions never leak between users.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::errors::{ActionError, ConfigError};
use crate::metrics::{HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION_SECONDS};
use crate::utils::parse_headers_with_escapes;

/// One request to the target.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    /// Path relative to the base URL, or an absolute URL.
    pub path: String,
    /// Label used for logs and metrics; defaults to the path without its query.
    pub name: String,
    pub json: Option<serde_json::Value>,
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        let path = path.into();
        let name = path.split('?').next().unwrap_or_default().to_string();
        Self {
            method,
            path,
            name,
            json: None,
            headers: Vec::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body.
    ///
    /// Payloads are plain derived structs and `json!` values, which always
    /// serialize; a failure would need a non-string map key or a failing
    /// custom `Serialize`, and is sent as `null`.
    pub fn with_json<T: serde::Serialize>(mut self, body: &T) -> Self {
        self.json = Some(serde_json::to_value(body).unwrap_or(serde_json::Value::Null));
        self
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    /// Group requests with ids in their path under one label, e.g. "/cart/[id]".
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// A fully read response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
    pub cookies: HashMap<String, String>,
    /// Label of the request that produced this response.
    pub endpoint: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parse the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ActionError> {
        serde_json::from_str(&self.body).map_err(|source| ActionError::ResponseParse {
            endpoint: self.endpoint.clone(),
            source,
        })
    }

    /// Fail with `UnexpectedStatus` unless the status is 2xx.
    pub fn require_success(self) -> Result<Self, ActionError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ActionError::UnexpectedStatus {
                endpoint: self.endpoint,
                status: self.status,
            })
        }
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }
}

/// Transport used by leaf actions.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Send one request and read the whole response.
    ///
    /// Any status code is returned as `Ok`; only transport failures are errors.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ActionError>;
}

/// Configuration for building per-user HTTP clients.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub timeout: Duration,
    pub skip_tls_verify: bool,
    pub custom_headers: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            skip_tls_verify: false,
            custom_headers: None,
        }
    }
}

/// Builds a cookie-enabled reqwest client.
pub fn build_client(config: &ClientConfig) -> Result<reqwest::Client, ConfigError> {
    let mut client_builder = reqwest::Client::builder()
        .cookie_store(true)
        .timeout(config.timeout);

    let parsed_headers = parse_custom_headers(config.custom_headers.as_deref())?;
    if !parsed_headers.is_empty() {
        client_builder = client_builder.default_headers(parsed_headers);
    }

    if config.skip_tls_verify {
        client_builder = client_builder
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true);
    }

    client_builder
        .build()
        .map_err(|e| ConfigError::Client(e.to_string()))
}

/// Parses `CUSTOM_HEADERS` ("Name:Value,Other:Value") into a header map.
pub fn parse_custom_headers(custom_headers: Option<&str>) -> Result<HeaderMap, ConfigError> {
    let mut parsed_headers = HeaderMap::new();

    let headers_str = match custom_headers {
        Some(s) if !s.trim().is_empty() => s,
        _ => return Ok(parsed_headers),
    };

    for pair in parse_headers_with_escapes(headers_str) {
        let pair = pair.trim();
        let (name, value) = pair.split_once(':').ok_or_else(|| {
            ConfigError::invalid(
                "CUSTOM_HEADERS",
                format!("'{}' is not in 'Name:Value' format", pair),
            )
        })?;

        let name = name.trim();
        if name.is_empty() {
            return Err(ConfigError::invalid(
                "CUSTOM_HEADERS",
                format!("header name cannot be empty in '{}'", pair),
            ));
        }

        let header_name = HeaderName::from_str(name)
            .map_err(|e| ConfigError::invalid("CUSTOM_HEADERS", format!("'{}': {}", name, e)))?;
        let header_value = HeaderValue::from_str(value.trim())
            .map_err(|e| ConfigError::invalid("CUSTOM_HEADERS", format!("'{}': {}", name, e)))?;

        parsed_headers.insert(header_name, header_value);
    }

    Ok(parsed_headers)
}

/// reqwest-backed [`HttpClient`] bound to one base URL.
#[derive(Clone)]
pub struct ShopClient {
    base_url: String,
    client: reqwest::Client,
}

impl ShopClient {
    /// `client` should have `cookie_store(true)` so login cookies are kept.
    pub fn new(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, client }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

#[async_trait]
impl HttpClient for ShopClient {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ActionError> {
        let url = self.url_for(&request.path);
        let method_label = request.method.as_str().to_string();

        let mut builder = self.client.request(request.method.clone(), &url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(ref body) = request.json {
            builder = builder.json(body);
        }

        let started = Instant::now();
        let result = builder.send().await;

        let response = match result {
            Ok(response) => response,
            Err(source) => {
                HTTP_REQUESTS_TOTAL
                    .with_label_values(&[&method_label, &request.name, "error"])
                    .inc();
                return Err(ActionError::Transport {
                    endpoint: request.name,
                    source,
                });
            }
        };

        let status = response.status().as_u16();
        let cookies: HashMap<String, String> = response
            .cookies()
            .map(|c| (c.name().to_string(), c.value().to_string()))
            .collect();

        let body = response
            .text()
            .await
            .map_err(|source| ActionError::Transport {
                endpoint: request.name.clone(),
                source,
            })?;

        let elapsed = started.elapsed();
        HTTP_REQUEST_DURATION_SECONDS
            .with_label_values(&[&request.name])
            .observe(elapsed.as_secs_f64());
        HTTP_REQUESTS_TOTAL
            .with_label_values(&[&method_label, &request.name, &status.to_string()])
            .inc();

        debug!(
            method = %method_label,
            endpoint = %request.name,
            status,
            elapsed_ms = elapsed.as_millis() as u64,
            "Request completed"
        );

        Ok(HttpResponse {
            status,
            body,
            cookies,
            endpoint: request.name,
        })
    }
}
