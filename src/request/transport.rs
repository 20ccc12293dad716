//! Transport contract and the shared reqwest-backed implementation.

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::Method;
use serde_json::Value;
use thiserror::Error;

use crate::config::join_url;

static SHARED_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

/// A fully prepared request, owned by one executor invocation.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// Path relative to the transport's base URL, or an absolute URL.
    pub target: String,
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: HeaderMap,
    /// Parsed JSON body; `Value::Null` when the response had no body.
    pub body: Value,
}

/// A failed transport call, with the structured error body when the server
/// sent one.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{}", self.describe())]
pub struct TransportError {
    pub status: Option<u16>,
    pub message: String,
    pub body: Option<Value>,
}

impl TransportError {
    pub fn status(status: u16, message: impl Into<String>, body: Option<Value>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
            body,
        }
    }

    /// The server could not be reached or the exchange broke off.
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
            body: None,
        }
    }

    /// Human-readable text from the body's `detail` field.
    ///
    /// Understands a plain string, an object carrying `message`, and a list
    /// of validation items carrying `msg`.
    pub fn detail(&self) -> Option<String> {
        match self.body.as_ref()?.get("detail")? {
            Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
            Value::Object(map) => map
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string),
            Value::Array(items) => {
                let messages: Vec<&str> = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(Value::as_str))
                    .collect();
                (!messages.is_empty()).then(|| messages.join("; "))
            }
            _ => None,
        }
    }

    fn describe(&self) -> String {
        match self.status {
            Some(status) => format!("request failed with status {status}: {}", self.message),
            None => format!("request failed: {}", self.message),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        match error.status() {
            Some(status) => Self::status(status.as_u16(), error.to_string(), None),
            None => Self::unreachable(error.to_string()),
        }
    }
}

/// Performs one network exchange.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}

/// Get (or create) the shared reqwest client.
pub fn shared_client() -> &'static reqwest::Client {
    SHARED_CLIENT.get_or_init(|| {
        build_client(Duration::from_secs(120)).unwrap_or_else(|_| reqwest::Client::new())
    })
}

pub fn build_client(timeout: Duration) -> Result<reqwest::Client, TransportError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .pool_max_idle_per_host(10)
        .build()
        .map_err(TransportError::from)
}

/// JSON-over-HTTP transport rooted at an API base URL.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: shared_client().clone(),
            base_url: base_url.into(),
        }
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    fn resolve(&self, target: &str) -> String {
        if target.starts_with("http://") || target.starts_with("https://") {
            target.to_string()
        } else {
            join_url(&self.base_url, target)
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let url = self.resolve(&request.target);
        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .headers(request.headers);
        if let Some(body) = &request.body {
            builder = builder.body(body.to_string());
        }

        let resp = builder.send().await?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let text = resp.text().await?;
        let body = parse_body(&text);

        if !status.is_success() {
            tracing::debug!(%url, status = status.as_u16(), "request returned error status");
            let message = status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string();
            return Err(TransportError::status(status.as_u16(), message, body));
        }

        Ok(TransportResponse {
            status: status.as_u16(),
            headers,
            body: body.unwrap_or(Value::Null),
        })
    }
}

/// JSON when it parses, the raw text as a string otherwise, nothing when empty.
fn parse_body(text: &str) -> Option<Value> {
    if text.trim().is_empty() {
        return None;
    }
    Some(serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string())))
}
