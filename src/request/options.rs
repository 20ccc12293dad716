use bon::Builder;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde_json::Value;

use super::transport::TransportRequest;

/// Caller-supplied transport configuration. Every field is optional and is
/// merged over the executor defaults.
///
/// # Example
/// ```
/// use keygate::request::RequestOptions;
/// use reqwest::Method;
/// use serde_json::json;
///
/// let options = RequestOptions::builder()
///     .method(Method::PUT)
///     .body(json!({ "goals": ["strength"] }))
///     .build();
/// assert_eq!(options.method, Some(Method::PUT));
/// ```
#[derive(Debug, Clone, Default, Builder)]
pub struct RequestOptions {
    pub method: Option<Method>,
    #[builder(default)]
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a header.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn json_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Build the request the transport will see. Neither `defaults` nor
/// `options` is modified; headers are layered defaults → caller →
/// credential, so an injected credential always wins.
pub(crate) fn prepare_request(
    target: &str,
    defaults: &RequestOptions,
    options: Option<&RequestOptions>,
    credential: Option<&str>,
) -> TransportRequest {
    let mut headers = defaults.headers.clone();
    let mut method = defaults.method.clone();
    let mut body = defaults.body.clone();

    if let Some(options) = options {
        for name in options.headers.keys() {
            headers.remove(name);
            for value in options.headers.get_all(name) {
                headers.append(name.clone(), value.clone());
            }
        }
        if options.method.is_some() {
            method = options.method.clone();
        }
        if options.body.is_some() {
            body = options.body.clone();
        }
    }

    if body.is_some() && !headers.contains_key(CONTENT_TYPE) {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }

    if let Some(token) = credential {
        match HeaderValue::from_str(&format!("Bearer {token}")) {
            Ok(mut value) => {
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
            }
            Err(_) => tracing::warn!("credential is not a valid header value; sending without it"),
        }
    }

    TransportRequest {
        target: target.to_string(),
        method: method.unwrap_or(Method::GET),
        headers,
        body,
    }
}
