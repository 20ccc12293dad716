//! Profile service contract and HTTP implementation.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use serde::{Deserialize, Serialize};

use crate::error::{KeygateError, Result};

/// Profile attributes held by the backend for the signed-in user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub has_completed_onboarding: bool,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub fitness_level: Option<String>,
    #[serde(default)]
    pub goals: Option<Vec<String>>,
    #[serde(default)]
    pub equipment: Option<Vec<String>>,
}

/// Read access to the profile store, authorized by a bearer token.
#[async_trait]
pub trait ProfileService: Send + Sync {
    async fn fetch_profile(&self, access_token: &str) -> Result<Profile>;
}

/// `GET {profile_url}` with `Authorization: Bearer <token>`.
pub struct HttpProfileService {
    client: reqwest::Client,
    url: String,
}

impl HttpProfileService {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

#[async_trait]
impl ProfileService for HttpProfileService {
    async fn fetch_profile(&self, access_token: &str) -> Result<Profile> {
        let resp = self
            .client
            .get(&self.url)
            .headers(bearer_headers(access_token))
            .send()
            .await
            .map_err(|err| KeygateError::ProfileUnavailable(err.to_string()))?;
        if !resp.status().is_success() {
            return Err(KeygateError::ProfileUnavailable(format!(
                "profile request failed with status {}",
                resp.status()
            )));
        }
        resp.json::<Profile>()
            .await
            .map_err(|err| KeygateError::ProfileUnavailable(format!("invalid profile body: {err}")))
    }
}

/// Default headers for a bearer-token JSON API.
pub fn bearer_headers(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    if let Ok(val) = HeaderValue::from_str(&format!("Bearer {token}")) {
        headers.insert(AUTHORIZATION, val);
    }
    headers
}
