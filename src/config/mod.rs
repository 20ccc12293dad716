//! Configuration (layered: code > env > `.env` file > defaults).

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{KeygateError, Result};
use crate::identity::TokenStoreConfig;

const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_PROFILE_PATH: &str = "/api/v1/profile";
const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_AUTHENTICATED_ROUTE: &str = "/dashboard";
const DEFAULT_UNAUTHENTICATED_ROUTE: &str = "/login";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Identity-provider connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CognitoConfig {
    pub region: String,
    pub user_pool_id: String,
    pub client_id: String,
    pub client_secret: Option<String>,
    /// Overrides the regional endpoint (local emulators, tests).
    pub endpoint: Option<String>,
}

impl Default for CognitoConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            user_pool_id: String::new(),
            client_id: String::new(),
            client_secret: None,
            endpoint: None,
        }
    }
}

impl CognitoConfig {
    pub fn endpoint_url(&self) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| format!("https://cognito-idp.{}.amazonaws.com/", self.region))
    }
}

/// Where the session layer sends the user after identity operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRoutes {
    pub authenticated: String,
    pub unauthenticated: String,
}

impl Default for SessionRoutes {
    fn default() -> Self {
        Self {
            authenticated: DEFAULT_AUTHENTICATED_ROUTE.to_string(),
            unauthenticated: DEFAULT_UNAUTHENTICATED_ROUTE.to_string(),
        }
    }
}

/// Process configuration for keygate.
#[derive(Debug, Clone)]
pub struct KeygateConfig {
    pub api_base_url: String,
    pub profile_path: String,
    pub cognito: CognitoConfig,
    pub routes: SessionRoutes,
    pub request_timeout: Duration,
    pub token_dir: PathBuf,
}

impl Default for KeygateConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            profile_path: DEFAULT_PROFILE_PATH.to_string(),
            cognito: CognitoConfig::default(),
            routes: SessionRoutes::default(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            token_dir: TokenStoreConfig::default_dir(),
        }
    }
}

impl KeygateConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from environment variables (`KEYGATE_*`, `AWS_REGION`, `COGNITO_*`).
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        let mut config = Self::new();

        if let Some(url) = env_var("KEYGATE_API_BASE_URL") {
            config.api_base_url = url;
        }
        if let Some(path) = env_var("KEYGATE_PROFILE_PATH") {
            config.profile_path = path;
        }
        if let Some(region) = env_var("AWS_REGION") {
            config.cognito.region = region;
        }
        if let Some(pool) = env_var("COGNITO_USER_POOL_ID") {
            config.cognito.user_pool_id = pool;
        }
        if let Some(client_id) = env_var("COGNITO_CLIENT_ID") {
            config.cognito.client_id = client_id;
        }
        config.cognito.client_secret = env_var("COGNITO_CLIENT_SECRET");
        config.cognito.endpoint = env_var("COGNITO_ENDPOINT");
        if let Some(route) = env_var("KEYGATE_AUTHENTICATED_ROUTE") {
            config.routes.authenticated = route;
        }
        if let Some(route) = env_var("KEYGATE_UNAUTHENTICATED_ROUTE") {
            config.routes.unauthenticated = route;
        }
        if let Some(raw) = env_var("KEYGATE_REQUEST_TIMEOUT_SECS") {
            match raw.parse::<u64>() {
                Ok(secs) => config.request_timeout = Duration::from_secs(secs),
                Err(_) => tracing::warn!(value = %raw, "ignoring invalid KEYGATE_REQUEST_TIMEOUT_SECS"),
            }
        }
        if let Some(dir) = env_var("KEYGATE_TOKEN_DIR") {
            config.token_dir = PathBuf::from(dir);
        }

        config
    }

    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn with_cognito(mut self, cognito: CognitoConfig) -> Self {
        self.cognito = cognito;
        self
    }

    pub fn with_routes(mut self, routes: SessionRoutes) -> Self {
        self.routes = routes;
        self
    }

    pub fn with_token_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.token_dir = dir.into();
        self
    }

    /// Check the settings every identity operation depends on.
    pub fn validate(&self) -> Result<()> {
        if self.cognito.user_pool_id.trim().is_empty() || self.cognito.client_id.trim().is_empty()
        {
            return Err(KeygateError::Configuration(
                "Missing required Cognito configuration".to_string(),
            ));
        }
        if self.api_base_url.trim().is_empty() {
            return Err(KeygateError::Configuration(
                "API base URL must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn profile_url(&self) -> String {
        join_url(&self.api_base_url, &self.profile_path)
    }

    pub fn token_store_config(&self) -> TokenStoreConfig {
        TokenStoreConfig::new(self.token_dir.clone())
    }
}

/// Join a base URL and a path with exactly one slash between them.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}
