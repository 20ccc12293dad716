//! Unverified JWT claim decoding.
//!
//! Tokens arrive from the identity provider over TLS and are only read
//! locally to describe the signed-in user; signature checks are the
//! resource server's job.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;

use super::ProviderIdentity;
use crate::error::{KeygateError, Result};

/// Claims keygate reads from an ID or access token.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct TokenClaims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub preferred_username: Option<String>,
    #[serde(default, rename = "cognito:username")]
    pub cognito_username: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub exp: Option<i64>,
}

impl TokenClaims {
    pub fn into_identity(self) -> ProviderIdentity {
        let username = self
            .cognito_username
            .or(self.username)
            .unwrap_or_else(|| self.sub.clone());
        ProviderIdentity {
            user_id: self.sub,
            username,
            email: self.email,
            preferred_username: self.preferred_username,
        }
    }
}

/// Decode the payload segment of a JWT without verifying it.
pub fn decode_claims(token: &str) -> Result<TokenClaims> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| KeygateError::Authentication("Malformed token".to_string()))?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|err| KeygateError::Authentication(format!("Malformed token payload: {err}")))?;
    Ok(serde_json::from_slice(&bytes)?)
}
