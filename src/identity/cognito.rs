//! Cognito user-pool identity provider over the JSON wire protocol.

use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::Sha256;
use tokio::sync::Mutex;

use super::claims::decode_claims;
use super::store::TokenStore;
use super::token::Token;
use super::{
    IdentityProvider, ProviderIdentity, SignInOutcome, SignUpAttributes, SignUpOutcome,
    TokenSession,
};
use crate::config::CognitoConfig;
use crate::error::{KeygateError, Result};

const TOKEN_STORE_KEY: &str = "cognito";
const TARGET_PREFIX: &str = "AWSCognitoIdentityProviderService";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";

type HmacSha256 = Hmac<Sha256>;

/// Cognito user-pool client.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use keygate::config::CognitoConfig;
/// use keygate::identity::{CognitoIdentityProvider, FileTokenStore, TokenStoreConfig};
///
/// let store = FileTokenStore::new(TokenStoreConfig::new(std::path::PathBuf::from("/tmp")));
/// let config = CognitoConfig {
///     user_pool_id: "us-east-1_example".to_string(),
///     client_id: "client-id".to_string(),
///     ..CognitoConfig::default()
/// };
/// let provider = CognitoIdentityProvider::new(&config, Arc::new(store))?;
/// # Ok::<(), keygate::error::KeygateError>(())
/// ```
pub struct CognitoIdentityProvider {
    client: reqwest::Client,
    endpoint: String,
    client_id: String,
    client_secret: Option<String>,
    token_store: Arc<dyn TokenStore>,
    profile: String,
    refresh_lock: Mutex<()>,
}

impl CognitoIdentityProvider {
    pub fn new(config: &CognitoConfig, token_store: Arc<dyn TokenStore>) -> Result<Self> {
        if config.client_id.trim().is_empty() {
            return Err(KeygateError::Configuration(
                "Missing required Cognito configuration".to_string(),
            ));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint: config.endpoint_url(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            token_store,
            profile: "default".to_string(),
            refresh_lock: Mutex::new(()),
        })
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    pub fn with_endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = url.into();
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Complete a verification-pending registration.
    pub async fn confirm_sign_up(&self, username: &str, code: &str) -> Result<()> {
        let mut body = json!({
            "ClientId": self.client_id,
            "Username": username,
            "ConfirmationCode": code,
        });
        if let Some(hash) = self.secret_hash(username)? {
            body["SecretHash"] = Value::String(hash);
        }
        let _: Value = self.call("ConfirmSignUp", body).await?;
        tracing::debug!(username, "sign-up confirmed");
        Ok(())
    }

    /// `Base64(HMAC_SHA256(client_secret, username + client_id))`, or `None`
    /// for public app clients.
    pub fn secret_hash(&self, username: &str) -> Result<Option<String>> {
        let Some(secret) = self.client_secret.as_deref() else {
            return Ok(None);
        };
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|err| KeygateError::Configuration(format!("Invalid client secret: {err}")))?;
        mac.update(username.as_bytes());
        mac.update(self.client_id.as_bytes());
        Ok(Some(STANDARD.encode(mac.finalize().into_bytes())))
    }

    fn stored_token(&self) -> Result<Option<Token>> {
        self.token_store.load(TOKEN_STORE_KEY, &self.profile)
    }

    async fn call<T: DeserializeOwned>(&self, action: &str, body: Value) -> Result<T> {
        let resp = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", CONTENT_TYPE)
            .header("X-Amz-Target", format!("{TARGET_PREFIX}.{action}"))
            .body(body.to_string())
            .send()
            .await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            tracing::warn!(action, status = status.as_u16(), "identity provider rejected request");
            return Err(map_cognito_error(status.as_u16(), &text));
        }
        if text.trim().is_empty() {
            return Ok(serde_json::from_value(Value::Object(Default::default()))?);
        }
        Ok(serde_json::from_str(&text)?)
    }

    async fn refresh(&self, token: &Token) -> Result<Option<Token>> {
        let Some(refresh_token) = token.refresh_token.as_deref() else {
            return Ok(None);
        };
        let mut parameters = json!({ "REFRESH_TOKEN": refresh_token });
        if self.client_secret.is_some() {
            let subject = token
                .id_token
                .as_deref()
                .or(Some(token.access_token.as_str()))
                .and_then(|jwt| decode_claims(jwt).ok())
                .map(|claims| claims.into_identity().username)
                .unwrap_or_default();
            if let Some(hash) = self.secret_hash(&subject)? {
                parameters["SECRET_HASH"] = Value::String(hash);
            }
        }
        let body = json!({
            "ClientId": self.client_id,
            "AuthFlow": "REFRESH_TOKEN_AUTH",
            "AuthParameters": parameters,
        });
        let response: InitiateAuthResponse = match self.call("InitiateAuth", body).await {
            Ok(response) => response,
            Err(KeygateError::Authentication(reason)) => {
                tracing::debug!(%reason, "refresh token rejected; clearing stored session");
                self.token_store.clear(TOKEN_STORE_KEY, &self.profile)?;
                return Ok(None);
            }
            Err(err) => return Err(err),
        };
        let Some(result) = response.authentication_result else {
            return Ok(None);
        };
        let refreshed = result.into_token(token.refresh_token.clone());
        self.token_store
            .save(TOKEN_STORE_KEY, &self.profile, &refreshed)?;
        tracing::debug!("access token refreshed");
        Ok(Some(refreshed))
    }
}

#[async_trait]
impl IdentityProvider for CognitoIdentityProvider {
    async fn current_identity(&self) -> Result<ProviderIdentity> {
        let token = self.stored_token()?.ok_or(KeygateError::NotAuthenticated)?;
        let jwt = token.id_token.as_deref().unwrap_or(&token.access_token);
        Ok(decode_claims(jwt)?.into_identity())
    }

    async fn token_session(&self) -> Result<Option<TokenSession>> {
        let Some(token) = self.stored_token()? else {
            return Ok(None);
        };
        if !token.is_expired() {
            return Ok(Some(TokenSession::from(&token)));
        }
        // One refresh at a time; waiters pick up the token it saved.
        let _refresh = self.refresh_lock.lock().await;
        let Some(token) = self.stored_token()? else {
            return Ok(None);
        };
        if !token.is_expired() {
            return Ok(Some(TokenSession::from(&token)));
        }
        Ok(self
            .refresh(&token)
            .await?
            .map(|fresh| TokenSession::from(&fresh)))
    }

    async fn sign_in(&self, username: &str, password: &str) -> Result<SignInOutcome> {
        let mut parameters = json!({
            "USERNAME": username,
            "PASSWORD": password,
        });
        if let Some(hash) = self.secret_hash(username)? {
            parameters["SECRET_HASH"] = Value::String(hash);
        }
        let body = json!({
            "ClientId": self.client_id,
            "AuthFlow": "USER_PASSWORD_AUTH",
            "AuthParameters": parameters,
        });
        let response: InitiateAuthResponse = self.call("InitiateAuth", body).await?;

        if let Some(challenge) = response.challenge_name {
            tracing::debug!(%challenge, "sign-in requires a further step");
            return Ok(SignInOutcome::pending(challenge));
        }
        let result = response.authentication_result.ok_or_else(|| {
            KeygateError::provider("INVALID_RESPONSE", "Sign-in response carried no tokens")
        })?;
        let token = result.into_token(None);
        self.token_store
            .save(TOKEN_STORE_KEY, &self.profile, &token)?;
        Ok(SignInOutcome::signed_in())
    }

    async fn sign_up(
        &self,
        username: &str,
        password: &str,
        attributes: &SignUpAttributes,
    ) -> Result<SignUpOutcome> {
        let mut user_attributes = vec![
            json!({ "Name": "email", "Value": attributes.email }),
            json!({ "Name": "preferred_username", "Value": attributes.preferred_username }),
        ];
        if let Some(given) = &attributes.given_name {
            user_attributes.push(json!({ "Name": "given_name", "Value": given }));
        }
        if let Some(family) = &attributes.family_name {
            user_attributes.push(json!({ "Name": "family_name", "Value": family }));
        }
        let mut body = json!({
            "ClientId": self.client_id,
            "Username": username,
            "Password": password,
            "UserAttributes": user_attributes,
        });
        if let Some(hash) = self.secret_hash(username)? {
            body["SecretHash"] = Value::String(hash);
        }
        let response: SignUpResponse = self.call("SignUp", body).await?;
        Ok(SignUpOutcome {
            is_sign_up_complete: response.user_confirmed,
            user_id: response.user_sub,
            sign_in: None,
        })
    }

    async fn sign_out(&self) -> Result<()> {
        let remote = match self.stored_token()? {
            Some(token) => self
                .call::<Value>("GlobalSignOut", json!({ "AccessToken": token.access_token }))
                .await
                .map(|_| ()),
            None => Ok(()),
        };
        self.token_store.clear(TOKEN_STORE_KEY, &self.profile)?;
        remote
    }
}

#[derive(Debug, Deserialize)]
struct InitiateAuthResponse {
    #[serde(rename = "ChallengeName")]
    challenge_name: Option<String>,
    #[serde(rename = "AuthenticationResult")]
    authentication_result: Option<AuthenticationResult>,
}

#[derive(Debug, Deserialize)]
struct AuthenticationResult {
    #[serde(rename = "AccessToken")]
    access_token: String,
    #[serde(rename = "IdToken")]
    id_token: Option<String>,
    #[serde(rename = "RefreshToken")]
    refresh_token: Option<String>,
    #[serde(rename = "ExpiresIn")]
    expires_in: Option<i64>,
}

impl AuthenticationResult {
    fn into_token(self, fallback_refresh: Option<String>) -> Token {
        let now = Utc::now();
        Token {
            access_token: self.access_token,
            refresh_token: self.refresh_token.or(fallback_refresh),
            id_token: self.id_token,
            expires_at: self.expires_in.map(|secs| now + Duration::seconds(secs)),
            last_refresh: Some(now),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SignUpResponse {
    #[serde(rename = "UserConfirmed", default)]
    user_confirmed: bool,
    #[serde(rename = "UserSub")]
    user_sub: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CognitoErrorBody {
    #[serde(rename = "__type", default)]
    kind: String,
    #[serde(alias = "Message", default)]
    message: Option<String>,
}

/// Map a Cognito error response onto the keygate error taxonomy.
fn map_cognito_error(status: u16, body: &str) -> KeygateError {
    let parsed: CognitoErrorBody = serde_json::from_str(body).unwrap_or(CognitoErrorBody {
        kind: String::new(),
        message: None,
    });
    let kind = parsed.kind.rsplit('#').next().unwrap_or_default();
    let message = |fallback: &str| parsed.message.clone().unwrap_or_else(|| fallback.to_string());

    match kind {
        "NotAuthorizedException" => {
            KeygateError::Authentication(message("Invalid email or password"))
        }
        "UserNotFoundException" => KeygateError::Authentication(message("User not found")),
        "UserNotConfirmedException" => {
            KeygateError::Authentication(message("User account not confirmed"))
        }
        "PasswordResetRequiredException" => {
            KeygateError::Authentication(message("Password reset required"))
        }
        "UsernameExistsException" => {
            KeygateError::provider("USER_EXISTS", message("User with this email already exists"))
        }
        "InvalidPasswordException" => {
            KeygateError::provider("INVALID_PASSWORD", message("Password does not meet policy"))
        }
        "InvalidParameterException" => {
            KeygateError::provider("INVALID_PARAMETER", message("Invalid parameter"))
        }
        "CodeMismatchException" => {
            KeygateError::provider("CODE_MISMATCH", message("Invalid verification code"))
        }
        "ExpiredCodeException" => {
            KeygateError::provider("EXPIRED_CODE", message("Verification code expired"))
        }
        "TooManyRequestsException" | "LimitExceededException" => {
            KeygateError::provider("RATE_LIMITED", message("Too many requests"))
        }
        "InternalErrorException" => {
            KeygateError::provider("INTERNAL_ERROR", message("Identity provider failure"))
        }
        _ if status >= 500 => KeygateError::Network(format!(
            "Identity provider unavailable (status {status})"
        )),
        _ => KeygateError::provider("PROVIDER_ERROR", message("Identity provider request failed")),
    }
}
