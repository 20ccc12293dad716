//! Identity provider contract, token storage, and provider implementations.

pub mod claims;
#[cfg(feature = "cognito")]
pub mod cognito;
pub mod credentials;
pub mod store;
pub mod token;

#[cfg(feature = "cognito")]
pub use cognito::CognitoIdentityProvider;
pub use credentials::{validate_registration, RegistrationInput};
pub use store::{FileTokenStore, TokenStore, TokenStoreConfig};
pub use token::Token;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;

/// Identity as recognized locally by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderIdentity {
    pub user_id: String,
    pub username: String,
    pub email: Option<String>,
    pub preferred_username: Option<String>,
}

/// A token value together with its expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiringToken {
    pub value: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl ExpiringToken {
    /// A token without a known expiry never reports itself expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|exp| exp <= now).unwrap_or(false)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Tokens for the current provider session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSession {
    pub access_token: ExpiringToken,
    pub id_token: Option<ExpiringToken>,
}

impl From<&Token> for TokenSession {
    fn from(token: &Token) -> Self {
        Self {
            access_token: ExpiringToken {
                value: token.access_token.clone(),
                expires_at: token.expires_at,
            },
            id_token: token.id_token.as_ref().map(|value| ExpiringToken {
                value: value.clone(),
                expires_at: token.expires_at,
            }),
        }
    }
}

/// Result of a sign-in attempt that the provider did not reject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInOutcome {
    pub is_signed_in: bool,
    /// Further step required before the session exists (e.g. a challenge name).
    pub next_step: Option<String>,
}

impl SignInOutcome {
    pub fn signed_in() -> Self {
        Self {
            is_signed_in: true,
            next_step: None,
        }
    }

    pub fn pending(step: impl Into<String>) -> Self {
        Self {
            is_signed_in: false,
            next_step: Some(step.into()),
        }
    }
}

/// Result of an account registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpOutcome {
    pub is_sign_up_complete: bool,
    pub user_id: Option<String>,
    /// Outcome of the sign-in chained after a completed registration.
    /// Providers leave this `None`.
    pub sign_in: Option<SignInOutcome>,
}

/// Secondary profile attributes sent with a sign-up. The email stays the
/// primary identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignUpAttributes {
    pub email: String,
    pub preferred_username: String,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
}

impl SignUpAttributes {
    pub fn new(email: impl Into<String>, preferred_username: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            preferred_username: preferred_username.into(),
            ..Default::default()
        }
    }
}

/// External service of record for credentials and session tokens.
///
/// Implementations own durable token storage; the session layer never
/// persists tokens itself.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The identity currently recognized locally. Fails with
    /// [`KeygateError::NotAuthenticated`](crate::error::KeygateError::NotAuthenticated)
    /// when nobody is signed in.
    async fn current_identity(&self) -> Result<ProviderIdentity>;

    /// The current token session, if any.
    async fn token_session(&self) -> Result<Option<TokenSession>>;

    async fn sign_in(&self, username: &str, password: &str) -> Result<SignInOutcome>;

    async fn sign_up(
        &self,
        username: &str,
        password: &str,
        attributes: &SignUpAttributes,
    ) -> Result<SignUpOutcome>;

    async fn sign_out(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn token_without_expiry_is_never_expired() {
        let token = ExpiringToken {
            value: "abc".to_string(),
            expires_at: None,
        };
        assert!(!token.is_expired());
    }

    #[test]
    fn token_expires_at_boundary() {
        let now = Utc::now();
        let token = ExpiringToken {
            value: "abc".to_string(),
            expires_at: Some(now),
        };
        assert!(token.is_expired_at(now));
        assert!(!token.is_expired_at(now - Duration::seconds(1)));
    }

    #[test]
    fn token_session_from_stored_token_carries_expiry() {
        let expires_at = Utc::now() + Duration::hours(1);
        let stored = Token {
            access_token: "access".to_string(),
            refresh_token: Some("refresh".to_string()),
            id_token: Some("id".to_string()),
            expires_at: Some(expires_at),
            last_refresh: None,
        };
        let session = TokenSession::from(&stored);
        assert_eq!(session.access_token.value, "access");
        assert_eq!(session.access_token.expires_at, Some(expires_at));
        assert_eq!(session.id_token.map(|t| t.value).as_deref(), Some("id"));
    }
}
