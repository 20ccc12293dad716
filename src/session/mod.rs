//! Process-wide session state and the identity operations that drive it.

pub mod context;
pub mod store;

pub use context::SessionContext;
pub use store::SessionStore;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::identity::ProviderIdentity;
use crate::profile::Profile;

/// The signed-in user as seen by the rest of the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    pub email: String,
    pub username: String,
    pub has_completed_onboarding: Option<bool>,
}

impl SessionUser {
    /// Merge provider identity and profile data. Returns `None` unless every
    /// required field ends up non-empty.
    pub fn from_parts(identity: ProviderIdentity, profile: &Profile) -> Option<Self> {
        let email = identity
            .email
            .filter(|value| !value.trim().is_empty())
            .or_else(|| profile.email.clone())?;
        let username = identity
            .preferred_username
            .filter(|value| !value.trim().is_empty())
            .or_else(|| profile.username.clone())
            .unwrap_or(identity.username);
        let user = Self {
            id: identity.user_id,
            email,
            username,
            has_completed_onboarding: Some(profile.has_completed_onboarding),
        };
        user.is_complete().then_some(user)
    }

    pub fn is_complete(&self) -> bool {
        [&self.id, &self.email, &self.username]
            .iter()
            .all(|field| !field.trim().is_empty())
    }
}

/// Snapshot of the session record. Replaced whole on every transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub identity: Option<SessionUser>,
    pub is_resolving: bool,
}

impl Session {
    /// State at process start: nobody known yet, first pass pending.
    pub fn initial() -> Self {
        Self {
            identity: None,
            is_resolving: true,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::initial()
    }
}

/// Where the caller should take the user after an identity operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Authenticated { route: String },
    Unauthenticated { route: String },
}

impl Navigation {
    pub fn route(&self) -> &str {
        match self {
            Self::Authenticated { route } | Self::Unauthenticated { route } => route,
        }
    }
}

/// Receives navigation signals.
pub type NavigationSink = Arc<dyn Fn(Navigation) + Send + Sync>;
