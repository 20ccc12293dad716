//! Keygate: client-side sessions against an external identity provider.
//!
//! A [`session::SessionStore`] keeps the single authoritative answer to
//! "who is signed in", reconciled from an identity provider and a profile
//! service. A [`request::RequestExecutor`] attaches that session's bearer
//! credential to outbound calls and reports failures through a
//! [`notify::Notifier`].
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use keygate::prelude::*;
//!
//! # async fn example() -> keygate::error::Result<()> {
//! let config = KeygateConfig::from_env();
//! config.validate()?;
//!
//! let tokens = Arc::new(FileTokenStore::new(config.token_store_config()));
//! let provider = CognitoIdentityProvider::new(&config.cognito, tokens)?;
//! let profiles = HttpProfileService::new(config.profile_url());
//! let store = Arc::new(SessionStore::new(Arc::new(provider), Arc::new(profiles)));
//! store.reconcile().await;
//!
//! let context = SessionContext::with_store(store);
//! let executor = RequestExecutor::new(
//!     context,
//!     Arc::new(HttpTransport::new(config.api_base_url.clone())),
//!     Arc::new(TracingNotifier),
//! );
//! let profile: Profile = executor.execute("/api/v1/profile", None).await?;
//! println!("{profile:?}");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod identity;
pub mod notify;
pub mod prelude;
pub mod profile;
pub mod request;
pub mod session;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;
