//! Convenience re-exports for common use.

pub use crate::config::{CognitoConfig, KeygateConfig, SessionRoutes};
pub use crate::error::{KeygateError, Result};
#[cfg(feature = "cognito")]
pub use crate::identity::CognitoIdentityProvider;
pub use crate::identity::{
    FileTokenStore, IdentityProvider, ProviderIdentity, SignInOutcome, SignUpAttributes,
    SignUpOutcome, TokenStore,
};
pub use crate::notify::{Notification, Notifier, Severity, TracingNotifier};
pub use crate::profile::{HttpProfileService, Profile, ProfileService};
pub use crate::request::{
    AuthenticatedRequest, HttpTransport, RequestExecutor, RequestOptions, RequestState, Transport,
    TransportError,
};
pub use crate::session::{Navigation, Session, SessionContext, SessionStore, SessionUser};
pub use crate::util::retry::RetryPolicy;
