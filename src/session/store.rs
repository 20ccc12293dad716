use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{watch, Mutex};

use super::{Navigation, NavigationSink, Session, SessionUser};
use crate::config::SessionRoutes;
use crate::error::{KeygateError, Result};
use crate::identity::{IdentityProvider, SignInOutcome, SignUpAttributes, SignUpOutcome};
use crate::profile::ProfileService;

/// Single source of truth for who is signed in.
///
/// Identity operations (`login`, `register`, `logout`) are serialized, and
/// so are reconciliation passes; a `reconcile` issued while a pass is
/// running waits for it and does not start another.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use keygate::config::KeygateConfig;
/// use keygate::identity::{CognitoIdentityProvider, FileTokenStore};
/// use keygate::profile::HttpProfileService;
/// use keygate::session::SessionStore;
///
/// # async fn example() -> keygate::error::Result<()> {
/// let config = KeygateConfig::from_env();
/// let tokens = Arc::new(FileTokenStore::new(config.token_store_config()));
/// let provider = CognitoIdentityProvider::new(&config.cognito, tokens)?;
/// let store = SessionStore::new(
///     Arc::new(provider),
///     Arc::new(HttpProfileService::new(config.profile_url())),
/// );
/// store.reconcile().await;
/// println!("signed in: {}", store.session().is_authenticated());
/// # Ok(())
/// # }
/// ```
pub struct SessionStore {
    provider: Arc<dyn IdentityProvider>,
    profiles: Arc<dyn ProfileService>,
    routes: SessionRoutes,
    navigation: Option<NavigationSink>,
    state: watch::Sender<Session>,
    reconcile_lock: Mutex<()>,
    completed_passes: AtomicU64,
    operation_lock: Mutex<()>,
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("session", &*self.state.borrow())
            .field("routes", &self.routes)
            .field("navigation", &self.navigation.as_ref().map(|_| ".."))
            .finish()
    }
}

impl SessionStore {
    pub fn new(provider: Arc<dyn IdentityProvider>, profiles: Arc<dyn ProfileService>) -> Self {
        let (state, _) = watch::channel(Session::initial());
        Self {
            provider,
            profiles,
            routes: SessionRoutes::default(),
            navigation: None,
            state,
            reconcile_lock: Mutex::new(()),
            completed_passes: AtomicU64::new(0),
            operation_lock: Mutex::new(()),
        }
    }

    pub fn with_routes(mut self, routes: SessionRoutes) -> Self {
        self.routes = routes;
        self
    }

    pub fn with_navigation_sink(mut self, sink: NavigationSink) -> Self {
        self.navigation = Some(sink);
        self
    }

    /// Current session snapshot.
    pub fn session(&self) -> Session {
        self.state.borrow().clone()
    }

    pub fn identity(&self) -> Option<SessionUser> {
        self.state.borrow().identity.clone()
    }

    pub fn is_resolving(&self) -> bool {
        self.state.borrow().is_resolving
    }

    /// Observe every session transition.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    /// Derive the session from the identity provider and profile service.
    ///
    /// Never fails: collaborator errors are logged and leave the session
    /// unauthenticated. `is_resolving` is always false afterwards.
    pub async fn reconcile(&self) {
        let observed = self.completed_passes.load(Ordering::Acquire);
        let _pass = self.reconcile_lock.lock().await;
        if self.completed_passes.load(Ordering::Acquire) != observed {
            tracing::debug!("reconcile joined a pass that finished while waiting");
            return;
        }
        self.run_pass().await;
    }

    /// Sign in, reconcile, then signal navigation to the authenticated area.
    ///
    /// Provider errors are returned unchanged. When the provider needs a
    /// further step the outcome says so and the session is left alone.
    pub async fn login(&self, email: &str, password: &str) -> Result<SignInOutcome> {
        let _op = self.operation_lock.lock().await;
        self.login_locked(email, password).await
    }

    /// Register with `username` as a secondary attribute and, when the
    /// provider needs no verification step, sign straight in. The chained
    /// sign-in outcome is returned in [`SignUpOutcome::sign_in`].
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        username: &str,
    ) -> Result<SignUpOutcome> {
        self.register_with(password, SignUpAttributes::new(email, username))
            .await
    }

    pub async fn register_with(
        &self,
        password: &str,
        attributes: SignUpAttributes,
    ) -> Result<SignUpOutcome> {
        let _op = self.operation_lock.lock().await;
        let email = attributes.email.clone();
        let outcome = self.provider.sign_up(&email, password, &attributes).await?;
        if !outcome.is_sign_up_complete {
            tracing::debug!(%email, "registration awaiting verification");
            return Ok(outcome);
        }
        let sign_in = self.login_locked(&email, password).await?;
        Ok(SignUpOutcome {
            sign_in: Some(sign_in),
            ..outcome
        })
    }

    /// End the session. Local state is cleared even when the provider call
    /// fails; that failure is only logged.
    pub async fn logout(&self) {
        let _op = self.operation_lock.lock().await;
        if let Err(err) = self.provider.sign_out().await {
            tracing::warn!(error = %err, "provider sign-out failed; clearing local session anyway");
        }
        {
            let _pass = self.reconcile_lock.lock().await;
            self.state.send_modify(|session| {
                session.identity = None;
                session.is_resolving = false;
            });
        }
        tracing::debug!("session cleared");
        self.navigate(Navigation::Unauthenticated {
            route: self.routes.unauthenticated.clone(),
        });
    }

    /// The current bearer credential, or `None` when there is no valid
    /// session. Never fails.
    pub async fn get_credential(&self) -> Option<String> {
        match self.provider.token_session().await {
            Ok(Some(tokens)) if !tokens.access_token.is_expired() => Some(tokens.access_token.value),
            Ok(_) => None,
            Err(err) => {
                tracing::debug!(error = %err, "credential lookup failed");
                None
            }
        }
    }

    async fn login_locked(&self, email: &str, password: &str) -> Result<SignInOutcome> {
        let outcome = self.provider.sign_in(email, password).await?;
        if !outcome.is_signed_in {
            tracing::debug!(next_step = ?outcome.next_step, "sign-in incomplete");
            return Ok(outcome);
        }
        {
            let _pass = self.reconcile_lock.lock().await;
            self.run_pass().await;
        }
        self.navigate(Navigation::Authenticated {
            route: self.routes.authenticated.clone(),
        });
        Ok(outcome)
    }

    /// One reconciliation pass. Caller holds `reconcile_lock`.
    async fn run_pass(&self) {
        let mut finalizer = Finalizer::armed(&self.state);
        let identity = match self.resolve().await {
            Ok(identity) => identity,
            Err(err) => {
                tracing::warn!(error = %err, "session reconciliation failed");
                None
            }
        };
        finalizer.disarm();
        tracing::debug!(authenticated = identity.is_some(), "session reconciled");
        self.state.send_replace(Session {
            identity,
            is_resolving: false,
        });
        self.completed_passes.fetch_add(1, Ordering::AcqRel);
    }

    async fn resolve(&self) -> Result<Option<SessionUser>> {
        let identity = match self.provider.current_identity().await {
            Ok(identity) => identity,
            Err(KeygateError::NotAuthenticated) => {
                tracing::debug!("no signed-in identity");
                return Ok(None);
            }
            Err(err) => return Err(err),
        };
        let Some(tokens) = self.provider.token_session().await? else {
            tracing::debug!("identity present but no token session");
            return Ok(None);
        };
        if tokens.access_token.is_expired() {
            tracing::debug!("access token expired");
            return Ok(None);
        }
        let profile = self
            .profiles
            .fetch_profile(&tokens.access_token.value)
            .await?;
        let user = SessionUser::from_parts(identity, &profile);
        if user.is_none() {
            tracing::warn!("identity is missing required fields; treating as signed out");
        }
        Ok(user)
    }

    fn navigate(&self, navigation: Navigation) {
        tracing::debug!(route = navigation.route(), "navigate");
        if let Some(sink) = &self.navigation {
            sink(navigation);
        }
    }
}

/// Settles the session if a pass is dropped before it finishes.
struct Finalizer<'a> {
    state: &'a watch::Sender<Session>,
    armed: bool,
}

impl<'a> Finalizer<'a> {
    fn armed(state: &'a watch::Sender<Session>) -> Self {
        Self { state, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for Finalizer<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.state.send_replace(Session {
                identity: None,
                is_resolving: false,
            });
        }
    }
}
