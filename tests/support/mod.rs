#![allow(dead_code)]

//! Scriptable fakes for the session store and request executor.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use serde_json::Value;

use keygate::error::{KeygateError, Result};
use keygate::identity::{
    ExpiringToken, IdentityProvider, ProviderIdentity, SignInOutcome, SignUpAttributes,
    SignUpOutcome, Token, TokenSession, TokenStore,
};
use keygate::notify::{Notification, Notifier};
use keygate::profile::{Profile, ProfileService};
use keygate::request::{Transport, TransportError, TransportRequest, TransportResponse};
use keygate::session::{Navigation, NavigationSink};

pub fn identity() -> ProviderIdentity {
    ProviderIdentity {
        user_id: "user-1".to_string(),
        username: "a@b.com".to_string(),
        email: Some("a@b.com".to_string()),
        preferred_username: Some("ada".to_string()),
    }
}

pub fn valid_tokens(access_token: &str) -> TokenSession {
    TokenSession {
        access_token: ExpiringToken {
            value: access_token.to_string(),
            expires_at: Some(Utc::now() + chrono::Duration::hours(1)),
        },
        id_token: None,
    }
}

pub fn expired_tokens(access_token: &str) -> TokenSession {
    TokenSession {
        access_token: ExpiringToken {
            value: access_token.to_string(),
            expires_at: Some(Utc::now() - chrono::Duration::minutes(5)),
        },
        id_token: None,
    }
}

/// What the fake does on `sign_in`.
#[derive(Debug, Clone)]
pub enum SignInScript {
    /// Succeed and make `identity` current with a valid token.
    Succeed {
        identity: ProviderIdentity,
        access_token: String,
    },
    Pending(String),
    Reject(String),
}

/// What the fake does on `sign_up`.
#[derive(Debug, Clone)]
pub enum SignUpScript {
    Complete,
    NeedsVerification,
    Reject { code: String, message: String },
}

#[derive(Debug, Clone)]
struct ProviderState {
    identity: Option<ProviderIdentity>,
    identity_error: Option<String>,
    tokens: Option<TokenSession>,
    sign_in: SignInScript,
    sign_up: SignUpScript,
    sign_out_error: Option<String>,
    identity_delay: Option<Duration>,
}

/// Identity provider with scripted results and call counters.
pub struct FakeIdentityProvider {
    state: Mutex<ProviderState>,
    pub identity_calls: AtomicUsize,
    pub token_calls: AtomicUsize,
    pub sign_in_calls: AtomicUsize,
    pub sign_up_calls: AtomicUsize,
    pub sign_out_calls: AtomicUsize,
    pub sign_up_attributes: Mutex<Vec<SignUpAttributes>>,
}

impl FakeIdentityProvider {
    /// Nobody signed in; sign-in rejects.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ProviderState {
                identity: None,
                identity_error: None,
                tokens: None,
                sign_in: SignInScript::Reject("Invalid email or password".to_string()),
                sign_up: SignUpScript::NeedsVerification,
                sign_out_error: None,
                identity_delay: None,
            }),
            identity_calls: AtomicUsize::new(0),
            token_calls: AtomicUsize::new(0),
            sign_in_calls: AtomicUsize::new(0),
            sign_up_calls: AtomicUsize::new(0),
            sign_out_calls: AtomicUsize::new(0),
            sign_up_attributes: Mutex::new(Vec::new()),
        }
    }

    /// `identity()` is signed in with a valid `access_token`.
    pub fn signed_in(access_token: &str) -> Self {
        let provider = Self::new();
        provider.update(|state| {
            state.identity = Some(identity());
            state.tokens = Some(valid_tokens(access_token));
        });
        provider
    }

    pub fn with_identity(self, identity: ProviderIdentity) -> Self {
        self.update(|state| state.identity = Some(identity));
        self
    }

    pub fn with_tokens(self, tokens: Option<TokenSession>) -> Self {
        self.update(|state| state.tokens = tokens);
        self
    }

    pub fn with_identity_error(self, message: &str) -> Self {
        self.update(|state| state.identity_error = Some(message.to_string()));
        self
    }

    pub fn with_identity_delay(self, delay: Duration) -> Self {
        self.update(|state| state.identity_delay = Some(delay));
        self
    }

    pub fn with_sign_in(self, script: SignInScript) -> Self {
        self.update(|state| state.sign_in = script);
        self
    }

    pub fn with_sign_up(self, script: SignUpScript) -> Self {
        self.update(|state| state.sign_up = script);
        self
    }

    pub fn with_failing_sign_out(self, message: &str) -> Self {
        self.update(|state| state.sign_out_error = Some(message.to_string()));
        self
    }

    /// Change the current token session, as a background refresh would.
    pub fn set_tokens(&self, tokens: Option<TokenSession>) {
        self.update(|state| state.tokens = tokens);
    }

    pub fn calls(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    fn update(&self, f: impl FnOnce(&mut ProviderState)) {
        f(&mut self.state.lock().expect("provider state poisoned"));
    }

    fn snapshot(&self) -> ProviderState {
        self.state.lock().expect("provider state poisoned").clone()
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentityProvider {
    async fn current_identity(&self) -> Result<ProviderIdentity> {
        self.identity_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.snapshot();
        if let Some(delay) = state.identity_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = state.identity_error {
            return Err(KeygateError::Network(message));
        }
        state.identity.ok_or(KeygateError::NotAuthenticated)
    }

    async fn token_session(&self) -> Result<Option<TokenSession>> {
        self.token_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.snapshot().tokens)
    }

    async fn sign_in(&self, _username: &str, _password: &str) -> Result<SignInOutcome> {
        self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
        match self.snapshot().sign_in {
            SignInScript::Succeed {
                identity,
                access_token,
            } => {
                self.update(|state| {
                    state.identity = Some(identity);
                    state.tokens = Some(valid_tokens(&access_token));
                });
                Ok(SignInOutcome::signed_in())
            }
            SignInScript::Pending(step) => Ok(SignInOutcome::pending(step)),
            SignInScript::Reject(message) => Err(KeygateError::Authentication(message)),
        }
    }

    async fn sign_up(
        &self,
        _username: &str,
        _password: &str,
        attributes: &SignUpAttributes,
    ) -> Result<SignUpOutcome> {
        self.sign_up_calls.fetch_add(1, Ordering::SeqCst);
        self.sign_up_attributes
            .lock()
            .expect("attributes poisoned")
            .push(attributes.clone());
        match self.snapshot().sign_up {
            SignUpScript::Complete => Ok(SignUpOutcome {
                is_sign_up_complete: true,
                user_id: Some("user-1".to_string()),
                sign_in: None,
            }),
            SignUpScript::NeedsVerification => Ok(SignUpOutcome {
                is_sign_up_complete: false,
                user_id: Some("user-1".to_string()),
                sign_in: None,
            }),
            SignUpScript::Reject { code, message } => Err(KeygateError::provider(code, message)),
        }
    }

    async fn sign_out(&self) -> Result<()> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        let error = self.snapshot().sign_out_error;
        self.update(|state| {
            state.identity = None;
            state.tokens = None;
        });
        match error {
            Some(message) => Err(KeygateError::Network(message)),
            None => Ok(()),
        }
    }
}

/// Profile service returning a fixed profile, or failing when none is set.
pub struct FakeProfileService {
    profile: Mutex<Option<Profile>>,
    pub calls: AtomicUsize,
    pub seen_tokens: Mutex<Vec<String>>,
}

impl FakeProfileService {
    pub fn returning(profile: Profile) -> Self {
        Self {
            profile: Mutex::new(Some(profile)),
            calls: AtomicUsize::new(0),
            seen_tokens: Mutex::new(Vec::new()),
        }
    }

    pub fn onboarded() -> Self {
        Self::returning(Profile {
            has_completed_onboarding: true,
            ..Profile::default()
        })
    }

    pub fn failing() -> Self {
        Self {
            profile: Mutex::new(None),
            calls: AtomicUsize::new(0),
            seen_tokens: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProfileService for FakeProfileService {
    async fn fetch_profile(&self, access_token: &str) -> Result<Profile> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_tokens
            .lock()
            .expect("tokens poisoned")
            .push(access_token.to_string());
        self.profile
            .lock()
            .expect("profile poisoned")
            .clone()
            .ok_or_else(|| KeygateError::ProfileUnavailable("profile service down".to_string()))
    }
}

/// Transport that records requests and replays scripted responses.
#[derive(Default)]
pub struct RecordingTransport {
    responses: Mutex<VecDeque<std::result::Result<TransportResponse, TransportError>>>,
    requests: Mutex<Vec<TransportRequest>>,
    delay: Option<Duration>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold every response back for `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn respond_json(self, status: u16, body: Value) -> Self {
        self.responses
            .lock()
            .expect("responses poisoned")
            .push_back(Ok(TransportResponse {
                status,
                headers: Default::default(),
                body,
            }));
        self
    }

    pub fn fail(self, error: TransportError) -> Self {
        self.responses
            .lock()
            .expect("responses poisoned")
            .push_back(Err(error));
        self
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().expect("requests poisoned").clone()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(
        &self,
        request: TransportRequest,
    ) -> std::result::Result<TransportResponse, TransportError> {
        self.requests
            .lock()
            .expect("requests poisoned")
            .push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.responses
            .lock()
            .expect("responses poisoned")
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::unreachable("no scripted response")))
    }
}

/// Notifier that keeps everything it is shown.
#[derive(Default)]
pub struct RecordingNotifier {
    shown: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shown(&self) -> Vec<Notification> {
        self.shown.lock().expect("notifications poisoned").clone()
    }
}

impl Notifier for RecordingNotifier {
    fn show(&self, notification: Notification) {
        self.shown
            .lock()
            .expect("notifications poisoned")
            .push(notification);
    }
}

/// Navigation sink plus the log it appends to.
pub fn navigation_recorder() -> (NavigationSink, Arc<Mutex<Vec<Navigation>>>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink_log = log.clone();
    let sink: NavigationSink = Arc::new(move |navigation| {
        sink_log
            .lock()
            .expect("navigation log poisoned")
            .push(navigation);
    });
    (sink, log)
}

#[derive(Default)]
pub struct InMemoryTokenStore {
    tokens: Mutex<HashMap<(String, String), Token>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, provider: &str, profile: &str, token: Token) {
        self.tokens
            .lock()
            .expect("store lock poisoned")
            .insert((provider.to_string(), profile.to_string()), token);
    }

    pub fn get(&self, provider: &str, profile: &str) -> Option<Token> {
        self.tokens
            .lock()
            .expect("store lock poisoned")
            .get(&(provider.to_string(), profile.to_string()))
            .cloned()
    }
}

impl TokenStore for InMemoryTokenStore {
    fn load(&self, provider: &str, profile: &str) -> Result<Option<Token>> {
        Ok(self.get(provider, profile))
    }

    fn save(&self, provider: &str, profile: &str, token: &Token) -> Result<()> {
        self.seed(provider, profile, token.clone());
        Ok(())
    }

    fn clear(&self, provider: &str, profile: &str) -> Result<()> {
        self.tokens
            .lock()
            .expect("store lock poisoned")
            .remove(&(provider.to_string(), profile.to_string()));
        Ok(())
    }
}

/// Unsigned JWT carrying `claims`.
pub fn jwt(claims: Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.sig")
}

pub fn token(access_token: &str) -> Token {
    Token {
        access_token: access_token.to_string(),
        refresh_token: None,
        id_token: None,
        expires_at: Some(Utc::now() + chrono::Duration::hours(1)),
        last_refresh: Some(Utc::now()),
    }
}
