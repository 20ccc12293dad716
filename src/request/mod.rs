//! Bearer-authenticated request execution.
//!
//! A [`RequestExecutor`] pulls the current credential from the session
//! store, attaches it to every outbound call, and turns failures into a
//! single human-facing notification while still returning the original
//! error to the caller.

pub mod options;
pub mod transport;

pub use options::RequestOptions;
pub use transport::{
    build_client, shared_client, HttpTransport, Transport, TransportError, TransportRequest,
    TransportResponse,
};

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::watch;

use crate::error::{KeygateError, Result};
use crate::notify::{Notification, Notifier};
use crate::session::SessionContext;

/// Shown when a failure carries no server-provided detail.
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";
/// Title of failure notifications.
pub const FAILURE_TITLE: &str = "Request failed";

const CANCELLED_MESSAGE: &str = "Request cancelled";

/// Lifecycle of one request outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestState<T> {
    Idle,
    InFlight,
    Succeeded(T),
    Failed(String),
}

impl<T: Clone> RequestState<T> {
    pub fn payload(&self) -> Option<T> {
        match self {
            Self::Succeeded(payload) => Some(payload.clone()),
            _ => None,
        }
    }

    pub fn failure_message(&self) -> Option<String> {
        match self {
            Self::Failed(message) => Some(message.clone()),
            _ => None,
        }
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::InFlight)
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Succeeded(_) | Self::Failed(_))
    }
}

/// Runs authenticated requests against a transport.
///
/// Cheap to clone; clones share the transport, notifier and session context.
#[derive(Clone)]
pub struct RequestExecutor {
    context: SessionContext,
    transport: Arc<dyn Transport>,
    notifier: Arc<dyn Notifier>,
    defaults: Arc<RequestOptions>,
}

impl fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("context", &self.context)
            .field("defaults", &self.defaults)
            .finish()
    }
}

impl RequestExecutor {
    pub fn new(
        context: SessionContext,
        transport: Arc<dyn Transport>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            context,
            transport,
            notifier,
            defaults: Arc::new(RequestOptions::default()),
        }
    }

    /// Options every request starts from before caller options are merged.
    pub fn with_defaults(mut self, defaults: RequestOptions) -> Self {
        self.defaults = Arc::new(defaults);
        self
    }

    /// A request handle that owns its own outcome.
    pub fn request<T>(&self) -> AuthenticatedRequest<T>
    where
        T: DeserializeOwned + Clone,
    {
        let (state, _) = watch::channel(RequestState::Idle);
        AuthenticatedRequest {
            executor: self.clone(),
            state,
        }
    }

    /// One-shot form of [`AuthenticatedRequest::execute`].
    pub async fn execute<T>(&self, target: &str, options: Option<&RequestOptions>) -> Result<T>
    where
        T: DeserializeOwned + Clone,
    {
        self.request::<T>().execute(target, options).await
    }

    async fn perform<T: DeserializeOwned>(
        &self,
        target: &str,
        options: Option<&RequestOptions>,
    ) -> Result<T> {
        if target.trim().is_empty() {
            return Err(KeygateError::InvalidArgument(
                "request target must not be empty".to_string(),
            ));
        }
        let store = self.context.store()?;
        let credential = store.get_credential().await;
        let request = options::prepare_request(
            target,
            &self.defaults,
            options,
            credential.as_deref(),
        );
        tracing::debug!(
            method = %request.method,
            target,
            authenticated = credential.is_some(),
            "executing request"
        );
        let response = self.transport.send(request).await?;
        decode_payload(response.body)
    }
}

/// One request outcome plus the means to (re)run it.
///
/// `execute` takes `&mut self`, so an outcome is never shared by two
/// in-flight invocations. Observers can [`subscribe`](Self::subscribe).
pub struct AuthenticatedRequest<T> {
    executor: RequestExecutor,
    state: watch::Sender<RequestState<T>>,
}

impl<T> AuthenticatedRequest<T>
where
    T: DeserializeOwned + Clone,
{
    /// Perform the call with the current credential attached.
    ///
    /// On failure the outcome records a human-readable message, the
    /// notifier is called exactly once, and the original error is returned.
    pub async fn execute(&mut self, target: &str, options: Option<&RequestOptions>) -> Result<T> {
        self.state.send_replace(RequestState::InFlight);
        let mut settle = SettleOnDrop::armed(&self.state);

        let result = self.executor.perform::<T>(target, options).await;
        settle.disarm();
        match result {
            Ok(payload) => {
                self.state
                    .send_replace(RequestState::Succeeded(payload.clone()));
                Ok(payload)
            }
            Err(err) => {
                let message = failure_message(&err);
                tracing::debug!(error = %err, target, "request failed");
                self.state
                    .send_replace(RequestState::Failed(message.clone()));
                self.executor
                    .notifier
                    .show(Notification::error(FAILURE_TITLE, message));
                Err(err)
            }
        }
    }

    pub fn state(&self) -> RequestState<T> {
        self.state.borrow().clone()
    }

    pub fn payload(&self) -> Option<T> {
        self.state.borrow().payload()
    }

    pub fn failure_message(&self) -> Option<String> {
        self.state.borrow().failure_message()
    }

    pub fn is_in_flight(&self) -> bool {
        self.state.borrow().is_in_flight()
    }

    pub fn subscribe(&self) -> watch::Receiver<RequestState<T>> {
        self.state.subscribe()
    }
}

/// Message to show a human for a failed request.
pub fn failure_message(error: &KeygateError) -> String {
    match error {
        KeygateError::Transport(transport) => transport.detail(),
        _ => None,
    }
    .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string())
}

fn decode_payload<T: DeserializeOwned>(body: Value) -> Result<T> {
    serde_json::from_value(body).map_err(|err| {
        tracing::warn!(error = %err, "response body did not match the expected payload");
        KeygateError::Serialization(err)
    })
}

/// Settles an outcome left in flight by a dropped `execute` future.
struct SettleOnDrop<'a, T> {
    state: &'a watch::Sender<RequestState<T>>,
    armed: bool,
}

impl<'a, T> SettleOnDrop<'a, T> {
    fn armed(state: &'a watch::Sender<RequestState<T>>) -> Self {
        Self { state, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl<T> Drop for SettleOnDrop<'_, T> {
    fn drop(&mut self) {
        if self.armed {
            self.state
                .send_replace(RequestState::Failed(CANCELLED_MESSAGE.to_string()));
        }
    }
}
