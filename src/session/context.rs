use std::fmt;
use std::sync::{Arc, OnceLock};

use super::SessionStore;
use crate::error::{KeygateError, Result};

const NO_CONTEXT: &str = "no session context available";

/// Owned handle through which consumers reach the session store.
///
/// Created at bootstrap and passed explicitly to whoever needs the store.
/// Clones share one slot, so a store installed through any clone is seen by
/// all of them. Reading an empty context is a configuration error.
#[derive(Clone, Default)]
pub struct SessionContext {
    slot: Arc<OnceLock<Arc<SessionStore>>>,
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("installed", &self.is_installed())
            .finish()
    }
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store(store: Arc<SessionStore>) -> Self {
        let context = Self::new();
        let _ = context.slot.set(store);
        context
    }

    /// Install the store. A context accepts exactly one store.
    pub fn install(&self, store: Arc<SessionStore>) -> Result<()> {
        self.slot.set(store).map_err(|_| {
            KeygateError::Configuration("session context already initialized".to_string())
        })
    }

    pub fn store(&self) -> Result<Arc<SessionStore>> {
        self.slot.get().cloned().ok_or_else(|| {
            tracing::error!("session store used before a session context was installed");
            KeygateError::Configuration(NO_CONTEXT.to_string())
        })
    }

    pub fn is_installed(&self) -> bool {
        self.slot.get().is_some()
    }
}
