//! Active-credential slot
//!
//! Holds the client-level credential plus an optional user-level override.
//! The override, when present, signs every request until it is cleared or
//! replaced. Writers race last-writer-wins; each signing reads the slot once.

use std::sync::Arc;

use parking_lot::RwLock;
use signway_domain::Credential;
use tracing::debug;

#[derive(Debug)]
pub struct CredentialSlot {
    client: Arc<Credential>,
    user: RwLock<Option<Arc<Credential>>>,
}

impl CredentialSlot {
    pub fn new(client: Credential) -> Self {
        Self { client: Arc::new(client), user: RwLock::new(None) }
    }

    /// The credential the next request will be signed with.
    pub fn active(&self) -> Arc<Credential> {
        self.user.read().as_ref().map_or_else(|| Arc::clone(&self.client), Arc::clone)
    }

    pub fn client_credential(&self) -> Arc<Credential> {
        Arc::clone(&self.client)
    }

    /// Install (or replace) the user-level override.
    pub fn set_user_credential(&self, credential: Credential) {
        debug!(user_id = credential.user_id(), "user credential set");
        *self.user.write() = Some(Arc::new(credential));
    }

    /// Drop the override; the client-level credential signs again.
    pub fn clear_user_credential(&self) -> Option<Arc<Credential>> {
        let previous = self.user.write().take();
        if previous.is_some() {
            debug!("user credential cleared");
        }
        previous
    }

    pub fn has_user_credential(&self) -> bool {
        self.user.read().is_some()
    }
}
