//! In-memory session store.
//!
//! Sessions are keyed by a UUID carried in a cookie. Handlers load a clone
//! at request start, apply one transition, and commit the result back; the
//! commit replaces the record in a single write under the lock, so a
//! concurrent request sees either the old session or the new one, never a
//! half-applied transition.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tryon_core::models::session::Session;
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<Uuid, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the session for a cookie, or mint a fresh one. Returns the id,
    /// a working clone, and whether the id is newly issued.
    pub async fn load_or_create(&self, id: Option<Uuid>) -> (Uuid, Session, bool) {
        if let Some(id) = id {
            if let Some(session) = self.inner.read().await.get(&id) {
                return (id, session.clone(), false);
            }
        }
        let id = Uuid::new_v4();
        let session = Session::new();
        self.inner.write().await.insert(id, session.clone());
        tracing::debug!(session_id = %id, "session created");
        (id, session, true)
    }

    /// Replace the stored session in one write.
    pub async fn commit(&self, id: Uuid, session: Session) {
        self.inner.write().await.insert(id, session);
    }
}
