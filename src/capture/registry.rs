//! Registry of installed capture sessions.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{Session, SessionId};

/// Tracks every installed session so they can be torn down together.
///
/// The registry is an ordinary value: each [`Hierarchy`](crate::Hierarchy)
/// owns one, and a fresh one can be handed to a builder to keep a group of
/// sessions apart. Clones share the same set of sessions.
#[derive(Clone, Default)]
pub struct CaptureRegistry {
    /// Installed sessions in install order.
    sessions: Arc<Mutex<Vec<Arc<Session>>>>,
}

impl CaptureRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions currently installed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: SessionId) -> bool {
        self.lock().iter().any(|session| session.id == id)
    }

    /// Ids of the installed sessions, ascending.
    #[must_use]
    pub fn ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<_> = self.lock().iter().map(|session| session.id).collect();
        ids.sort_unstable();
        ids
    }

    /// Uninstall every registered session, most recently installed first.
    /// Returns how many were uninstalled.
    ///
    /// Sessions sharing a logger each restore the state they saw at
    /// install, so they must unwind in reverse install order.
    pub fn uninstall_all(&self) -> usize {
        let drained: Vec<_> = self.lock().drain(..).collect();
        let count = drained.len();
        for session in drained.into_iter().rev() {
            session.uninstall();
        }
        tracing::debug!(count, "Uninstalled all log captures");
        count
    }

    pub(crate) fn register(&self, session: Arc<Session>) {
        let mut sessions = self.lock();
        sessions.retain(|existing| existing.id != session.id);
        sessions.push(session);
    }

    pub(crate) fn deregister(&self, id: SessionId) {
        self.lock().retain(|session| session.id != id);
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Arc<Session>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for CaptureRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureRegistry")
            .field("sessions", &self.ids())
            .finish()
    }
}
