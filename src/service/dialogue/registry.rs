use dashmap::DashMap;
use std::{
    ops::{Deref, DerefMut},
    sync::Arc,
};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::model::{DialogueState, Session};
use crate::service::settings::UserId;

type Slot = Arc<Mutex<Session>>;

/// Maps users to their session slot.
///
/// Each slot is a fair async mutex, so events of one user are handled one at a time in arrival
/// order while different users never wait on each other. A slot is dropped from the map once its
/// session is idle and no task holds or awaits it.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    slots: Arc<DashMap<UserId, Slot>>,
}

impl SessionRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Arc::new(DashMap::with_capacity(capacity)),
        }
    }

    /// Waits for exclusive access to the user's session, creating an idle one if absent.
    pub async fn acquire(&self, user: UserId) -> SessionGuard {
        // The map reference must not live across the await below.
        let slot = {
            let entry = self
                .slots
                .entry(user)
                .or_insert_with(|| Arc::new(Mutex::new(Session::default())));
            Arc::clone(entry.value())
        };

        let guard = slot.lock_owned().await;

        SessionGuard {
            user,
            guard: Some(guard),
            slots: Arc::clone(&self.slots),
        }
    }

    /// Number of live slots, including ones currently being handled.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// State of the user's session, `None` when absent or currently locked.
    #[cfg(test)]
    pub fn peek(&self, user: UserId) -> Option<DialogueState> {
        let slot = self.slots.get(&user).map(|slot| Arc::clone(slot.value()))?;
        let state = slot.try_lock().ok()?.state;
        Some(state)
    }
}

/// Exclusive handle on one user's session.
pub struct SessionGuard {
    user: UserId,
    guard: Option<OwnedMutexGuard<Session>>,
    slots: Arc<DashMap<UserId, Slot>>,
}

impl SessionGuard {
    pub fn user(&self) -> UserId {
        self.user
    }
}

impl Deref for SessionGuard {
    type Target = Session;

    fn deref(&self) -> &Self::Target {
        // Only taken in Drop.
        self.guard.as_deref().unwrap_or_else(|| unreachable!("session guard released"))
    }
}

impl DerefMut for SessionGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.guard.as_deref_mut().unwrap_or_else(|| unreachable!("session guard released"))
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let Some(guard) = self.guard.take() else {
            return;
        };
        let idle = guard.is_idle();
        drop(guard);

        if idle {
            // A waiter or a fresh acquirer holds its own clone, which keeps the slot alive.
            self.slots.remove_if(&self.user, |_, slot| Arc::strong_count(slot) == 1);
        }
    }
}
