//! Authenticated-session state as an explicit observable value.
//!
//! A [`SessionHub`] owns the current [`SessionState`] and publishes every
//! change over a `tokio::sync::watch` channel. Subscribing hands out a
//! [`SessionSubscription`]; dropping it unsubscribes.

use crate::models::User;
use tokio::sync::watch;
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// The auth provider has not reported yet
    Loading,
    SignedOut,
    SignedIn(User),
}

impl SessionState {
    pub fn user(&self) -> Option<&User> {
        match self {
            SessionState::SignedIn(user) => Some(user),
            _ => None,
        }
    }
}

pub struct SessionHub {
    tx: watch::Sender<SessionState>,
}

impl Default for SessionHub {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionHub {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(SessionState::Loading);
        Self { tx }
    }

    pub fn subscribe(&self) -> SessionSubscription {
        SessionSubscription {
            rx: self.tx.subscribe(),
        }
    }

    pub fn current(&self) -> SessionState {
        self.tx.borrow().clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn sign_in(&self, user: User) {
        info!("Session signed in as {}", user.id);
        self.tx.send_replace(SessionState::SignedIn(user));
    }

    pub fn sign_out(&self) {
        info!("Session signed out");
        self.tx.send_replace(SessionState::SignedOut);
    }
}

/// A live view of the session state
pub struct SessionSubscription {
    rx: watch::Receiver<SessionState>,
}

impl SessionSubscription {
    /// Latest published state
    pub fn current(&self) -> SessionState {
        self.rx.borrow().clone()
    }

    /// Wait for the next change. `None` once the hub is gone.
    pub async fn changed(&mut self) -> Option<SessionState> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}
