//! SessionManager - mediates between the identity provider and the store.
//!
//! The provider's auth-state notifications are the only thing that decides
//! who is signed in. Operations flip the loading flag, call the provider
//! and report failures; they never write an identity themselves. Whichever
//! notification arrives last wins, no matter what order operations were
//! called in.

use super::state::{ProfileUpdate, Session};
use super::store::SessionStore;
use crate::error::AuthError;
use crate::event_bus::{EventBus, SessionEvent};
use crate::logging::{self, log_transition, TransitionLog};
use crate::provider::{IdentityProvider, ProviderError, ProviderKind};
use crate::session::Identity;
use crate::subscription::Subscription;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

/// Operations a consumer can ask the manager to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    SignInWithGoogle,
    SignInWithEmailPassword,
    RegisterWithEmailPassword,
    UpdateProfile,
    SignOut,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::SignInWithGoogle => "signInWithGoogle",
            Operation::SignInWithEmailPassword => "signInWithEmailPassword",
            Operation::RegisterWithEmailPassword => "registerWithEmailPassword",
            Operation::UpdateProfile => "updateProfile",
            Operation::SignOut => "signOut",
        }
    }

    /// Whether the operation shows a pending state while in flight.
    pub fn sets_loading(&self) -> bool {
        !matches!(self, Operation::UpdateProfile)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Owns the provider subscription and exposes the session operations.
///
/// Construct one per application and hand it (or an
/// [`AuthContext`](crate::AuthContext)) to whatever hosts the UI. Dropping
/// the manager releases the provider subscription.
pub struct SessionManager {
    provider: Arc<dyn IdentityProvider>,
    store: Arc<SessionStore>,
    event_bus: Arc<EventBus>,
    transitions: TransitionLog,
    subscription: Mutex<Option<Subscription>>,
}

impl SessionManager {
    /// Create a manager with its own event bus and no transition log.
    pub fn new(provider: Arc<dyn IdentityProvider>, store: Arc<SessionStore>) -> Self {
        Self::with_parts(provider, store, Arc::new(EventBus::new()), logging::disabled())
    }

    /// Create a manager from explicit collaborators and subscribe to the
    /// provider's auth-state stream.
    pub fn with_parts(
        provider: Arc<dyn IdentityProvider>,
        store: Arc<SessionStore>,
        event_bus: Arc<EventBus>,
        transitions: TransitionLog,
    ) -> Self {
        let listener = {
            let store = Arc::clone(&store);
            let event_bus = Arc::clone(&event_bus);
            let transitions = Arc::clone(&transitions);
            Arc::new(move |identity: Option<Identity>| {
                apply_notification(&store, &event_bus, &transitions, identity);
            })
        };
        let subscription = provider.observe_auth_state(listener);
        log::debug!("Subscribed to identity provider auth state");

        Self {
            provider,
            store,
            event_bus,
            transitions,
            subscription: Mutex::new(Some(subscription)),
        }
    }

    /// Read access to the store, for consumers that want to subscribe.
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    pub fn current_session(&self) -> Session {
        self.store.get()
    }

    /// Whether the provider subscription is still held.
    pub fn is_listening(&self) -> bool {
        self.subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Release the provider subscription before the manager is dropped.
    /// Later notifications no longer reach the store. Idempotent.
    pub fn detach(&self) {
        let subscription = self
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(subscription) = subscription {
            subscription.unsubscribe();
            log::debug!("Released identity provider subscription");
        }
    }

    // The operations below are plain functions returning a future so the
    // loading write happens at call time, before the future is first polled.
    // Dropping the future before it completes clears the flag again.

    pub fn sign_in_with_google(&self) -> impl Future<Output = Result<(), AuthError>> + '_ {
        let pending = self.begin(Operation::SignInWithGoogle);
        async move {
            let result = self.provider.sign_in_with_popup(ProviderKind::Google).await;
            self.finish(pending, result, None)
        }
    }

    pub fn sign_in_with_email_password<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> impl Future<Output = Result<(), AuthError>> + 'a {
        let started = validate_credentials(email, password)
            .map(|email| (email, self.begin(Operation::SignInWithEmailPassword)));
        async move {
            let (email, pending) = started?;
            let result = self.provider.sign_in_with_password(email, password).await;
            self.finish(pending, result, Some(email))
        }
    }

    /// Create an account; the provider signs the new user in.
    ///
    /// Blank input fails with `InvalidCredentials` before anything is sent.
    pub fn register_with_email_password<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> impl Future<Output = Result<(), AuthError>> + 'a {
        let started = validate_credentials(email, password)
            .map(|email| (email, self.begin(Operation::RegisterWithEmailPassword)));
        async move {
            let (email, pending) = started?;
            let result = self.provider.create_account(email, password).await;
            self.finish(pending, result, Some(email))
        }
    }

    /// Change profile fields of the signed-in user.
    ///
    /// Leaves the loading flag alone. Fails with `NotAuthenticated`, without
    /// touching the store or the provider, when nobody is signed in.
    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<(), AuthError> {
        if !self.store.get().is_authenticated() {
            return Err(AuthError::NotAuthenticated);
        }
        if update.is_empty() {
            return Ok(());
        }
        let pending = self.begin(Operation::UpdateProfile);
        let result = self.provider.update_current_user_profile(&update).await;
        self.finish(pending, result, None)
    }

    pub fn sign_out(&self) -> impl Future<Output = Result<(), AuthError>> + '_ {
        let pending = self.begin(Operation::SignOut);
        async move {
            let result = self.provider.sign_out().await;
            self.finish(pending, result, None)
        }
    }

    /// Publish the pending state. Runs before the provider is called.
    fn begin(&self, op: Operation) -> PendingOperation<'_> {
        if op.sets_loading() {
            self.store.set(self.store.get().authenticating());
        }
        log::debug!("{} started", op);
        log_transition(&self.transitions, "STARTED", op.as_str());
        self.event_bus
            .emit(SessionEvent::OperationStarted { operation: op });
        PendingOperation {
            manager: self,
            op,
            armed: op.sets_loading(),
        }
    }

    fn finish(
        &self,
        pending: PendingOperation<'_>,
        result: Result<(), ProviderError>,
        email: Option<&str>,
    ) -> Result<(), AuthError> {
        let op = pending.disarm();
        match result {
            Ok(()) => {
                log::debug!("{} accepted by provider, awaiting notification", op);
                Ok(())
            }
            Err(source) => {
                let err = AuthError::from_provider(source, email);
                if op.sets_loading() {
                    self.store.set(self.store.get().idle());
                }
                log::warn!("{} failed: {}", op, err);
                log_transition(
                    &self.transitions,
                    "FAILED",
                    &format!("{} ({})", op, err.kind()),
                );
                self.event_bus.emit(SessionEvent::OperationFailed {
                    operation: op,
                    error: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// The operation's future was dropped before the provider answered.
    fn abandon(&self, op: Operation) {
        self.store.set(self.store.get().idle());
        log::warn!("{} dropped before completion", op);
        log_transition(&self.transitions, "DROPPED", op.as_str());
    }
}

/// An operation that has published its loading state.
///
/// Dropping it while still armed clears the loading flag, so a cancelled
/// or never-polled operation cannot leave the session pending.
struct PendingOperation<'a> {
    manager: &'a SessionManager,
    op: Operation,
    armed: bool,
}

impl PendingOperation<'_> {
    fn disarm(mut self) -> Operation {
        self.armed = false;
        self.op
    }
}

impl Drop for PendingOperation<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.manager.abandon(self.op);
        }
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.detach();
    }
}

/// Write the provider's report into the store, unconditionally.
fn apply_notification(
    store: &SessionStore,
    event_bus: &EventBus,
    transitions: &TransitionLog,
    identity: Option<Identity>,
) {
    let detail = match &identity {
        Some(user) => format!("authenticated id={}", user.id),
        None => "unauthenticated".to_string(),
    };
    log::info!("Auth state changed: {}", detail);
    log_transition(transitions, "NOTIFIED", &detail);

    let session = Session::settled(identity);
    store.set(session.clone());
    event_bus.emit(SessionEvent::state_changed(&session));
}

/// Reject empty input before anything is written or sent.
fn validate_credentials<'a>(email: &'a str, password: &str) -> Result<&'a str, AuthError> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return Err(AuthError::InvalidCredentials);
    }
    Ok(email)
}
