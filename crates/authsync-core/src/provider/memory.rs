//! In-process identity provider.
//!
//! Backs the demo binary and the test suites. Accounts live in memory,
//! failures can be injected, and notification delivery can be switched to
//! manual so callers decide exactly when and in what order the provider
//! reports state changes.

use super::{codes, AuthStateListener, IdentityProvider, ProviderError, ProviderKind};
use crate::session::{Identity, ProfileUpdate};
use crate::subscription::Subscription;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;

const MIN_PASSWORD_LEN: usize = 6;

/// When the provider reports state changes to its listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyMode {
    /// On registration and after every successful operation.
    Automatic,
    /// Only through [`MemoryIdentityProvider::emit`] and
    /// [`MemoryIdentityProvider::flush`].
    Manual,
}

/// Provider entry points, used to aim an injected failure at one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderCall {
    Popup,
    Password,
    CreateAccount,
    UpdateProfile,
    SignOut,
}

struct Account {
    password: String,
    identity: Identity,
}

#[derive(Default)]
struct ProviderState {
    /// Keyed by lowercased email.
    accounts: HashMap<String, Account>,
    popup_accounts: HashMap<ProviderKind, Identity>,
    current: Option<Identity>,
    /// `None` targets whichever call comes next.
    pending_failures: VecDeque<(Option<ProviderCall>, ProviderError)>,
}

type Listeners = Arc<Mutex<Vec<(u64, AuthStateListener)>>>;

pub struct MemoryIdentityProvider {
    state: Mutex<ProviderState>,
    listeners: Listeners,
    next_listener: AtomicU64,
    mode: NotifyMode,
}

impl MemoryIdentityProvider {
    pub fn new() -> Self {
        Self::with_mode(NotifyMode::Automatic)
    }

    /// Provider that never notifies on its own.
    pub fn manual() -> Self {
        Self::with_mode(NotifyMode::Manual)
    }

    pub fn with_mode(mode: NotifyMode) -> Self {
        Self {
            state: Mutex::new(ProviderState::default()),
            listeners: Arc::new(Mutex::new(Vec::new())),
            next_listener: AtomicU64::new(0),
            mode,
        }
    }

    /// Seed an email/password account.
    pub fn with_account(self, email: &str, password: &str, identity: Identity) -> Self {
        self.lock_state().accounts.insert(
            email.to_lowercase(),
            Account {
                password: password.to_string(),
                identity,
            },
        );
        self
    }

    /// Identity returned when the popup for `kind` completes.
    /// Without one the popup behaves as if the user closed it.
    pub fn with_popup_account(self, kind: ProviderKind, identity: Identity) -> Self {
        self.lock_state().popup_accounts.insert(kind, identity);
        self
    }

    pub fn mode(&self) -> NotifyMode {
        self.mode
    }

    /// Make the next operation reject with `err`. Failures queue up.
    pub fn fail_next(&self, err: ProviderError) {
        self.lock_state().pending_failures.push_back((None, err));
    }

    /// Make the next `call` reject with `err`; other calls are unaffected.
    pub fn fail_next_call(&self, call: ProviderCall, err: ProviderError) {
        self.lock_state().pending_failures.push_back((Some(call), err));
    }

    /// The provider's own view of the signed-in user.
    pub fn current_user(&self) -> Option<Identity> {
        self.lock_state().current.clone()
    }

    /// Report `identity` to every listener, as if the change came from
    /// elsewhere (another tab, token expiry).
    pub fn emit(&self, identity: Option<Identity>) {
        self.lock_state().current = identity.clone();
        self.notify(identity);
    }

    /// Report the current user to every listener.
    pub fn flush(&self) {
        let current = self.current_user();
        self.notify(current);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, ProviderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take_failure(&self, call: ProviderCall) -> Result<(), ProviderError> {
        let mut state = self.lock_state();
        let position = state
            .pending_failures
            .iter()
            .position(|(target, _)| target.is_none() || *target == Some(call));
        match position.and_then(|index| state.pending_failures.remove(index)) {
            Some((_, err)) => Err(err),
            None => Ok(()),
        }
    }

    fn notify(&self, identity: Option<Identity>) {
        let snapshot: Vec<AuthStateListener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in snapshot {
            listener(identity.clone());
        }
    }

    /// Record the new current user and notify when automatic.
    fn set_current(&self, identity: Option<Identity>) {
        self.lock_state().current = identity.clone();
        if self.mode == NotifyMode::Automatic {
            self.notify(identity);
        }
    }
}

impl Default for MemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    fn observe_auth_state(&self, listener: AuthStateListener) -> Subscription {
        let id = self.next_listener.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::clone(&listener)));

        if self.mode == NotifyMode::Automatic {
            listener(self.current_user());
        }

        let listeners = Arc::downgrade(&self.listeners);
        Subscription::new(move || {
            if let Some(listeners) = listeners.upgrade() {
                listeners
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .retain(|(existing, _)| *existing != id);
            }
        })
    }

    async fn sign_in_with_popup(&self, kind: ProviderKind) -> Result<(), ProviderError> {
        tokio::task::yield_now().await;
        self.take_failure(ProviderCall::Popup)?;

        let identity = self
            .lock_state()
            .popup_accounts
            .get(&kind)
            .cloned()
            .ok_or_else(|| {
                ProviderError::new(codes::POPUP_CLOSED, format!("{kind} popup was closed"))
            })?;
        self.set_current(Some(identity));
        Ok(())
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(), ProviderError> {
        tokio::task::yield_now().await;
        self.take_failure(ProviderCall::Password)?;

        let identity = {
            let state = self.lock_state();
            let account = state
                .accounts
                .get(&email.to_lowercase())
                .ok_or_else(|| ProviderError::new(codes::USER_NOT_FOUND, "no such user"))?;
            if account.password != password {
                return Err(ProviderError::new(codes::WRONG_PASSWORD, "wrong password"));
            }
            account.identity.clone()
        };
        self.set_current(Some(identity));
        Ok(())
    }

    async fn create_account(&self, email: &str, password: &str) -> Result<(), ProviderError> {
        tokio::task::yield_now().await;
        self.take_failure(ProviderCall::CreateAccount)?;

        if password.len() < MIN_PASSWORD_LEN {
            return Err(ProviderError::new(
                codes::WEAK_PASSWORD,
                format!("password must be at least {MIN_PASSWORD_LEN} characters"),
            ));
        }

        let identity = {
            let mut state = self.lock_state();
            let key = email.to_lowercase();
            if state.accounts.contains_key(&key) {
                return Err(ProviderError::new(
                    codes::EMAIL_ALREADY_IN_USE,
                    "email already in use",
                ));
            }
            let identity = Identity::new(Uuid::new_v4().to_string()).with_email(email);
            state.accounts.insert(
                key,
                Account {
                    password: password.to_string(),
                    identity: identity.clone(),
                },
            );
            identity
        };
        self.set_current(Some(identity));
        Ok(())
    }

    async fn update_current_user_profile(
        &self,
        update: &ProfileUpdate,
    ) -> Result<(), ProviderError> {
        tokio::task::yield_now().await;
        self.take_failure(ProviderCall::UpdateProfile)?;

        let updated = {
            let mut state = self.lock_state();
            let current = state
                .current
                .as_ref()
                .ok_or_else(|| ProviderError::new(codes::NO_CURRENT_USER, "no user signed in"))?;
            let updated = current.updated(update);
            for account in state.accounts.values_mut() {
                if account.identity.id == updated.id {
                    account.identity = updated.clone();
                }
            }
            updated
        };
        self.set_current(Some(updated));
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        tokio::task::yield_now().await;
        self.take_failure(ProviderCall::SignOut)?;
        self.set_current(None);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Seen = Arc<Mutex<Vec<Option<Identity>>>>;

    fn recorder(provider: &MemoryIdentityProvider) -> (Seen, Subscription) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let sub = provider.observe_auth_state(Arc::new(move |id| sink.lock().unwrap().push(id)));
        (seen, sub)
    }

    fn alice() -> Identity {
        Identity::new("alice").with_email("alice@example.com")
    }

    mod automatic {
        use super::*;

        #[test]
        fn observe_reports_current_user_immediately() {
            let provider = MemoryIdentityProvider::new();
            let (seen, _sub) = recorder(&provider);
            assert_eq!(*seen.lock().unwrap(), vec![None]);
        }

        #[tokio::test]
        async fn password_sign_in_notifies() {
            let provider =
                MemoryIdentityProvider::new().with_account("alice@example.com", "secret1", alice());
            let (seen, _sub) = recorder(&provider);

            provider
                .sign_in_with_password("Alice@Example.com", "secret1")
                .await
                .unwrap();

            assert_eq!(seen.lock().unwrap().last().cloned(), Some(Some(alice())));
            assert_eq!(provider.current_user(), Some(alice()));
        }

        #[tokio::test]
        async fn wrong_password_rejects() {
            let provider =
                MemoryIdentityProvider::new().with_account("alice@example.com", "secret1", alice());
            let err = provider
                .sign_in_with_password("alice@example.com", "nope")
                .await
                .unwrap_err();
            assert_eq!(err.code, codes::WRONG_PASSWORD);
        }

        #[tokio::test]
        async fn unknown_user_rejects() {
            let provider = MemoryIdentityProvider::new();
            let err = provider
                .sign_in_with_password("ghost@example.com", "whatever")
                .await
                .unwrap_err();
            assert_eq!(err.code, codes::USER_NOT_FOUND);
        }

        #[tokio::test]
        async fn create_account_signs_in() {
            let provider = MemoryIdentityProvider::new();
            provider.create_account("new@example.com", "longenough").await.unwrap();
            let user = provider.current_user().unwrap();
            assert_eq!(user.email.as_deref(), Some("new@example.com"));
        }

        #[tokio::test]
        async fn create_account_rejects_duplicates_and_weak_passwords() {
            let provider =
                MemoryIdentityProvider::new().with_account("alice@example.com", "secret1", alice());
            let dup = provider
                .create_account("alice@example.com", "another1")
                .await
                .unwrap_err();
            assert_eq!(dup.code, codes::EMAIL_ALREADY_IN_USE);

            let weak = provider.create_account("b@example.com", "123").await.unwrap_err();
            assert_eq!(weak.code, codes::WEAK_PASSWORD);
        }

        #[tokio::test]
        async fn popup_without_account_is_closed() {
            let provider = MemoryIdentityProvider::new();
            let err = provider
                .sign_in_with_popup(ProviderKind::Google)
                .await
                .unwrap_err();
            assert_eq!(err.code, codes::POPUP_CLOSED);
        }

        #[tokio::test]
        async fn update_profile_requires_user() {
            let provider = MemoryIdentityProvider::new();
            let err = provider
                .update_current_user_profile(&ProfileUpdate::default().display_name("x"))
                .await
                .unwrap_err();
            assert_eq!(err.code, codes::NO_CURRENT_USER);
        }

        #[tokio::test]
        async fn update_profile_persists_to_account() {
            let provider =
                MemoryIdentityProvider::new().with_account("alice@example.com", "secret1", alice());
            provider
                .sign_in_with_password("alice@example.com", "secret1")
                .await
                .unwrap();
            provider
                .update_current_user_profile(&ProfileUpdate::default().display_name("Alice"))
                .await
                .unwrap();
            provider.sign_out().await.unwrap();
            provider
                .sign_in_with_password("alice@example.com", "secret1")
                .await
                .unwrap();

            let user = provider.current_user().unwrap();
            assert_eq!(user.display_name.as_deref(), Some("Alice"));
        }

        #[tokio::test]
        async fn injected_failure_applies_once() {
            let provider = MemoryIdentityProvider::new();
            provider.fail_next(ProviderError::new(codes::NETWORK, "offline"));

            let err = provider.sign_out().await.unwrap_err();
            assert_eq!(err.code, codes::NETWORK);
            assert!(provider.sign_out().await.is_ok());
        }

        #[tokio::test]
        async fn targeted_failure_skips_other_calls() {
            let provider = MemoryIdentityProvider::new()
                .with_popup_account(ProviderKind::Google, alice());
            provider.fail_next_call(
                ProviderCall::SignOut,
                ProviderError::new(codes::NETWORK, "offline"),
            );

            provider.sign_in_with_popup(ProviderKind::Google).await.unwrap();
            let err = provider.sign_out().await.unwrap_err();
            assert_eq!(err.code, codes::NETWORK);
            assert_eq!(provider.current_user(), Some(alice()));
            assert!(provider.sign_out().await.is_ok());
        }
    }

    mod manual {
        use super::*;

        #[tokio::test]
        async fn operations_do_not_notify() {
            let provider = MemoryIdentityProvider::manual()
                .with_popup_account(ProviderKind::Google, alice());
            let (seen, _sub) = recorder(&provider);

            provider.sign_in_with_popup(ProviderKind::Google).await.unwrap();

            assert!(seen.lock().unwrap().is_empty());
            assert_eq!(provider.current_user(), Some(alice()));
        }

        #[test]
        fn flush_and_emit_notify() {
            let provider = MemoryIdentityProvider::manual();
            let (seen, _sub) = recorder(&provider);

            provider.emit(Some(alice()));
            provider.flush();

            assert_eq!(*seen.lock().unwrap(), vec![Some(alice()), Some(alice())]);
        }
    }

    #[test]
    fn released_subscription_stops_notifications() {
        let provider = MemoryIdentityProvider::manual();
        let (seen, sub) = recorder(&provider);
        assert_eq!(provider.listener_count(), 1);

        sub.unsubscribe();
        provider.emit(Some(alice()));

        assert_eq!(provider.listener_count(), 0);
        assert!(seen.lock().unwrap().is_empty());
    }
}
