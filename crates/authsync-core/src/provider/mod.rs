//! Identity provider seam.
//!
//! The provider performs the actual credential checks and account
//! management. This crate only consumes it through [`IdentityProvider`].

mod memory;

pub use memory::{MemoryIdentityProvider, NotifyMode, ProviderCall};

use crate::session::{Identity, ProfileUpdate};
use crate::subscription::Subscription;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Error codes reported by identity providers.
pub mod codes {
    pub const INVALID_CREDENTIAL: &str = "auth/invalid-credential";
    pub const WRONG_PASSWORD: &str = "auth/wrong-password";
    pub const USER_NOT_FOUND: &str = "auth/user-not-found";
    pub const INVALID_EMAIL: &str = "auth/invalid-email";
    pub const EMAIL_ALREADY_IN_USE: &str = "auth/email-already-in-use";
    pub const WEAK_PASSWORD: &str = "auth/weak-password";
    pub const POPUP_CLOSED: &str = "auth/popup-closed-by-user";
    pub const NETWORK: &str = "auth/network-request-failed";
    pub const NO_CURRENT_USER: &str = "auth/no-current-user";
}

/// Rejection returned by a provider call.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct ProviderError {
    pub code: String,
    pub message: String,
}

impl ProviderError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Federated sign-in backends reachable through a popup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Google,
    Github,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Google => write!(f, "google"),
            ProviderKind::Github => write!(f, "github"),
        }
    }
}

/// Callback receiving the provider's view of the current user.
pub type AuthStateListener = Arc<dyn Fn(Option<Identity>) + Send + Sync>;

/// The external identity provider.
///
/// Operations resolve when the provider has applied the change. The
/// resulting identity is reported separately through the listener passed
/// to [`observe_auth_state`](IdentityProvider::observe_auth_state).
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Register `listener`; it is called with the current user and again on
    /// every change until the returned subscription is released.
    fn observe_auth_state(&self, listener: AuthStateListener) -> Subscription;

    async fn sign_in_with_popup(&self, kind: ProviderKind) -> Result<(), ProviderError>;

    async fn sign_in_with_password(&self, email: &str, password: &str)
        -> Result<(), ProviderError>;

    async fn create_account(&self, email: &str, password: &str) -> Result<(), ProviderError>;

    async fn update_current_user_profile(
        &self,
        update: &ProfileUpdate,
    ) -> Result<(), ProviderError>;

    async fn sign_out(&self) -> Result<(), ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_display() {
        let err = ProviderError::new(codes::WRONG_PASSWORD, "bad password");
        assert_eq!(err.to_string(), "auth/wrong-password: bad password");
    }

    #[test]
    fn provider_kind_display_matches_serde() {
        let json = serde_json::to_string(&ProviderKind::Google).unwrap();
        assert_eq!(json, "\"google\"");
        assert_eq!(ProviderKind::Github.to_string(), "github");
    }
}
