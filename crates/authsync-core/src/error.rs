//! Error taxonomy for session operations.

use crate::provider::{codes, ProviderError};
use thiserror::Error;

/// Failure returned by a [`SessionManager`](crate::SessionManager) operation.
///
/// None of these are fatal to the manager: the loading flag is reset and
/// the provider subscription keeps running.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("An account already exists for {0}")]
    AccountExists(String),

    #[error("No user is signed in")]
    NotAuthenticated,

    #[error("Identity provider error: {0}")]
    Provider(ProviderError),
}

impl AuthError {
    /// Map a provider rejection onto the taxonomy.
    ///
    /// `email` is the address the operation was called with, if any; it is
    /// only used to describe [`AuthError::AccountExists`].
    pub fn from_provider(err: ProviderError, email: Option<&str>) -> Self {
        match err.code.as_str() {
            codes::INVALID_CREDENTIAL
            | codes::WRONG_PASSWORD
            | codes::USER_NOT_FOUND
            | codes::INVALID_EMAIL => AuthError::InvalidCredentials,
            codes::EMAIL_ALREADY_IN_USE => {
                AuthError::AccountExists(email.unwrap_or_default().to_string())
            }
            codes::NO_CURRENT_USER => AuthError::NotAuthenticated,
            _ => AuthError::Provider(err),
        }
    }

    /// Stable short name, used in events and the transition log.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "invalidCredentials",
            AuthError::AccountExists(_) => "accountExists",
            AuthError::NotAuthenticated => "notAuthenticated",
            AuthError::Provider(_) => "providerError",
        }
    }
}

impl From<ProviderError> for AuthError {
    fn from(err: ProviderError) -> Self {
        Self::from_provider(err, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod mapping {
        use super::*;

        #[test]
        fn credential_codes_map_to_invalid_credentials() {
            for code in [
                codes::INVALID_CREDENTIAL,
                codes::WRONG_PASSWORD,
                codes::USER_NOT_FOUND,
                codes::INVALID_EMAIL,
            ] {
                let err = AuthError::from(ProviderError::new(code, "nope"));
                assert_eq!(err, AuthError::InvalidCredentials, "code {code}");
            }
        }

        #[test]
        fn email_in_use_carries_email() {
            let err = AuthError::from_provider(
                ProviderError::new(codes::EMAIL_ALREADY_IN_USE, "taken"),
                Some("a@b.com"),
            );
            assert_eq!(err, AuthError::AccountExists("a@b.com".to_string()));
        }

        #[test]
        fn no_current_user_maps_to_not_authenticated() {
            let err = AuthError::from(ProviderError::new(codes::NO_CURRENT_USER, ""));
            assert_eq!(err, AuthError::NotAuthenticated);
        }

        #[test]
        fn unknown_codes_are_provider_errors() {
            let source = ProviderError::new(codes::POPUP_CLOSED, "closed");
            match AuthError::from(source.clone()) {
                AuthError::Provider(inner) => assert_eq!(inner, source),
                other => panic!("Expected Provider error, got {other:?}"),
            }
        }
    }

    mod display {
        use super::*;

        #[test]
        fn account_exists_shows_email() {
            let err = AuthError::AccountExists("taken@example.com".to_string());
            assert!(err.to_string().contains("taken@example.com"));
        }

        #[test]
        fn provider_error_shows_code() {
            let err = AuthError::Provider(ProviderError::new(codes::NETWORK, "offline"));
            let text = err.to_string();
            assert!(text.contains("auth/network-request-failed"));
            assert!(text.contains("offline"));
        }

        #[test]
        fn kind_is_stable() {
            assert_eq!(AuthError::NotAuthenticated.kind(), "notAuthenticated");
            assert_eq!(
                AuthError::Provider(ProviderError::new("x", "y")).kind(),
                "providerError"
            );
        }
    }
}
