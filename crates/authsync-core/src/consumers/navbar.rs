//! Navigation bar auth section.
//!
//! Decides what the auth corner of the navigation bar shows. Menus and
//! dropdown open/close behaviour stay in the UI layer.

use super::routes::Route;
use crate::session::{Session, SessionStore};
use crate::subscription::Subscription;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Avatar menu contents for a signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileBadge {
    pub name: String,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthSection {
    /// Startup check or an operation in flight.
    Pending,
    SignedOut { login: Route, register: Route },
    SignedIn(ProfileBadge),
}

impl AuthSection {
    pub fn from_session(session: &Session) -> Self {
        if session.is_loading {
            return AuthSection::Pending;
        }
        match &session.identity {
            Some(identity) => AuthSection::SignedIn(ProfileBadge {
                name: identity.label().to_string(),
                email: identity.email.clone(),
                avatar_url: identity.avatar_url.clone(),
            }),
            None => AuthSection::SignedOut {
                login: Route::Login,
                register: Route::Register,
            },
        }
    }

    pub fn shows_logout(&self) -> bool {
        matches!(self, AuthSection::SignedIn(_))
    }
}

/// Live auth section bound to a store.
///
/// Re-derives the section on every store change and counts renders, which
/// is what a UI host would hook its redraw into.
pub struct NavbarModel {
    section: Arc<Mutex<AuthSection>>,
    renders: Arc<AtomicUsize>,
    _subscription: Subscription,
}

impl NavbarModel {
    pub fn attach(store: &SessionStore) -> Self {
        let section = Arc::new(Mutex::new(AuthSection::from_session(&store.get())));
        let renders = Arc::new(AtomicUsize::new(1));

        let subscription = {
            let section = Arc::clone(&section);
            let renders = Arc::clone(&renders);
            store.subscribe(move |session| {
                *section.lock().unwrap_or_else(PoisonError::into_inner) =
                    AuthSection::from_session(session);
                renders.fetch_add(1, Ordering::SeqCst);
            })
        };

        Self {
            section,
            renders,
            _subscription: subscription,
        }
    }

    pub fn section(&self) -> AuthSection {
        self.section
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of times the section was derived, including the first.
    pub fn render_count(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }
}
