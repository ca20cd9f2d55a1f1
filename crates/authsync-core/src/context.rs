//! AuthContext - everything the UI host needs, built once and passed down.
//!
//! There is no global auth object. The application builds one
//! `AuthContext` at startup and hands clones of it to whatever renders the
//! UI tree; components get the store, the manager and the event bus from
//! there.
//!
//! ```text
//!                 ┌──────────────────────────┐
//!                 │       AuthContext        │
//!                 ├──────────────────────────┤
//!                 │  - SessionManager        │──── IdentityProvider
//!                 │  - SessionStore (read)   │
//!                 │  - EventBus              │
//!                 └────────────┬─────────────┘
//!                              │
//!            ┌─────────────────┼─────────────────┐
//!            ▼                 ▼                 ▼
//!      ┌──────────┐     ┌─────────────┐   ┌─────────────┐
//!      │  Navbar  │     │ Route guard │   │ Async tasks │
//!      └──────────┘     └─────────────┘   └─────────────┘
//! ```

use crate::consumers::{GuardDecision, NavbarModel, Route};
use crate::event_bus::{EventBus, DEFAULT_CAPACITY};
use crate::logging::open_transition_log;
use crate::provider::IdentityProvider;
use crate::session::{Session, SessionManager, SessionStore};
use crate::subscription::Subscription;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for building an AuthContext.
pub struct AuthContextBuilder {
    provider: Arc<dyn IdentityProvider>,
    store: Option<Arc<SessionStore>>,
    event_bus: Option<Arc<EventBus>>,
    event_capacity: usize,
    log_dir: Option<PathBuf>,
}

impl AuthContextBuilder {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self {
            provider,
            store: None,
            event_bus: None,
            event_capacity: DEFAULT_CAPACITY,
            log_dir: None,
        }
    }

    /// Use an existing store (for testing or when the host already owns one).
    pub fn store(mut self, store: Arc<SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Use an existing EventBus. Takes precedence over `event_capacity`.
    pub fn event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Directory for the session transition log. Unset means no log.
    pub fn log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    /// Build the context and subscribe to the provider.
    pub fn build(self) -> AuthContext {
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(SessionStore::new()));
        let event_bus = self
            .event_bus
            .unwrap_or_else(|| Arc::new(EventBus::with_capacity(self.event_capacity)));
        let transitions = open_transition_log(self.log_dir.as_deref());

        let manager = Arc::new(SessionManager::with_parts(
            self.provider,
            Arc::clone(&store),
            Arc::clone(&event_bus),
            transitions,
        ));

        AuthContext {
            manager,
            store,
            event_bus,
            log_dir: self.log_dir,
        }
    }
}

/// Shared handles for session consumers.
///
/// Cloning is cheap; clones share the same manager, store and bus. The
/// provider subscription lives until the last clone is dropped.
#[derive(Clone)]
pub struct AuthContext {
    pub manager: Arc<SessionManager>,
    /// Read-only for consumers: `SessionStore` exposes no public setter.
    pub store: Arc<SessionStore>,
    pub event_bus: Arc<EventBus>,
    log_dir: Option<PathBuf>,
}

impl AuthContext {
    pub fn builder(provider: Arc<dyn IdentityProvider>) -> AuthContextBuilder {
        AuthContextBuilder::new(provider)
    }

    pub fn session(&self) -> Session {
        self.store.get()
    }

    pub fn subscribe(&self, observer: impl Fn(&Session) + Send + Sync + 'static) -> Subscription {
        self.store.subscribe(observer)
    }

    pub fn navbar(&self) -> NavbarModel {
        NavbarModel::attach(&self.store)
    }

    pub fn guard(&self, route: Route) -> GuardDecision {
        route.guard(&self.store.get())
    }

    pub fn log_dir(&self) -> Option<&PathBuf> {
        self.log_dir.as_ref()
    }
}
