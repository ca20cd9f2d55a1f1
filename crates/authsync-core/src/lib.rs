//! # authsync-core
//!
//! Client-side authentication session manager.
//!
//! This crate is framework-agnostic. A UI host builds one
//! [`AuthContext`] around an [`IdentityProvider`] implementation and hands
//! it to the components that need to know who is signed in.
//!
//! ## Key Concepts
//!
//! - **Session**: the current identity (or none) plus a loading flag
//! - **SessionStore**: holds the Session and notifies observers synchronously
//! - **SessionManager**: runs sign-in/sign-out operations and writes the
//!   provider's auth-state notifications into the store; the last
//!   notification always wins
//! - **Consumers**: navbar auth section and route guards derived from the
//!   Session

pub mod consumers;
pub mod context;
pub mod error;
pub mod event_bus;
pub mod logging;
pub mod provider;
pub mod session;
pub mod subscription;

// Re-export commonly used types
pub use context::{AuthContext, AuthContextBuilder};
pub use error::AuthError;
pub use event_bus::{EventBus, SessionEvent};
pub use provider::{IdentityProvider, ProviderError, ProviderKind};
pub use session::{
    Identity, Operation, ProfileUpdate, Session, SessionManager, SessionPhase, SessionStore,
};
pub use subscription::Subscription;
