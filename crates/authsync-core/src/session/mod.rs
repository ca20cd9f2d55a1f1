//! Session state and its manager.
//!
//! The store holds the current [`Session`]; the manager is the only writer
//! and takes its cue from the identity provider's notifications.

mod manager;
mod state;
mod store;

pub use manager::{Operation, SessionManager};
pub use state::{Identity, ProfileUpdate, Session, SessionPhase};
pub use store::{Observer, SessionStore};
