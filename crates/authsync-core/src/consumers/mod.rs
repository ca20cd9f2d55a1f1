//! Read-only consumers of the session.
//!
//! These never write the store. They derive what the UI should render
//! from the current [`Session`](crate::Session).

mod navbar;
mod routes;

pub use navbar::{AuthSection, NavbarModel, ProfileBadge};
pub use routes::{GuardDecision, Route};
