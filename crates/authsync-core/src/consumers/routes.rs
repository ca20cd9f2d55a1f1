//! Auth-aware routes and their guards.

use crate::session::Session;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Route {
    Home,
    Login,
    Register,
    Profile,
}

/// What a route guard tells the router to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    /// Auth state not settled yet; render a placeholder and re-check later.
    Wait,
    Redirect(Route),
}

impl Route {
    pub const ALL: [Route; 4] = [Route::Home, Route::Login, Route::Register, Route::Profile];

    pub fn path(&self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Login => "/auth/login",
            Route::Register => "/auth/register",
            Route::Profile => "/profile",
        }
    }

    /// Parse a path, ignoring a trailing slash and any query or fragment.
    pub fn from_path(path: &str) -> Option<Route> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let trimmed = path.trim_end_matches('/');
        let normalized = if trimmed.is_empty() { "/" } else { trimmed };
        Self::ALL.into_iter().find(|route| route.path() == normalized)
    }

    /// Only reachable when signed in.
    pub fn requires_auth(&self) -> bool {
        matches!(self, Route::Profile)
    }

    /// Pointless once signed in.
    pub fn guest_only(&self) -> bool {
        matches!(self, Route::Login | Route::Register)
    }

    pub fn guard(&self, session: &Session) -> GuardDecision {
        if !self.requires_auth() && !self.guest_only() {
            return GuardDecision::Allow;
        }
        if session.is_loading {
            return GuardDecision::Wait;
        }
        match (session.is_authenticated(), self.requires_auth()) {
            (false, true) => GuardDecision::Redirect(Route::Login),
            (true, false) => GuardDecision::Redirect(Route::Home),
            _ => GuardDecision::Allow,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}
