//! Session value types.

use serde::{Deserialize, Serialize};

/// Authenticated user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
            email: None,
            avatar_url: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_avatar_url(mut self, url: impl Into<String>) -> Self {
        self.avatar_url = Some(url.into());
        self
    }

    /// Best human-readable name: display name, then email, then id.
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(&self.id)
    }

    /// Return a copy with the update's fields applied.
    pub fn updated(&self, update: &ProfileUpdate) -> Self {
        let mut next = self.clone();
        if let Some(name) = &update.display_name {
            next.display_name = Some(name.clone());
        }
        if let Some(url) = &update.avatar_url {
            next.avatar_url = Some(url.clone());
        }
        next
    }
}

/// Partial profile change. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl ProfileUpdate {
    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn avatar_url(mut self, url: impl Into<String>) -> Self {
        self.avatar_url = Some(url.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.avatar_url.is_none()
    }
}

/// Observable phase derived from a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionPhase {
    /// Startup; the provider has not reported yet.
    Unknown,
    /// An operation is in flight; identity is the pre-operation value.
    Authenticating,
    Authenticated,
    Unauthenticated,
}

/// Snapshot of "who is logged in".
///
/// Sessions are plain values. Only the session manager writes them into
/// the store; consumers only ever see copies. Equality compares phases too,
/// so the startup value differs from a pending operation with no identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub identity: Option<Identity>,
    pub is_loading: bool,
    /// Set only on the startup value; any manager write clears it.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    initial: bool,
}

impl Session {
    /// Startup value: loading, nobody signed in.
    pub fn unknown() -> Self {
        Self {
            identity: None,
            is_loading: true,
            initial: true,
        }
    }

    /// Value written when the provider reports `identity`.
    pub fn settled(identity: Option<Identity>) -> Self {
        Self {
            identity,
            is_loading: false,
            initial: false,
        }
    }

    /// Same identity, operation in flight.
    pub fn authenticating(&self) -> Self {
        Self {
            identity: self.identity.clone(),
            is_loading: true,
            initial: false,
        }
    }

    /// Same identity, nothing in flight. Written after a rejected operation.
    pub fn idle(&self) -> Self {
        Self {
            identity: self.identity.clone(),
            is_loading: false,
            initial: false,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        match (self.is_loading, &self.identity) {
            (true, _) if self.initial => SessionPhase::Unknown,
            (true, _) => SessionPhase::Authenticating,
            (false, Some(_)) => SessionPhase::Authenticated,
            (false, None) => SessionPhase::Unauthenticated,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::unknown()
    }
}
