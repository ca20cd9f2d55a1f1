//! RAII handle for observer and listener registrations.

use std::fmt;

/// Handle returned by every `subscribe`-style call in this crate.
///
/// The registration is removed when [`Subscription::unsubscribe`] is called
/// or when the handle is dropped, whichever happens first. Keeping the
/// handle alive is what keeps the registration alive.
#[must_use = "dropping a Subscription immediately removes the registration"]
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Create a subscription that runs `release` exactly once.
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// A subscription with nothing to release.
    pub fn noop() -> Self {
        Self { release: None }
    }

    /// Remove the registration now.
    pub fn unsubscribe(mut self) {
        self.release_now();
    }

    /// Whether the registration is still held by this handle.
    pub fn is_active(&self) -> bool {
        self.release.is_some()
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}
