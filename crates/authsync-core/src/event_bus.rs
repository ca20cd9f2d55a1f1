//! Asynchronous session event stream.
//!
//! The [`SessionStore`](crate::SessionStore) delivers changes synchronously to
//! in-process observers. The EventBus carries the same changes, plus
//! operation lifecycle events, to async consumers (log shippers, devtools
//! panels, tasks on another runtime) that would rather `recv().await`.
//!
//! # Example
//!
//! ```rust
//! use authsync_core::event_bus::{EventBus, SessionEvent};
//! use authsync_core::session::Operation;
//!
//! let bus = EventBus::new();
//! let mut rx = bus.subscribe();
//!
//! bus.emit(SessionEvent::OperationStarted { operation: Operation::SignOut });
//!
//! // In async context:
//! // let event = rx.recv().await.unwrap();
//! # let _ = rx.try_recv();
//! ```

use crate::session::{Operation, Session, SessionPhase};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Default channel capacity for the event bus.
/// Slow subscribers that fall further behind than this miss events (lag).
pub const DEFAULT_CAPACITY: usize = 256;

/// Something that happened to the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SessionEvent {
    /// An operation set the loading flag and called the provider.
    OperationStarted { operation: Operation },

    /// The provider rejected an operation.
    OperationFailed { operation: Operation, error: String },

    /// The provider reported a new auth state and it was written to the store.
    StateChanged {
        session: Session,
        phase: SessionPhase,
    },
}

impl SessionEvent {
    pub fn state_changed(session: &Session) -> Self {
        SessionEvent::StateChanged {
            session: session.clone(),
            phase: session.phase(),
        }
    }
}

/// Broadcast channel for [`SessionEvent`]s.
pub struct EventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    /// Create a new EventBus with default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a new EventBus with specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Emit an event to all subscribers.
    ///
    /// Returns the number of subscribers that received it; 0 when nobody is
    /// listening, which is not an error.
    pub fn emit(&self, event: SessionEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Receive all future events. Past events are not replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Identity;

    fn started(operation: Operation) -> SessionEvent {
        SessionEvent::OperationStarted { operation }
    }

    mod session_event {
        use super::*;

        #[test]
        fn state_changed_captures_phase() {
            let session = Session::settled(Some(Identity::new("1")));
            match SessionEvent::state_changed(&session) {
                SessionEvent::StateChanged { phase, .. } => {
                    assert_eq!(phase, SessionPhase::Authenticated)
                }
                other => panic!("Expected StateChanged, got {other:?}"),
            }
        }

        #[test]
        fn serializes_with_kind_tag() {
            let json = serde_json::to_value(SessionEvent::OperationFailed {
                operation: Operation::SignInWithGoogle,
                error: "closed".to_string(),
            })
            .unwrap();
            assert_eq!(json["kind"], "operationFailed");
            assert_eq!(json["operation"], "signInWithGoogle");
            assert_eq!(json["error"], "closed");
        }
    }

    mod event_bus {
        use super::*;

        #[test]
        fn new_has_no_subscribers() {
            assert_eq!(EventBus::new().subscriber_count(), 0);
            assert_eq!(EventBus::default().subscriber_count(), 0);
        }

        #[test]
        fn zero_capacity_is_clamped() {
            let bus = EventBus::with_capacity(0);
            let _rx = bus.subscribe();
            assert_eq!(bus.emit(started(Operation::SignOut)), 1);
        }

        #[test]
        fn emit_without_subscribers_returns_zero() {
            let bus = EventBus::new();
            assert_eq!(bus.emit(started(Operation::SignOut)), 0);
        }

        #[test]
        fn dropped_subscriber_decrements_count() {
            let bus = EventBus::new();
            let rx = bus.subscribe();
            assert_eq!(bus.subscriber_count(), 1);
            drop(rx);
            assert_eq!(bus.subscriber_count(), 0);
        }

        #[tokio::test]
        async fn events_arrive_in_order() {
            let bus = EventBus::new();
            let mut rx = bus.subscribe();

            bus.emit(started(Operation::SignInWithGoogle));
            bus.emit(started(Operation::SignOut));

            assert_eq!(rx.recv().await.unwrap(), started(Operation::SignInWithGoogle));
            assert_eq!(rx.recv().await.unwrap(), started(Operation::SignOut));
        }

        #[tokio::test]
        async fn late_subscriber_misses_old_events() {
            let bus = EventBus::new();
            let _early = bus.subscribe();
            bus.emit(started(Operation::SignOut));

            let mut late = bus.subscribe();
            assert!(late.try_recv().is_err());
        }

        #[tokio::test]
        async fn slow_subscriber_lags() {
            let bus = EventBus::with_capacity(2);
            let mut rx = bus.subscribe();
            for _ in 0..3 {
                bus.emit(started(Operation::SignOut));
            }
            assert!(matches!(
                rx.recv().await,
                Err(broadcast::error::RecvError::Lagged(_))
            ));
        }
    }
}
