//! Admission gate for activity callbacks.
//!
//! Editors fire activity callbacks on every keystroke or cursor move. A
//! non-write event for the entity that was last accepted is dropped until
//! the heartbeat frequency window has passed. Saves always pass.

use chrono::{DateTime, Utc};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Last accepted entity and when it was accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebounceState {
    pub last_entity: String,
    pub last_accepted_at: Option<DateTime<Utc>>,
}

/// Debounce filter shared by all producer threads.
///
/// Concurrent check/record pairs resolve last-writer-wins; at worst one
/// extra heartbeat is accepted or one is dropped.
#[derive(Debug)]
pub struct DebounceGate {
    window: Duration,
    state: Mutex<DebounceState>,
}

impl DebounceGate {
    /// Create a gate with the given heartbeat frequency window.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            state: Mutex::new(DebounceState::default()),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Whether an event for `entity` at `now` should be dropped.
    pub fn should_drop(&self, entity: &str, is_write: bool, now: DateTime<Utc>) -> bool {
        if is_write {
            return false;
        }

        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.last_entity != entity {
            return false;
        }
        match state.last_accepted_at {
            // A clock that went backwards counts as inside the window.
            Some(last) => (now - last).to_std().map_or(true, |elapsed| elapsed < self.window),
            None => false,
        }
    }

    /// Remember an accepted event.
    pub fn record(&self, entity: &str, now: DateTime<Utc>) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.last_entity = entity.to_string();
        state.last_accepted_at = Some(now);
    }

    pub fn state(&self) -> DebounceState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(120);

    #[test]
    fn test_first_event_passes() {
        let gate = DebounceGate::new(WINDOW);
        assert!(!gate.should_drop("a.rs", false, Utc::now()));
        assert_eq!(gate.state(), DebounceState::default());
    }

    #[test]
    fn test_same_entity_inside_window_is_dropped() {
        let gate = DebounceGate::new(WINDOW);
        let t0 = Utc::now();
        gate.record("a.rs", t0);

        assert!(gate.should_drop("a.rs", false, t0 + chrono::Duration::seconds(30)));
        assert!(!gate.should_drop("a.rs", true, t0 + chrono::Duration::seconds(30)));
        assert!(!gate.should_drop("b.rs", false, t0 + chrono::Duration::seconds(30)));
    }

    #[test]
    fn test_window_expiry() {
        let gate = DebounceGate::new(WINDOW);
        let t0 = Utc::now();
        gate.record("a.rs", t0);

        assert!(gate.should_drop("a.rs", false, t0 + chrono::Duration::seconds(119)));
        assert!(!gate.should_drop("a.rs", false, t0 + chrono::Duration::seconds(120)));
    }

    #[test]
    fn test_clock_going_backwards_is_inside_window() {
        let gate = DebounceGate::new(WINDOW);
        let t0 = Utc::now();
        gate.record("a.rs", t0);
        assert!(gate.should_drop("a.rs", false, t0 - chrono::Duration::seconds(5)));
    }

    #[test]
    fn test_record_updates_state() {
        let gate = DebounceGate::new(WINDOW);
        let t0 = Utc::now();
        gate.record("a.rs", t0);
        gate.record("b.rs", t0);
        let state = gate.state();
        assert_eq!(state.last_entity, "b.rs");
        assert_eq!(state.last_accepted_at, Some(t0));
    }
}
