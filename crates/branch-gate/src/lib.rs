//! Keyed admission gate for long-running background operations.
//!
//! The gate answers one question: may a new operation start for this resource
//! key right now? Acquisition is test-and-set — if the key is free it is
//! marked busy and the caller receives a [`Permit`]; if it is already busy the
//! caller is rejected immediately. There is no queuing, no ownership token and
//! no timeout: a rejected caller retries later or gives up.
//!
//! This is the classic pattern for preventing duplicate concurrent execution
//! of a non-reentrant operation (a deploy, a branch merge, a backfill) where
//! the second caller must be told "busy" rather than made to wait.
//!
//! # Basic Example
//!
//! ```rust
//! use branch_gate::{Gate, GateConfig};
//!
//! let gate: Gate<String> = GateConfig::builder().name("merge").build();
//!
//! let permit = gate.try_acquire("main".to_string()).unwrap();
//! assert!(gate.try_acquire("main".to_string()).is_err());
//!
//! // Other keys are independent.
//! assert!(gate.try_acquire("dev".to_string()).is_ok());
//!
//! drop(permit);
//! assert!(gate.try_acquire("main".to_string()).is_ok());
//! ```
//!
//! # Example with Event Listeners
//!
//! Monitor gate behavior using event listeners:
//!
//! ```rust
//! use branch_gate::{Gate, GateConfig};
//!
//! let gate: Gate<String> = GateConfig::builder()
//!     .name("monitored-gate")
//!     .on_acquired(|key| {
//!         println!("acquired: {key}");
//!     })
//!     .on_rejected(|key| {
//!         println!("rejected: {key}");
//!     })
//!     .on_released(|key, held_for| {
//!         println!("released: {key} after {held_for:?}");
//!     })
//!     .build();
//!
//! let _permit = gate.try_acquire("main".to_string()).unwrap();
//! ```
//!
//! # Scoped Release
//!
//! The [`Permit`] releases its key when dropped, on every exit path including
//! a panic inside the guarded work. Move the permit into the task that does
//! the work and let scope handle the rest:
//!
//! ```rust
//! # async fn example() {
//! use branch_gate::{Gate, GateConfig};
//!
//! let gate: Gate<String> = GateConfig::builder().build();
//!
//! if let Ok(permit) = gate.try_acquire("main".to_string()) {
//!     tokio::spawn(async move {
//!         // ... long-running work ...
//!         drop(permit); // key released even if the work panics
//!     });
//! }
//! # }
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod gate;

pub use config::{GateConfig, GateConfigBuilder};
pub use error::GateError;
pub use events::{FnListener, GateEvent, GateListener};
pub use gate::{Gate, Permit};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn fresh_gate_grants_any_key() {
        let gate: Gate<&str> = GateConfig::builder().build();
        assert!(gate.try_acquire("a").is_ok());
        assert!(gate.try_acquire("b").is_ok());
    }

    #[test]
    fn builder_instantiates_for_any_displayable_key() {
        // Pins the builder's public bounds: any Hash + Eq + Clone + Display
        // key type must be able to build a gate through generic code.
        fn build_gate<K>() -> Gate<K>
        where
            K: std::hash::Hash + Eq + Clone + std::fmt::Display,
        {
            GateConfig::builder().name("generic").build()
        }

        let gate = build_gate::<u64>();
        let _permit = gate.try_acquire(7).unwrap();
        assert!(gate.try_acquire(7).is_err());
    }

    #[test]
    fn same_key_rejected_while_held() {
        let gate: Gate<String> = GateConfig::builder().name("test-gate").build();

        let permit = gate.try_acquire("main".to_string()).unwrap();
        assert_eq!(permit.key().as_str(), "main");

        let err = gate.try_acquire("main".to_string()).unwrap_err();
        assert_eq!(err, GateError::Busy { key: "main".to_string() });

        // A different key is unaffected.
        assert!(gate.try_acquire("dev".to_string()).is_ok());
    }

    #[test]
    fn permit_drop_releases() {
        let gate: Gate<String> = GateConfig::builder().build();

        let permit = gate.try_acquire("main".to_string()).unwrap();
        assert!(gate.is_busy(&"main".to_string()));

        drop(permit);
        assert!(!gate.is_busy(&"main".to_string()));
        assert!(gate.try_acquire("main".to_string()).is_ok());
    }

    #[test]
    fn release_is_idempotent() {
        let gate: Gate<String> = GateConfig::builder().build();

        gate.release(&"main".to_string());
        gate.release(&"main".to_string());
        assert!(!gate.is_busy(&"main".to_string()));
        assert!(gate.try_acquire("main".to_string()).is_ok());
    }

    #[test]
    fn stale_permit_does_not_evict_new_holder() {
        let gate: Gate<String> = GateConfig::builder().build();

        let stale = gate.try_acquire("main".to_string()).unwrap();
        gate.release(&"main".to_string());

        // The key was re-acquired between the explicit release and the stale
        // permit's drop; the drop must not free the new holder's claim.
        let _current = gate.try_acquire("main".to_string()).unwrap();
        drop(stale);
        assert!(gate.is_busy(&"main".to_string()));
    }

    #[test]
    fn released_keys_are_forgotten() {
        let gate: Gate<String> = GateConfig::builder().build();

        for i in 0..100 {
            let permit = gate.try_acquire(format!("branch-{i}")).unwrap();
            drop(permit);
        }
        assert_eq!(gate.held_keys(), 0);
    }

    #[test]
    fn listeners_observe_full_lifecycle() {
        let acquired = Arc::new(AtomicUsize::new(0));
        let rejected = Arc::new(AtomicUsize::new(0));
        let released = Arc::new(AtomicUsize::new(0));
        let (a, rj, rl) = (acquired.clone(), rejected.clone(), released.clone());

        let gate: Gate<String> = GateConfig::builder()
            .name("lifecycle")
            .on_acquired(move |_| {
                a.fetch_add(1, Ordering::SeqCst);
            })
            .on_rejected(move |_| {
                rj.fetch_add(1, Ordering::SeqCst);
            })
            .on_released(move |_, _| {
                rl.fetch_add(1, Ordering::SeqCst);
            })
            .build();

        let permit = gate.try_acquire("main".to_string()).unwrap();
        let _ = gate.try_acquire("main".to_string());
        drop(permit);

        assert_eq!(acquired.load(Ordering::SeqCst), 1);
        assert_eq!(rejected.load(Ordering::SeqCst), 1);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panicking_listener_does_not_poison_gate() {
        let released = Arc::new(AtomicUsize::new(0));
        let rl = Arc::clone(&released);

        let gate: Gate<String> = GateConfig::builder()
            .on_acquired(|_| panic!("bad listener"))
            .on_released(move |_, _| {
                rl.fetch_add(1, Ordering::SeqCst);
            })
            .build();

        let permit = gate.try_acquire("main".to_string()).unwrap();
        assert!(gate.is_busy(&"main".to_string()));
        drop(permit);

        assert!(!gate.is_busy(&"main".to_string()));
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn gate_error_display() {
        let err = GateError::Busy { key: "main".to_string() };
        assert!(err.to_string().contains("main"));
        assert!(err.to_string().contains("busy"));
    }

    #[test]
    fn event_accessors() {
        use std::time::Instant;

        let at = Instant::now();

        let event = GateEvent::Acquired {
            gate: "test".to_string(),
            timestamp: at,
            key: "main".to_string(),
        };
        assert_eq!(event.event_type(), "acquired");
        assert_eq!(event.gate_name(), "test");
        assert_eq!(event.timestamp(), at);
        assert_eq!(event.key().as_str(), "main");

        let event = GateEvent::Rejected {
            gate: "test".to_string(),
            timestamp: at,
            key: "main".to_string(),
        };
        assert_eq!(event.event_type(), "rejected");
        assert_eq!(event.key().as_str(), "main");

        let event = GateEvent::Released {
            gate: "test".to_string(),
            timestamp: at,
            key: "main".to_string(),
            held_for: Duration::from_millis(50),
        };
        assert_eq!(event.event_type(), "released");
        assert_eq!(event.timestamp(), at);
        assert_eq!(event.key().as_str(), "main");
    }
}
