//! Event system for gate observability.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Events emitted by a [`Gate`](crate::Gate) over a key's lifecycle.
#[derive(Debug, Clone)]
pub enum GateEvent<K> {
    /// A key was free and has been marked busy.
    Acquired {
        /// Name of the gate instance.
        gate: String,
        /// When the acquisition happened.
        timestamp: Instant,
        /// The key that was acquired.
        key: K,
    },
    /// An acquisition attempt found the key busy.
    Rejected {
        /// Name of the gate instance.
        gate: String,
        /// When the rejection happened.
        timestamp: Instant,
        /// The key that was contended.
        key: K,
    },
    /// A busy key returned to free.
    Released {
        /// Name of the gate instance.
        gate: String,
        /// When the release happened.
        timestamp: Instant,
        /// The key that was released.
        key: K,
        /// How long the key was held.
        held_for: Duration,
    },
}

impl<K> GateEvent<K> {
    /// Returns the type of event ("acquired", "rejected", "released").
    pub fn event_type(&self) -> &'static str {
        match self {
            GateEvent::Acquired { .. } => "acquired",
            GateEvent::Rejected { .. } => "rejected",
            GateEvent::Released { .. } => "released",
        }
    }

    /// Returns the name of the gate instance that emitted this event.
    pub fn gate_name(&self) -> &str {
        match self {
            GateEvent::Acquired { gate, .. }
            | GateEvent::Rejected { gate, .. }
            | GateEvent::Released { gate, .. } => gate,
        }
    }

    /// Returns when this event occurred.
    pub fn timestamp(&self) -> Instant {
        match self {
            GateEvent::Acquired { timestamp, .. }
            | GateEvent::Rejected { timestamp, .. }
            | GateEvent::Released { timestamp, .. } => *timestamp,
        }
    }

    /// Returns the key this event is about.
    pub fn key(&self) -> &K {
        match self {
            GateEvent::Acquired { key, .. }
            | GateEvent::Rejected { key, .. }
            | GateEvent::Released { key, .. } => key,
        }
    }
}

/// Trait for listening to gate events.
pub trait GateListener<K>: Send + Sync {
    /// Called when an event occurs.
    fn on_event(&self, event: &GateEvent<K>);
}

/// A simple function-based event listener.
pub struct FnListener<F> {
    f: F,
}

impl<F> FnListener<F> {
    /// Creates a new function-based listener.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<K, F> GateListener<K> for FnListener<F>
where
    F: Fn(&GateEvent<K>) + Send + Sync,
{
    fn on_event(&self, event: &GateEvent<K>) {
        (self.f)(event)
    }
}

/// A collection of event listeners.
pub(crate) struct EventListeners<K> {
    listeners: Vec<Arc<dyn GateListener<K>>>,
}

impl<K> Clone for EventListeners<K> {
    fn clone(&self) -> Self {
        Self {
            listeners: self.listeners.clone(),
        }
    }
}

impl<K> EventListeners<K> {
    pub(crate) fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub(crate) fn add<L>(&mut self, listener: L)
    where
        L: GateListener<K> + 'static,
    {
        self.listeners.push(Arc::new(listener));
    }

    /// Emits an event to all registered listeners.
    ///
    /// A panicking listener is caught so the remaining listeners still run.
    pub(crate) fn emit(&self, event: &GateEvent<K>) {
        for listener in &self.listeners {
            let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                listener.on_event(event);
            }));
        }
    }
}

impl<K> fmt::Debug for EventListeners<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventListeners")
            .field("len", &self.listeners.len())
            .finish()
    }
}
