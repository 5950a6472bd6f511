//! Configuration for the admission gate.

use crate::events::{EventListeners, FnListener, GateEvent};
use crate::gate::Gate;
use std::fmt::Display;
use std::hash::Hash;
use std::time::Duration;

/// Configuration for a [`Gate`] instance.
#[derive(Clone)]
pub struct GateConfig<K> {
    /// Name of this gate instance.
    pub(crate) name: String,
    /// Event listeners.
    pub(crate) event_listeners: EventListeners<K>,
}

impl<K> GateConfig<K> {
    /// Creates a new configuration builder.
    pub fn builder() -> GateConfigBuilder<K> {
        GateConfigBuilder::new()
    }
}

/// Builder for gate configuration.
pub struct GateConfigBuilder<K> {
    name: String,
    event_listeners: EventListeners<K>,
}

impl<K> GateConfigBuilder<K> {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            name: "gate".to_string(),
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets the name of this gate instance.
    ///
    /// The name labels events, tracing output and metrics.
    /// Default: "gate"
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked when a key is acquired.
    ///
    /// # Callback Signature
    /// `Fn(&K)` - Called with the key that was just marked busy.
    pub fn on_acquired<F>(mut self, f: F) -> Self
    where
        F: Fn(&K) + Send + Sync + 'static,
        K: 'static,
    {
        self.event_listeners.add(FnListener::new(move |event: &GateEvent<K>| {
            if let GateEvent::Acquired { key, .. } = event {
                f(key);
            }
        }));
        self
    }

    /// Registers a callback invoked when an acquisition is rejected.
    ///
    /// Rejections are the gate doing its job, not errors; this hook exists so
    /// callers can count contention.
    ///
    /// # Callback Signature
    /// `Fn(&K)` - Called with the key that was found busy.
    pub fn on_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn(&K) + Send + Sync + 'static,
        K: 'static,
    {
        self.event_listeners.add(FnListener::new(move |event: &GateEvent<K>| {
            if let GateEvent::Rejected { key, .. } = event {
                f(key);
            }
        }));
        self
    }

    /// Registers a callback invoked when a key returns to free.
    ///
    /// # Callback Signature
    /// `Fn(&K, Duration)` - Called with the released key and how long it was
    /// held, from acquisition until release.
    pub fn on_released<F>(mut self, f: F) -> Self
    where
        F: Fn(&K, Duration) + Send + Sync + 'static,
        K: 'static,
    {
        self.event_listeners.add(FnListener::new(move |event: &GateEvent<K>| {
            if let GateEvent::Released { key, held_for, .. } = event {
                f(key, *held_for);
            }
        }));
        self
    }

    /// Builds the configuration and returns a [`Gate`].
    pub fn build(self) -> Gate<K>
    where
        K: Hash + Eq + Clone + Display,
    {
        Gate::new(GateConfig {
            name: self.name,
            event_listeners: self.event_listeners,
        })
    }
}

impl<K> Default for GateConfigBuilder<K> {
    fn default() -> Self {
        Self::new()
    }
}
