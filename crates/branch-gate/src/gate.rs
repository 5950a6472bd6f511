//! Gate implementation: test-and-set admission control per key.

use crate::config::GateConfig;
use crate::error::GateError;
use crate::events::GateEvent;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Instant;

#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter, describe_gauge, gauge};

#[cfg(feature = "metrics")]
static METRICS_INIT: std::sync::Once = std::sync::Once::new();

/// One outstanding acquisition. The sequence number ties a [`Permit`] to the
/// exact map entry it created.
#[derive(Clone, Copy)]
struct Claim {
    seq: u64,
    acquired_at: Instant,
}

struct Shared<K> {
    /// Busy keys, mapped to their current claim. Absent means free.
    busy: Mutex<HashMap<K, Claim>>,
    next_seq: std::sync::atomic::AtomicU64,
    config: GateConfig<K>,
}

/// Keyed admission gate.
///
/// Cheap to clone; clones share the same state. Keys must be
/// `Hash + Eq + Clone + Display` (`Display` is used in errors, tracing and
/// events).
///
/// The check-and-mark in [`try_acquire`](Gate::try_acquire) happens under one
/// mutex acquisition, so no two callers can both observe "free" and both win
/// the same key.
pub struct Gate<K> {
    shared: Arc<Shared<K>>,
}

impl<K> Clone for Gate<K> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<K> Gate<K>
where
    K: Hash + Eq + Clone + Display,
{
    pub(crate) fn new(config: GateConfig<K>) -> Self {
        #[cfg(feature = "metrics")]
        METRICS_INIT.call_once(|| {
            describe_counter!(
                "gate_acquired_total",
                "Total number of successful key acquisitions"
            );
            describe_counter!(
                "gate_rejected_total",
                "Total number of acquisitions rejected because the key was busy"
            );
            describe_counter!(
                "gate_released_total",
                "Total number of keys released back to free"
            );
            describe_gauge!("gate_held_keys", "Current number of busy keys");
        });

        Self {
            shared: Arc::new(Shared {
                busy: Mutex::new(HashMap::new()),
                next_seq: std::sync::atomic::AtomicU64::new(0),
                config,
            }),
        }
    }

    /// Atomically checks whether `key` is busy and, if not, marks it busy.
    ///
    /// On success the returned [`Permit`] holds the key busy until it is
    /// dropped. On contention returns [`GateError::Busy`] with no side
    /// effects; rejection is immediate, there is no queue.
    pub fn try_acquire(&self, key: K) -> Result<Permit<K>, GateError<K>> {
        let claim = Claim {
            seq: self
                .shared
                .next_seq
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed),
            acquired_at: Instant::now(),
        };
        {
            let mut busy = self.shared.busy.lock();
            if busy.contains_key(&key) {
                drop(busy);

                #[cfg(feature = "tracing")]
                tracing::warn!(gate = %self.shared.config.name, key = %key, "acquisition rejected, key is busy");

                #[cfg(feature = "metrics")]
                counter!("gate_rejected_total", "gate" => self.shared.config.name.clone())
                    .increment(1);

                self.shared.config.event_listeners.emit(&GateEvent::Rejected {
                    gate: self.shared.config.name.clone(),
                    timestamp: Instant::now(),
                    key: key.clone(),
                });

                return Err(GateError::Busy { key });
            }
            busy.insert(key.clone(), claim);

            #[cfg(feature = "metrics")]
            gauge!("gate_held_keys", "gate" => self.shared.config.name.clone())
                .set(busy.len() as f64);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(gate = %self.shared.config.name, key = %key, "key acquired");

        #[cfg(feature = "metrics")]
        counter!("gate_acquired_total", "gate" => self.shared.config.name.clone()).increment(1);

        self.shared.config.event_listeners.emit(&GateEvent::Acquired {
            gate: self.shared.config.name.clone(),
            timestamp: Instant::now(),
            key: key.clone(),
        });

        Ok(Permit {
            shared: Arc::clone(&self.shared),
            key,
            claim,
        })
    }

    /// Returns whether `key` is currently held busy.
    pub fn is_busy(&self, key: &K) -> bool {
        self.shared.busy.lock().contains_key(key)
    }

    /// Returns the number of keys currently held busy.
    pub fn held_keys(&self) -> usize {
        self.shared.busy.lock().len()
    }

    /// Unconditionally marks `key` as free.
    ///
    /// Idempotent: releasing a free key is a no-op. This frees the key even
    /// if an outstanding [`Permit`] still exists for it, so prefer dropping
    /// the permit; this method is for callers managing lifetimes manually.
    pub fn release(&self, key: &K) {
        let claim = self.shared.busy.lock().remove(key);
        if let Some(claim) = claim {
            release_bookkeeping(&self.shared, key, claim.acquired_at);
        }
    }
}

/// Common path for a key returning to free: logs, metrics, events.
fn release_bookkeeping<K>(shared: &Shared<K>, key: &K, acquired_at: Instant)
where
    K: Hash + Eq + Clone + Display,
{
    let held_for = acquired_at.elapsed();

    #[cfg(feature = "tracing")]
    tracing::debug!(gate = %shared.config.name, key = %key, ?held_for, "key released");

    #[cfg(feature = "metrics")]
    {
        counter!("gate_released_total", "gate" => shared.config.name.clone()).increment(1);
        gauge!("gate_held_keys", "gate" => shared.config.name.clone())
            .set(shared.busy.lock().len() as f64);
    }

    shared.config.event_listeners.emit(&GateEvent::Released {
        gate: shared.config.name.clone(),
        timestamp: Instant::now(),
        key: key.clone(),
        held_for,
    });
}

/// A granted admission for one key.
///
/// Dropping the permit releases the key, on every exit path including panics
/// in the guarded work. A permit that has been undercut by an explicit
/// [`Gate::release`] followed by a re-acquisition will not free the new
/// holder's claim on drop.
pub struct Permit<K: Hash + Eq + Clone + Display> {
    shared: Arc<Shared<K>>,
    key: K,
    claim: Claim,
}

impl<K: Hash + Eq + Clone + Display> Permit<K> {
    /// Returns the key this permit holds busy.
    pub fn key(&self) -> &K {
        &self.key
    }
}

impl<K: Hash + Eq + Clone + Display> Drop for Permit<K> {
    fn drop(&mut self) {
        let removed = {
            let mut busy = self.shared.busy.lock();
            // Only remove the entry this permit created; the key may have
            // been explicitly released and re-acquired since.
            match busy.get(&self.key) {
                Some(claim) if claim.seq == self.claim.seq => {
                    busy.remove(&self.key);
                    true
                }
                _ => false,
            }
        };
        if removed {
            release_bookkeeping(&self.shared, &self.key, self.claim.acquired_at);
        }
    }
}

impl<K: Hash + Eq + Clone + Display> std::fmt::Debug for Permit<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Permit").field("key", &self.key.to_string()).finish()
    }
}
