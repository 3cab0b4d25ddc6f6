//! Realtime fan-out bus.
//!
//! A process-wide publish/subscribe point that decouples the orchestrator from
//! any transport. Publishing never fails: a listener that errors or panics is
//! logged and skipped, and the remaining listeners still receive the event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{error, warn};

use crate::model::{SessionEvent, SessionEventType};

/// The unit delivered to realtime subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeEnvelope {
    #[serde(rename = "type")]
    pub event_type: SessionEventType,
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    pub payload: serde_json::Value,
}

impl RealtimeEnvelope {
    pub fn from_event(session_id: &str, event: &SessionEvent) -> Self {
        Self {
            event_type: event.event_type,
            timestamp: event.created_at,
            session_id: session_id.to_string(),
            payload: event.payload.clone(),
        }
    }
}

/// Receives every published envelope.
pub trait BusListener: Send + Sync {
    fn on_event(&self, envelope: &RealtimeEnvelope) -> anyhow::Result<()>;
}

impl<F> BusListener for F
where
    F: Fn(&RealtimeEnvelope) -> anyhow::Result<()> + Send + Sync,
{
    fn on_event(&self, envelope: &RealtimeEnvelope) -> anyhow::Result<()> {
        self(envelope)
    }
}

#[derive(Default)]
struct Registry {
    listeners: RwLock<BTreeMap<u64, Arc<dyn BusListener>>>,
    next_id: AtomicU64,
    publish_count: AtomicU64,
}

impl Registry {
    fn remove(&self, id: u64) -> bool {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        listeners.remove(&id).is_some()
    }
}

/// Cheaply clonable handle to the shared bus.
#[derive(Clone, Default)]
pub struct RealtimeBus {
    registry: Arc<Registry>,
}

/// Returned by [`RealtimeBus::subscribe`]; call [`Subscription::unsubscribe`] to detach.
#[must_use = "dropping a subscription keeps the listener attached; call `unsubscribe` to detach"]
pub struct Subscription {
    id: u64,
    registry: Arc<Registry>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Detaches the listener. Returns `false` if it was already removed.
    pub fn unsubscribe(self) -> bool {
        self.registry.remove(self.id)
    }
}

impl RealtimeBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: impl BusListener + 'static) -> Subscription {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry
            .listeners
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(id, Arc::new(listener));
        Subscription {
            id,
            registry: Arc::clone(&self.registry),
        }
    }

    /// Delivers `envelope` to every listener. Returns how many accepted it.
    pub fn publish(&self, envelope: &RealtimeEnvelope) -> usize {
        self.registry.publish_count.fetch_add(1, Ordering::Relaxed);
        // Snapshot so listeners may (un)subscribe from inside a callback.
        let listeners: Vec<(u64, Arc<dyn BusListener>)> = self
            .registry
            .listeners
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .map(|(id, listener)| (*id, Arc::clone(listener)))
            .collect();

        let mut delivered = 0;
        for (id, listener) in listeners {
            match catch_unwind(AssertUnwindSafe(|| listener.on_event(envelope))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => warn!(
                    listener = id,
                    event = envelope.event_type.as_str(),
                    error = ?e,
                    "Realtime listener failed; event dropped for this listener"
                ),
                Err(_) => error!(
                    listener = id,
                    event = envelope.event_type.as_str(),
                    "Realtime listener panicked; event dropped for this listener"
                ),
            }
        }
        delivered
    }

    /// Publishes each session event as its own envelope.
    pub fn publish_events(&self, session_id: &str, events: &[SessionEvent]) {
        for event in events {
            self.publish(&RealtimeEnvelope::from_event(session_id, event));
        }
    }

    pub fn listener_count(&self) -> usize {
        self.registry
            .listeners
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn publish_count(&self) -> u64 {
        self.registry.publish_count.load(Ordering::Relaxed)
    }
}
