//! Realtime gateway.
//!
//! Subscribes to the simulation bus once and re-publishes every envelope on a
//! tokio broadcast channel, tagged with the session's channel. Each WebSocket
//! connection filters that stream down to the one room it has joined.

use lyceum_core::bus::{RealtimeBus, RealtimeEnvelope, Subscription};
use lyceum_core::model::{Channel, SessionEventType};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// One bus envelope, routed to a `(channel, session)` room.
#[derive(Debug, Clone)]
pub struct RoomEvent {
    pub channel: Channel,
    pub session_id: String,
    /// The envelope serialized once, shared by every receiving socket.
    pub frame: Arc<str>,
}

impl RoomEvent {
    pub fn is_for(&self, channel: Channel, room: Option<&str>) -> bool {
        self.channel == channel && room == Some(self.session_id.as_str())
    }
}

type ChannelIndex = Arc<RwLock<HashMap<String, Channel>>>;

pub struct Gateway {
    tx: broadcast::Sender<RoomEvent>,
    channels: ChannelIndex,
    subscription: Mutex<Option<Subscription>>,
}

impl Gateway {
    /// Attaches to `bus`. `capacity` bounds how far a slow socket may lag.
    pub fn attach(bus: &RealtimeBus, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        let channels: ChannelIndex = Arc::default();

        let sender = tx.clone();
        let index = Arc::clone(&channels);
        let subscription = bus.subscribe(move |envelope: &RealtimeEnvelope| -> anyhow::Result<()> {
            if envelope.event_type == SessionEventType::SessionCreated {
                let channel: Channel = serde_json::from_value(envelope.payload["channel"].clone())?;
                index
                    .write()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .insert(envelope.session_id.clone(), channel);
            }
            let channel = index
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .get(&envelope.session_id)
                .copied();
            let Some(channel) = channel else {
                anyhow::bail!("no channel known for session '{}'", envelope.session_id);
            };

            let frame: Arc<str> = serde_json::to_string(envelope)?.into();
            // No connected sockets is not an error.
            let receivers = sender
                .send(RoomEvent {
                    channel,
                    session_id: envelope.session_id.clone(),
                    frame,
                })
                .unwrap_or(0);
            debug!(
                event = envelope.event_type.as_str(),
                session_id = %envelope.session_id,
                %channel,
                receivers,
                "Bridged realtime event"
            );
            Ok(())
        });
        info!(capacity, "Realtime gateway attached to the event bus");

        Self {
            tx,
            channels,
            subscription: Mutex::new(Some(subscription)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RoomEvent> {
        self.tx.subscribe()
    }

    /// Records a session's channel for sessions created before the gateway attached.
    pub fn register_session(&self, session_id: &str, channel: Channel) {
        self.channels
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(session_id.to_string(), channel);
    }

    /// Drops an ended session from the channel index. Later events for it are discarded.
    pub fn forget_session(&self, session_id: &str) -> bool {
        self.channels
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(session_id)
            .is_some()
    }

    pub fn tracked_sessions(&self) -> usize {
        self.channels
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn channel_of(&self, session_id: &str) -> Option<Channel> {
        self.channels
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(session_id)
            .copied()
    }

    pub fn connection_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Stops bridging. Returns `false` if already detached.
    pub fn detach(&self) -> bool {
        let subscription = self
            .subscription
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        match subscription {
            Some(subscription) => subscription.unsubscribe(),
            None => {
                warn!("Realtime gateway was already detached");
                false
            }
        }
    }
}
