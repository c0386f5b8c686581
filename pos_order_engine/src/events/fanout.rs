//! # Real-time fan-out
//!
//! Connected sessions (staff terminals, kitchen displays, guest order-tracking pages) join logical channels and receive
//! every event published to those channels while they are joined:
//!
//! * a **staff channel** per `(company, outlet)`, joined by staff terminals on connect, and
//! * a **customer channel** per order, joined by the guest's tracking page.
//!
//! Delivery is fire-and-forget and at-most-once. Nothing is persisted or replayed: a session that joins after an event
//! was published never sees it, and reconnecting clients re-fetch current state from the order and payment records.
//!
//! The engine depends only on the [`EventPublisher`] trait. [`ChannelHub`] is the in-process implementation that the
//! socket layer plugs its connections into.
use std::{
    collections::HashSet,
    fmt::Display,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use dashmap::DashMap;
use log::*;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::{db_types::Order, events::PosEvent};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FanoutChannel {
    Staff { company_id: String, outlet_id: String },
    Customer { order_id: i64 },
}

impl FanoutChannel {
    pub fn staff<S: Into<String>>(company_id: S, outlet_id: S) -> Self {
        Self::Staff { company_id: company_id.into(), outlet_id: outlet_id.into() }
    }

    pub fn customer(order_id: i64) -> Self {
        Self::Customer { order_id }
    }

    pub fn staff_for(order: &Order) -> Self {
        Self::staff(order.company_id.as_str(), order.outlet_id.as_str())
    }

    pub fn customer_for(order: &Order) -> Self {
        Self::customer(order.id)
    }
}

impl Display for FanoutChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Staff { company_id, outlet_id } => write!(f, "staff:{company_id}:{outlet_id}"),
            Self::Customer { order_id } => write!(f, "order:{order_id}"),
        }
    }
}

/// Narrow interface the order and payment flows use to notify connected sessions.
///
/// Implementations must not block: publishing happens on the request path, and a slow or disconnected subscriber
/// must never delay the response.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, channel: &FanoutChannel, event: &PosEvent);
}

/// A publisher that discards everything. Useful when running the engine without any connected clients.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPublisher;

impl EventPublisher for NullPublisher {
    fn publish(&self, channel: &FanoutChannel, event: &PosEvent) {
        trace!("📡️ No publisher configured. Dropping {} for {channel}", event.event_type());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(u64);

impl Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// A single event as delivered to a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    pub channel: FanoutChannel,
    pub event_type: String,
    pub payload: serde_json::Value,
}

/// The receiving end of a connected session.
#[derive(Debug)]
pub struct Subscription {
    pub session_id: SessionId,
    pub receiver: mpsc::Receiver<Delivery>,
}

#[derive(Debug)]
struct HubState {
    next_session: AtomicU64,
    session_buffer: usize,
    sessions: DashMap<SessionId, mpsc::Sender<Delivery>>,
    channels: DashMap<FanoutChannel, HashSet<SessionId>>,
}

/// In-process channel registry. Cheap to clone; clones share the same sessions.
#[derive(Debug, Clone)]
pub struct ChannelHub {
    state: Arc<HubState>,
}

impl Default for ChannelHub {
    fn default() -> Self {
        Self::new(64)
    }
}

impl ChannelHub {
    /// Creates a hub where each session can have up to `session_buffer` undelivered events queued.
    pub fn new(session_buffer: usize) -> Self {
        let state = HubState {
            next_session: AtomicU64::new(1),
            session_buffer: session_buffer.max(1),
            sessions: DashMap::new(),
            channels: DashMap::new(),
        };
        Self { state: Arc::new(state) }
    }

    /// Registers a new session. The session receives nothing until it joins at least one channel.
    pub fn connect(&self) -> Subscription {
        let session_id = SessionId(self.state.next_session.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = mpsc::channel(self.state.session_buffer);
        self.state.sessions.insert(session_id, sender);
        debug!("📡️ {session_id} connected");
        Subscription { session_id, receiver }
    }

    /// Adds the session to the channel. Returns `false` if the session is not connected.
    pub fn join(&self, session_id: SessionId, channel: FanoutChannel) -> bool {
        if !self.state.sessions.contains_key(&session_id) {
            warn!("📡️ {session_id} tried to join {channel}, but it is not connected");
            return false;
        }
        debug!("📡️ {session_id} joined {channel}");
        self.state.channels.entry(channel).or_default().insert(session_id);
        true
    }

    /// Removes the session from the channel. Returns `false` if it was not a member.
    pub fn leave(&self, session_id: SessionId, channel: &FanoutChannel) -> bool {
        let removed = match self.state.channels.get_mut(channel) {
            Some(mut members) => members.remove(&session_id),
            None => false,
        };
        self.state.channels.remove_if(channel, |_, members| members.is_empty());
        if removed {
            debug!("📡️ {session_id} left {channel}");
        }
        removed
    }

    /// Removes the session and all of its channel memberships.
    pub fn disconnect(&self, session_id: SessionId) {
        self.state.sessions.remove(&session_id);
        self.state.channels.iter_mut().for_each(|mut entry| {
            entry.value_mut().remove(&session_id);
        });
        self.state.channels.retain(|_, members| !members.is_empty());
        debug!("📡️ {session_id} disconnected");
    }

    pub fn member_count(&self, channel: &FanoutChannel) -> usize {
        self.state.channels.get(channel).map(|m| m.len()).unwrap_or(0)
    }

    pub fn session_count(&self) -> usize {
        self.state.sessions.len()
    }

    /// Delivers the payload to every session currently joined to the channel. Returns the number of sessions that
    /// accepted the event. Sessions whose queue is full miss this event; sessions that have gone away are pruned.
    pub fn publish_raw(&self, channel: &FanoutChannel, event_type: &str, payload: serde_json::Value) -> usize {
        let members: Vec<SessionId> = match self.state.channels.get(channel) {
            Some(members) => members.iter().copied().collect(),
            None => return 0,
        };
        let mut delivered = 0;
        let mut gone = Vec::new();
        for session_id in members {
            let Some(sender) = self.state.sessions.get(&session_id).map(|s| s.value().clone()) else {
                gone.push(session_id);
                continue;
            };
            let delivery =
                Delivery { channel: channel.clone(), event_type: event_type.to_string(), payload: payload.clone() };
            match sender.try_send(delivery) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!("📡️ {session_id} is not keeping up. {event_type} on {channel} was dropped for it.");
                },
                Err(TrySendError::Closed(_)) => gone.push(session_id),
            }
        }
        for session_id in gone {
            self.disconnect(session_id);
        }
        trace!("📡️ {event_type} delivered to {delivered} session(s) on {channel}");
        delivered
    }
}

impl EventPublisher for ChannelHub {
    fn publish(&self, channel: &FanoutChannel, event: &PosEvent) {
        match event.payload() {
            Ok(payload) => {
                self.publish_raw(channel, event.event_type(), payload);
            },
            Err(e) => error!("📡️ Could not serialize {} for {channel}: {e}", event.event_type()),
        }
    }
}
