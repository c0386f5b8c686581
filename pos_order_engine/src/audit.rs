//! # Audit trail
//!
//! Every state-changing operation in the engine leaves an [`AuditEntry`] behind: who did what, to which entity, in
//! which company. Entries are handed to an [`AuditSink`] on a background queue ([`AuditTrail`]), so a slow or failing
//! sink never holds up, or fails, the business operation that produced the entry.
use std::{
    fmt::Display,
    future::Future,
    pin::Pin,
    sync::{Arc, Mutex},
};

use chrono::{DateTime, Utc};
use log::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::events::{EventHandler, EventProducer, Handler};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuditAction {
    #[serde(rename = "order.create")]
    OrderCreated,
    #[serde(rename = "order.update_status")]
    OrderStatusUpdated,
    #[serde(rename = "payment.create")]
    PaymentCreated,
    #[serde(rename = "payment.confirm")]
    PaymentConfirmed,
    #[serde(rename = "payment.reject")]
    PaymentRejected,
    #[serde(rename = "shift.open")]
    ShiftOpened,
    #[serde(rename = "shift.close")]
    ShiftClosed,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OrderCreated => "order.create",
            Self::OrderStatusUpdated => "order.update_status",
            Self::PaymentCreated => "payment.create",
            Self::PaymentConfirmed => "payment.confirm",
            Self::PaymentRejected => "payment.reject",
            Self::ShiftOpened => "shift.open",
            Self::ShiftClosed => "shift.close",
        }
    }

    pub fn entity_type(&self) -> &'static str {
        match self {
            Self::OrderCreated | Self::OrderStatusUpdated => "order",
            Self::PaymentCreated | Self::PaymentConfirmed | Self::PaymentRejected => "payment",
            Self::ShiftOpened | Self::ShiftClosed => "shift",
        }
    }
}

impl Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// `None` for unauthenticated actors, e.g. a guest placing an order from the table QR code.
    pub actor_user_id: Option<String>,
    pub company_id: String,
    pub action: AuditAction,
    pub entity_type: String,
    pub entity_id: String,
    pub detail: Option<serde_json::Value>,
    pub recorded_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new<S: Display>(
        actor_user_id: Option<&str>,
        company_id: &str,
        action: AuditAction,
        entity_id: S,
    ) -> Self {
        Self {
            actor_user_id: actor_user_id.map(String::from),
            company_id: company_id.to_string(),
            action,
            entity_type: action.entity_type().to_string(),
            entity_id: entity_id.to_string(),
            detail: None,
            recorded_at: Utc::now(),
        }
    }

    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = Some(detail);
        self
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuditError {
    #[error("The audit sink is unavailable: {0}")]
    Unavailable(String),
    #[error("Could not write audit entry: {0}")]
    WriteFailed(String),
}

/// Destination for audit entries, e.g. an audit table owned by the platform's admin module.
pub trait AuditSink: Send + Sync + 'static {
    fn record(&self, entry: AuditEntry) -> impl Future<Output = Result<(), AuditError>> + Send;
}

/// Writes each entry to the application log at `info` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAuditSink;

impl AuditSink for LogAuditSink {
    fn record(&self, entry: AuditEntry) -> impl Future<Output = Result<(), AuditError>> + Send {
        async move {
            let actor = entry.actor_user_id.as_deref().unwrap_or("anonymous");
            match &entry.detail {
                Some(detail) => info!(
                    "📝️ [{}] {actor} {} {} {} {detail}",
                    entry.company_id, entry.action, entry.entity_type, entry.entity_id
                ),
                None => info!(
                    "📝️ [{}] {actor} {} {} {}",
                    entry.company_id, entry.action, entry.entity_type, entry.entity_id
                ),
            }
            Ok(())
        }
    }
}

/// Keeps every entry in memory. Cloning is cheap and clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryAuditSink {
    entries: Arc<Mutex<Vec<AuditEntry>>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_else(|e| e.into_inner().clone())
    }

    pub fn entries_for(&self, action: AuditAction) -> Vec<AuditEntry> {
        self.entries().into_iter().filter(|e| e.action == action).collect()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, entry: AuditEntry) -> impl Future<Output = Result<(), AuditError>> + Send {
        let entries = Arc::clone(&self.entries);
        async move {
            let mut entries = entries.lock().map_err(|e| AuditError::Unavailable(e.to_string()))?;
            entries.push(entry);
            Ok(())
        }
    }
}

/// Runs an [`AuditSink`] on its own event queue.
pub struct AuditTrail;

impl AuditTrail {
    /// Spawns the audit worker on the current tokio runtime and returns the handle used to submit entries.
    ///
    /// The worker shuts down once every [`AuditRecorder`] has been dropped and the queue has drained.
    pub fn start<S: AuditSink>(sink: S, buffer_size: usize) -> AuditRecorder {
        let sink = Arc::new(sink);
        let handler: Handler<AuditEntry> = Arc::new(move |entry: AuditEntry| {
            let sink = Arc::clone(&sink);
            Box::pin(async move {
                let action = entry.action;
                let entity = entry.entity_id.clone();
                if let Err(e) = sink.record(entry).await {
                    warn!("📝️ Audit entry for {action} on {entity} was lost: {e}");
                }
            }) as Pin<Box<dyn Future<Output = ()> + Send>>
        });
        let worker = EventHandler::new(buffer_size, handler);
        let producer = worker.subscribe();
        tokio::spawn(worker.start_handler());
        AuditRecorder { producer: Some(producer) }
    }
}

/// Cheap, cloneable handle for submitting audit entries. Submitting never blocks and never fails the caller.
#[derive(Clone, Default)]
pub struct AuditRecorder {
    producer: Option<EventProducer<AuditEntry>>,
}

impl std::fmt::Debug for AuditRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AuditRecorder(active: {})", self.producer.is_some())
    }
}

impl AuditRecorder {
    /// A recorder that drops every entry.
    pub fn discard() -> Self {
        Self { producer: None }
    }

    pub fn record(&self, entry: AuditEntry) {
        match &self.producer {
            Some(producer) => {
                trace!("📝️ Queueing audit entry {} {}", entry.action, entry.entity_id);
                producer.publish_event(entry);
            },
            None => trace!("📝️ Audit disabled. Dropping {} {}", entry.action, entry.entity_id),
        }
    }
}
