use std::{fmt::Debug, sync::Arc};

use log::*;

use crate::{
    audit::{AuditSink, AuditTrail},
    config::EngineConfig,
    events::{ChannelHub, EventHandlers, EventHooks},
    pos_api::{
        notifier::Notifier,
        order_flow_api::OrderFlowApi,
        payment_api::PaymentLedgerApi,
        shift_api::ShiftLedgerApi,
    },
};
#[cfg(feature = "sqlite")]
use crate::{SqliteDatabase, SqliteDatabaseError};

/// Wires a backend and a catalog into the three APIs, sharing one fan-out hub, one set of lifecycle hooks and one
/// audit trail between them.
///
/// Must be created from within a tokio runtime, since the hook and audit workers are spawned on construction.
pub struct PosEngine<B, C> {
    hub: ChannelHub,
    orders: OrderFlowApi<B, C>,
    payments: PaymentLedgerApi<B, C>,
    shifts: ShiftLedgerApi<B>,
}

impl<B, C> Debug for PosEngine<B, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PosEngine ({} connected sessions)", self.hub.session_count())
    }
}

impl<B: Clone, C: Clone> PosEngine<B, C> {
    pub fn new<S: AuditSink>(db: B, catalog: C, config: EngineConfig, hooks: EventHooks, audit_sink: S) -> Self {
        let hub = ChannelHub::new(config.session_buffer_size);
        let handlers = EventHandlers::new(config.hook_buffer_size, hooks);
        let producers = handlers.producers();
        handlers.start_handlers();
        let audit = AuditTrail::start(audit_sink, config.hook_buffer_size);
        let notifier = Notifier::new(Arc::new(hub.clone()), producers, audit);
        info!(
            "🔄️ Order engine ready (strict transitions: {}, code retries: {})",
            config.strict_transitions, config.order_code_retries
        );
        let orders = OrderFlowApi::new(db.clone(), catalog.clone(), notifier.clone(), config);
        let payments = PaymentLedgerApi::new(db.clone(), catalog, notifier.clone());
        let shifts = ShiftLedgerApi::new(db, notifier);
        Self { hub, orders, payments, shifts }
    }
}

#[cfg(feature = "sqlite")]
impl<C: Clone> PosEngine<SqliteDatabase, C> {
    /// Connects to the SQLite database named in `config`, applies any outstanding migrations and starts the engine.
    pub async fn connect<S: AuditSink>(
        config: EngineConfig,
        catalog: C,
        hooks: EventHooks,
        audit_sink: S,
    ) -> Result<Self, SqliteDatabaseError> {
        let db = SqliteDatabase::from_config(&config).await?;
        db.run_migrations().await?;
        Ok(Self::new(db, catalog, config, hooks, audit_sink))
    }
}

impl<B, C> PosEngine<B, C> {
    pub fn orders(&self) -> &OrderFlowApi<B, C> {
        &self.orders
    }

    pub fn payments(&self) -> &PaymentLedgerApi<B, C> {
        &self.payments
    }

    pub fn shifts(&self) -> &ShiftLedgerApi<B> {
        &self.shifts
    }

    /// The fan-out hub. Transport code connects sessions here and joins them to staff or customer channels.
    pub fn hub(&self) -> &ChannelHub {
        &self.hub
    }
}
