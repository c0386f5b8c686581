use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderPaymentStatus, OrderStatusType, Payment};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreatedEvent {
    pub order: Order,
}

impl OrderCreatedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusChangedEvent {
    pub order: Order,
    pub old_status: OrderStatusType,
    pub new_status: OrderStatusType,
}

impl OrderStatusChangedEvent {
    pub fn new(order: Order, old_status: OrderStatusType) -> Self {
        let new_status = order.status;
        Self { order, old_status, new_status }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentEvent {
    pub payment: Payment,
    /// The order's cached payment status after this payment event was applied.
    pub order_payment_status: OrderPaymentStatus,
}

impl PaymentEvent {
    pub fn new(payment: Payment, order_payment_status: OrderPaymentStatus) -> Self {
        Self { payment, order_payment_status }
    }
}

/// Emitted when a payment reaches `PAID`, either on creation (cash, settled on the spot) or on confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSettledEvent {
    pub payment: Payment,
    pub order: Order,
}

impl PaymentSettledEvent {
    pub fn new(payment: Payment, order: Order) -> Self {
        Self { payment, order }
    }
}

/// The events that are fanned out to connected staff terminals and guest order-tracking pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PosEvent {
    OrderCreated(OrderCreatedEvent),
    OrderStatusUpdated(OrderStatusChangedEvent),
    PaymentCreated(PaymentEvent),
    PaymentUpdated(PaymentEvent),
}

impl PosEvent {
    /// The event name that clients listen for.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::OrderCreated(_) => "order:created",
            Self::OrderStatusUpdated(_) => "order:status_updated",
            Self::PaymentCreated(_) => "payment:created",
            Self::PaymentUpdated(_) => "payment:updated",
        }
    }

    /// The JSON body delivered to clients, without the enum tag.
    pub fn payload(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            Self::OrderCreated(e) => serde_json::to_value(e),
            Self::OrderStatusUpdated(e) => serde_json::to_value(e),
            Self::PaymentCreated(e) | Self::PaymentUpdated(e) => serde_json::to_value(e),
        }
    }
}
