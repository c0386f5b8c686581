use std::{fmt::Debug, sync::Arc};

use log::*;
use serde_json::json;

use crate::{
    audit::{AuditAction, AuditEntry, AuditRecorder},
    db_types::{Order, OrderStatusType, Payment, PaymentStatus, Shift},
    events::{
        EventProducers,
        EventPublisher,
        FanoutChannel,
        NullPublisher,
        OrderCreatedEvent,
        OrderStatusChangedEvent,
        PaymentEvent,
        PaymentSettledEvent,
        PosEvent,
    },
    pos_api::order_objects::RequestContext,
};

/// The side channels that follow every successful mutation: real-time fan-out, lifecycle hooks and the audit trail.
///
/// Every method is synchronous and infallible. Failures inside any of the channels are logged and swallowed.
#[derive(Clone)]
pub struct Notifier {
    publisher: Arc<dyn EventPublisher>,
    producers: EventProducers,
    audit: AuditRecorder,
}

impl Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Notifier({:?})", self.audit)
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::silent()
    }
}

impl Notifier {
    pub fn new(publisher: Arc<dyn EventPublisher>, producers: EventProducers, audit: AuditRecorder) -> Self {
        Self { publisher, producers, audit }
    }

    /// A notifier that publishes nothing, calls no hooks and drops audit entries.
    pub fn silent() -> Self {
        Self::new(Arc::new(NullPublisher), EventProducers::default(), AuditRecorder::discard())
    }

    fn publish_to_staff(&self, order: &Order, event: &PosEvent) {
        self.publisher.publish(&FanoutChannel::staff_for(order), event);
    }

    fn publish_to_all(&self, order: &Order, event: &PosEvent) {
        self.publisher.publish(&FanoutChannel::staff_for(order), event);
        self.publisher.publish(&FanoutChannel::customer_for(order), event);
    }

    pub fn order_created(&self, ctx: &RequestContext, order: &Order) {
        trace!("🔄️ Notifying order created for #{}", order.id);
        let event = OrderCreatedEvent::new(order.clone());
        self.publish_to_staff(order, &PosEvent::OrderCreated(event.clone()));
        self.producers.order_created(&event);
        let detail = json!({
            "order_code": order.order_code,
            "outlet_id": order.outlet_id,
            "channel": order.channel,
            "total": order.total,
        });
        let entry = AuditEntry::new(ctx.actor(), &ctx.company_id, AuditAction::OrderCreated, order.id);
        self.audit.record(entry.with_detail(detail));
    }

    pub fn order_status_changed(&self, ctx: &RequestContext, order: &Order, old_status: OrderStatusType) {
        trace!("🔄️ Notifying status change {old_status} -> {} for #{}", order.status, order.id);
        let event = OrderStatusChangedEvent::new(order.clone(), old_status);
        self.publish_to_all(order, &PosEvent::OrderStatusUpdated(event.clone()));
        self.producers.order_status_changed(&event);
        let detail = json!({ "from": old_status, "to": order.status });
        let entry = AuditEntry::new(ctx.actor(), &ctx.company_id, AuditAction::OrderStatusUpdated, order.id);
        self.audit.record(entry.with_detail(detail));
    }

    pub fn payment_created(&self, ctx: &RequestContext, payment: &Payment, order: &Order) {
        trace!("💰️ Notifying payment #{} created for order #{}", payment.id, order.id);
        let event = PaymentEvent::new(payment.clone(), order.payment_status);
        self.publish_to_all(order, &PosEvent::PaymentCreated(event));
        if payment.status == PaymentStatus::Paid {
            self.producers.payment_settled(&PaymentSettledEvent::new(payment.clone(), order.clone()));
        }
        self.audit.record(
            AuditEntry::new(ctx.actor(), &ctx.company_id, AuditAction::PaymentCreated, payment.id)
                .with_detail(payment_detail(payment)),
        );
    }

    /// Notifies a payment confirmation or rejection.
    pub fn payment_updated(&self, ctx: &RequestContext, payment: &Payment, order: &Order) {
        trace!("💰️ Notifying payment #{} is now {}", payment.id, payment.status);
        let event = PaymentEvent::new(payment.clone(), order.payment_status);
        self.publish_to_all(order, &PosEvent::PaymentUpdated(event));
        let action = match payment.status {
            PaymentStatus::Paid => {
                self.producers.payment_settled(&PaymentSettledEvent::new(payment.clone(), order.clone()));
                AuditAction::PaymentConfirmed
            },
            _ => AuditAction::PaymentRejected,
        };
        self.audit.record(
            AuditEntry::new(ctx.actor(), &ctx.company_id, action, payment.id).with_detail(payment_detail(payment)),
        );
    }

    pub fn shift_opened(&self, ctx: &RequestContext, shift: &Shift) {
        let detail = json!({
            "outlet_id": shift.outlet_id,
            "cashier_id": shift.cashier_id,
            "opening_cash": shift.opening_cash,
        });
        let entry = AuditEntry::new(ctx.actor(), &ctx.company_id, AuditAction::ShiftOpened, shift.id);
        self.audit.record(entry.with_detail(detail));
    }

    pub fn shift_closed(&self, ctx: &RequestContext, shift: &Shift) {
        let detail = json!({ "outlet_id": shift.outlet_id, "closing_cash": shift.closing_cash });
        let entry = AuditEntry::new(ctx.actor(), &ctx.company_id, AuditAction::ShiftClosed, shift.id);
        self.audit.record(entry.with_detail(detail));
    }
}

fn payment_detail(payment: &Payment) -> serde_json::Value {
    json!({
        "order_id": payment.order_id,
        "method": payment.method,
        "amount": payment.amount,
        "status": payment.status,
    })
}
