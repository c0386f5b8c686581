use std::fmt::Debug;

use chrono::Utc;
use log::*;

use crate::{
    catalog::OutletDirectory,
    db::traits::{InsertPaymentResult, OrderManagement, PaymentManagement, PaymentUpdateResult},
    db_types::{Order, Payment},
    pos_api::{
        errors::{db_error, PosApiError},
        notifier::Notifier,
        order_flow_api::payment_draft,
        order_objects::{PaymentRequest, RequestContext},
    },
};

/// `PaymentLedgerApi` records payment attempts against orders and reconciles them.
///
/// A payment starts `PENDING` and is confirmed (`PAID`) or rejected (`REJECTED`) exactly once. An order can have any
/// number of payments, but at most one of them may ever be settled. The order's cached payment status always follows
/// its payments.
pub struct PaymentLedgerApi<B, C> {
    db: B,
    outlets: C,
    notifier: Notifier,
}

impl<B, C> Debug for PaymentLedgerApi<B, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentLedgerApi")
    }
}

impl<B, C> PaymentLedgerApi<B, C> {
    pub fn new(db: B, outlets: C, notifier: Notifier) -> Self {
        Self { db, outlets, notifier }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B, C> PaymentLedgerApi<B, C>
where
    B: OrderManagement + PaymentManagement,
    C: OutletDirectory,
{
    /// Records a new payment against an existing order. The amount defaults to the order total.
    ///
    /// A cash payment with `mark_as_paid` is settled immediately and settles the order with it. Any payment is
    /// refused once the order has been paid.
    pub async fn create_payment(
        &self,
        ctx: &RequestContext,
        order_id: i64,
        request: PaymentRequest,
    ) -> Result<Payment, PosApiError> {
        let order = self.fetch_order(ctx, order_id).await?;
        self.check_method_enabled(&order, &request).await?;
        let draft = payment_draft(ctx, &request, order.total, Utc::now())?;
        let result = PaymentManagement::insert_payment(&self.db, &ctx.company_id, order_id, draft)
            .await
            .map_err(db_error)?;
        match result {
            InsertPaymentResult::Inserted { payment, order } => {
                info!(
                    "💰️ {} payment #{} of {} recorded for order {} ({})",
                    payment.method, payment.id, payment.amount, order.order_code, payment.status
                );
                self.notifier.payment_created(ctx, &payment, &order);
                Ok(payment)
            },
            InsertPaymentResult::OrderNotFound => Err(PosApiError::OrderNotFound),
            InsertPaymentResult::AlreadyPaid => {
                info!("💰️ Order #{order_id} is already paid. Payment refused.");
                Err(PosApiError::AlreadyPaid)
            },
        }
    }

    async fn check_method_enabled(&self, order: &Order, request: &PaymentRequest) -> Result<(), PosApiError> {
        let outlet = self
            .outlets
            .fetch_outlet(&order.outlet_id)
            .await
            .map_err(|e| PosApiError::CatalogError(e.to_string()))?;
        match outlet {
            Some(outlet) if !outlet.settings.accepts(request.method) => {
                Err(PosApiError::PaymentMethodNotEnabled(request.method))
            },
            Some(_) => Ok(()),
            None => {
                warn!(
                    "💰️ Outlet {} of order #{} is no longer in the directory. Refusing {} payment.",
                    order.outlet_id, order.id, request.method
                );
                Err(PosApiError::OutletNotFound(order.outlet_id.clone()))
            },
        }
    }

    /// Confirms a pending payment. The confirming user is recorded and the order becomes `PAID`.
    pub async fn confirm_payment(
        &self,
        ctx: &RequestContext,
        payment_id: i64,
        note: Option<&str>,
    ) -> Result<Payment, PosApiError> {
        let result = self.db.settle_payment(&ctx.company_id, payment_id, ctx.actor(), note).await.map_err(db_error)?;
        let (payment, order) = settled_or_error(result)?;
        info!("💰️ Payment #{payment_id} confirmed. Order {} is paid.", order.order_code);
        self.notifier.payment_updated(ctx, &payment, &order);
        Ok(payment)
    }

    /// Confirms the most recent payment recorded against the order.
    pub async fn confirm_payment_by_order(
        &self,
        ctx: &RequestContext,
        order_id: i64,
        note: Option<&str>,
    ) -> Result<Payment, PosApiError> {
        self.fetch_order(ctx, order_id).await?;
        let latest = self.db.latest_payment_for_order(&ctx.company_id, order_id).await.map_err(db_error)?;
        let Some(payment) = latest else {
            debug!("💰️ Order #{order_id} has no payments to confirm");
            return Err(PosApiError::PaymentNotFound);
        };
        self.confirm_payment(ctx, payment.id, note).await
    }

    /// Rejects a pending payment. The order drops back to `UNPAID` unless another payment settled it.
    pub async fn reject_payment(
        &self,
        ctx: &RequestContext,
        payment_id: i64,
        note: Option<&str>,
    ) -> Result<Payment, PosApiError> {
        let result = self.db.reject_payment(&ctx.company_id, payment_id, note).await.map_err(db_error)?;
        let (payment, order) = settled_or_error(result)?;
        info!("💰️ Payment #{payment_id} rejected. Order {} is {}.", order.order_code, order.payment_status);
        self.notifier.payment_updated(ctx, &payment, &order);
        Ok(payment)
    }

    /// All payments recorded against the order, newest first.
    pub async fn find_payments_by_order(
        &self,
        ctx: &RequestContext,
        order_id: i64,
    ) -> Result<Vec<Payment>, PosApiError> {
        self.fetch_order(ctx, order_id).await?;
        self.db.fetch_payments_for_order(&ctx.company_id, order_id).await.map_err(db_error)
    }

    pub async fn get_payment(&self, ctx: &RequestContext, payment_id: i64) -> Result<Payment, PosApiError> {
        self.db.fetch_payment(&ctx.company_id, payment_id).await.map_err(db_error)?.ok_or(PosApiError::PaymentNotFound)
    }

    async fn fetch_order(&self, ctx: &RequestContext, order_id: i64) -> Result<Order, PosApiError> {
        self.db.fetch_order(&ctx.company_id, order_id).await.map_err(db_error)?.ok_or(PosApiError::OrderNotFound)
    }
}

fn settled_or_error(result: PaymentUpdateResult) -> Result<(Payment, Order), PosApiError> {
    match result {
        PaymentUpdateResult::Updated { payment, order } => Ok((payment, order)),
        PaymentUpdateResult::NotFound => Err(PosApiError::PaymentNotFound),
        PaymentUpdateResult::AlreadyPaid => Err(PosApiError::AlreadyConfirmed),
        PaymentUpdateResult::AlreadyRejected => Err(PosApiError::PaymentAlreadyRejected),
        PaymentUpdateResult::OrderAlreadySettled => Err(PosApiError::AlreadyPaid),
    }
}
