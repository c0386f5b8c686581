use crate::{
    db::traits::{InsertPaymentResult, PaymentUpdateResult},
    db_types::{Payment, PaymentDraft},
};

/// The `PaymentManagement` trait defines the payment ledger behaviour of the database backend.
///
/// Backends must guarantee that at most one payment per order ever reaches `PAID`, even when two callers settle
/// different payments of the same order at the same time.
#[allow(async_fn_in_trait)]
pub trait PaymentManagement {
    type Error: std::error::Error;

    /// Records a new payment attempt against the order and updates the order's cached payment status to match.
    async fn insert_payment(
        &self,
        company_id: &str,
        order_id: i64,
        payment: PaymentDraft,
    ) -> Result<InsertPaymentResult, Self::Error>;

    async fn fetch_payment(&self, company_id: &str, payment_id: i64) -> Result<Option<Payment>, Self::Error>;

    /// All payment attempts for the order, newest first.
    async fn fetch_payments_for_order(&self, company_id: &str, order_id: i64) -> Result<Vec<Payment>, Self::Error>;

    /// The most recently created payment for the order, whatever its status.
    async fn latest_payment_for_order(&self, company_id: &str, order_id: i64)
        -> Result<Option<Payment>, Self::Error>;

    /// Moves a `PENDING` payment to `PAID`, records who confirmed it, and marks the order as paid.
    async fn settle_payment(
        &self,
        company_id: &str,
        payment_id: i64,
        confirmed_by: Option<&str>,
        note: Option<&str>,
    ) -> Result<PaymentUpdateResult, Self::Error>;

    /// Moves a `PENDING` payment to `REJECTED`. The order's payment status reverts to `UNPAID`.
    async fn reject_payment(
        &self,
        company_id: &str,
        payment_id: i64,
        note: Option<&str>,
    ) -> Result<PaymentUpdateResult, Self::Error>;
}
