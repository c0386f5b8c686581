use crate::{
    db::traits::{InsertOrderResult, OrderQueryFilter, Page, StatusUpdateResult},
    db_types::{NewOrder, Order, OrderCode, OrderStatusType, PaymentDraft},
};

/// The `OrderManagement` trait defines how orders are persisted and queried in the database backend.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    type Error: std::error::Error;

    /// Writes a new order with status `NEW`, and its initial payment if one is given, in a single atomic transaction.
    ///
    /// If the order code is already in use, nothing is written and [`InsertOrderResult::CodeTaken`] is returned so
    /// that the caller can retry with a fresh code.
    async fn insert_order(
        &self,
        order: NewOrder,
        payment: Option<PaymentDraft>,
    ) -> Result<InsertOrderResult, Self::Error>;

    /// Fetches the order with the given id, provided it belongs to the company.
    async fn fetch_order(&self, company_id: &str, order_id: i64) -> Result<Option<Order>, Self::Error>;

    /// Fetches an order by its public order code. This lookup is deliberately not tenant scoped: guests tracking an
    /// order only know the code.
    async fn fetch_order_by_code(&self, code: &OrderCode) -> Result<Option<Order>, Self::Error>;

    /// Lists orders matching the filter, newest first, along with the total number of matches.
    async fn search_orders(&self, filter: OrderQueryFilter) -> Result<Page<Order>, Self::Error>;

    /// Sets the order's status to `new_status`, but only if its current status is still `expected`.
    async fn update_order_status(
        &self,
        company_id: &str,
        order_id: i64,
        expected: OrderStatusType,
        new_status: OrderStatusType,
    ) -> Result<StatusUpdateResult, Self::Error>;
}
