use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderStatusType, Payment, Shift};

#[derive(Debug, Clone)]
pub enum InsertOrderResult {
    /// The order (and its initial payment, if one was supplied) was written.
    Inserted { order: Order, payment: Option<Payment> },
    /// Another order already uses this order code. Nothing was written.
    CodeTaken,
}

#[derive(Debug, Clone)]
pub enum InsertPaymentResult {
    /// The payment was recorded. `order` reflects the updated cached payment status.
    Inserted { payment: Payment, order: Order },
    OrderNotFound,
    /// The order already has a settled payment. Nothing was written.
    AlreadyPaid,
}

#[derive(Debug, Clone)]
pub enum PaymentUpdateResult {
    Updated { payment: Payment, order: Order },
    NotFound,
    /// The payment had already been settled.
    AlreadyPaid,
    /// The payment had already been rejected.
    AlreadyRejected,
    /// A different payment for the same order has already been settled.
    OrderAlreadySettled,
}

#[derive(Debug, Clone)]
pub enum OpenShiftResult {
    Opened(Shift),
    AlreadyOpen,
}

#[derive(Debug, Clone)]
pub enum StatusUpdateResult {
    Updated(Order),
    NotFound,
    /// The order's status was no longer the expected one. Carries the status that was found.
    Stale(OrderStatusType),
}

/// Criteria for listing orders. Results are always sorted newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderQueryFilter {
    pub company_id: String,
    pub outlet_id: Option<String>,
    pub statuses: Vec<OrderStatusType>,
    /// One-based page number.
    pub page: u32,
    pub page_size: u32,
}

impl OrderQueryFilter {
    pub fn for_company<S: Into<String>>(company_id: S) -> Self {
        Self { company_id: company_id.into(), outlet_id: None, statuses: Vec::new(), page: 1, page_size: 20 }
    }

    pub fn for_outlet<S: Into<String>>(company_id: S, outlet_id: S) -> Self {
        Self { outlet_id: Some(outlet_id.into()), ..Self::for_company(company_id) }
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        if !self.statuses.contains(&status) {
            self.statuses.push(status);
        }
        self
    }

    pub fn with_statuses(self, statuses: &[OrderStatusType]) -> Self {
        statuses.iter().fold(self, |filter, s| filter.with_status(*s))
    }

    pub fn with_page(mut self, page: u32, page_size: u32) -> Self {
        self.page = page;
        self.page_size = page_size;
        self
    }

    /// Number of rows to skip to reach the requested page.
    pub fn offset(&self) -> i64 {
        i64::from(self.page.max(1) - 1) * i64::from(self.page_size)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total number of matching records across all pages.
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.page_size))
    }
}
