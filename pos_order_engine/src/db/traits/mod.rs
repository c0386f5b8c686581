//! # Order store contracts
//!
//! This module defines the interface contracts that database *backends* must fulfil to act as the order store for
//! the engine. The APIs in [`crate::pos_api`] are generic over these traits and never touch SQL directly.
//!
//! * [`PosDatabase`] is the root trait: connection-level behaviour shared by every backend.
//! * [`OrderManagement`] persists orders and their embedded item snapshots, and drives status updates.
//! * [`PaymentManagement`] records payment attempts and settles or rejects them.
//! * [`ShiftManagement`] opens and closes cashier shifts.
//!
//! Every read and write is scoped by company id. Conflicts that the store detects atomically (a taken order code, a
//! second settled payment, a second open shift, a status that changed underneath the caller) are reported as typed
//! outcomes rather than errors, so that the API layer can turn them into the right caller-facing failure.
mod data_objects;
mod order_management;
mod payment_management;
mod shift_management;

pub use data_objects::{
    InsertOrderResult,
    InsertPaymentResult,
    OpenShiftResult,
    OrderQueryFilter,
    Page,
    PaymentUpdateResult,
    StatusUpdateResult,
};
pub use order_management::OrderManagement;
pub use payment_management::PaymentManagement;
pub use shift_management::ShiftManagement;

#[allow(async_fn_in_trait)]
pub trait PosDatabase: Clone {
    type Error: std::error::Error;

    /// The URL of the database
    fn url(&self) -> &str;

    /// Closes the connection pool. Outstanding queries are allowed to complete.
    async fn close(&mut self) -> Result<(), Self::Error>;
}
