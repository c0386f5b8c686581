//! POS Order Engine
//!
//! The order engine is the core of a multi-tenant restaurant point-of-sale system. It takes orders from staff
//! terminals and guest QR sessions, prices them against the menu, records and reconciles payments, keeps track of
//! cashier shifts, and tells everyone who is watching when something changes.
//!
//! The library is divided into these main sections:
//! 1. Order store management ([`mod@db`]). SQLite is the supported backend. You should never need to access the
//!    database directly. Instead, use the public API provided by the engine. The exception is the data types used in
//!    the database. These are defined in the [`db_types`] module and are public.
//! 2. The engine public API ([`pos_api`]). Order flow, payment ledger and shift ledger, each generic over the store
//!    traits its backend must implement. [`PosEngine`] wires them together.
//! 3. Pricing ([`pricing`]) against a read-only menu and outlet catalog ([`catalog`]).
//! 4. Side channels: real-time fan-out to connected sessions and in-process lifecycle hooks ([`events`]), and the
//!    audit trail ([`audit`]). None of these can fail the operation that triggered them.
mod db;

pub mod audit;
pub mod catalog;
pub mod config;
pub mod db_types;
mod engine;
pub mod events;
pub mod pos_api;
pub mod pricing;

#[cfg(feature = "sqlite")]
pub use db::sqlite::{SqliteDatabase, SqliteDatabaseError};
pub use db::traits::{
    InsertOrderResult,
    InsertPaymentResult,
    OpenShiftResult,
    OrderManagement,
    OrderQueryFilter,
    Page,
    PaymentManagement,
    PaymentUpdateResult,
    PosDatabase,
    ShiftManagement,
    StatusUpdateResult,
};
pub use engine::PosEngine;
pub use pos_api::{
    errors::{ErrorKind, PosApiError},
    notifier::Notifier,
    order_flow_api::OrderFlowApi,
    order_objects,
    payment_api::PaymentLedgerApi,
    shift_api::ShiftLedgerApi,
};
