//! # Point-of-sale engine public API
//!
//! The `pos_api` module exposes the programmatic API of the order engine. It is split by concern, so that a caller
//! can pick the parts it needs:
//!
//! * [`order_flow_api`] places orders (pricing them against the catalog), looks them up and drives them through the
//!   service lifecycle.
//! * [`payment_api`] records payment attempts against orders and confirms or rejects them.
//! * [`shift_api`] opens and closes cashier shifts.
//!
//! # API usage
//!
//! Every API is created from a database backend that implements the store traits it needs, plus a [`Notifier`] that
//! carries the fan-out publisher, lifecycle hooks and audit trail. Most callers will let
//! [`PosEngine`](crate::PosEngine) assemble them instead.
//!
//! ```rust,ignore
//! use pos_order_engine::{catalog::InMemoryCatalog, config::EngineConfig, Notifier, OrderFlowApi, SqliteDatabase};
//! let config = EngineConfig::from_env_or_default();
//! let db = SqliteDatabase::from_config(&config).await?;
//! let api = OrderFlowApi::new(db, InMemoryCatalog::new(), Notifier::silent(), config);
//! let order = api.get_order_by_code("K7Q2MX").await?;
//! ```
//!
//! Every call takes a [`RequestContext`](order_objects::RequestContext); all reads and writes are scoped to its
//! company. The one exception is [`OrderFlowApi::get_order_by_code`](order_flow_api::OrderFlowApi), which serves
//! guest order tracking.
pub mod errors;
pub mod notifier;
pub mod order_flow_api;
pub mod order_objects;
pub mod payment_api;
pub mod shift_api;

pub use notifier::Notifier;
