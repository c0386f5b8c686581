use thiserror::Error;

use crate::{
    db_types::{OrderStatusType, PaymentMethod},
    pricing::PricingError,
};

/// Broad classes of failure, for mapping onto transport status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidRequest,
    Conflict,
    Exhausted,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PosApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Could not read catalog data: {0}")]
    CatalogError(String),
    #[error("Order not found")]
    OrderNotFound,
    #[error("Payment not found")]
    PaymentNotFound,
    #[error("There is no open shift")]
    ShiftNotFound,
    #[error("Outlet {0} does not exist or is not active")]
    OutletNotFound(String),
    #[error("Invalid order request: {0}")]
    InvalidRequest(String),
    #[error("{0}")]
    PricingError(PricingError),
    #[error("Payment method {0} is not enabled at this outlet")]
    PaymentMethodNotEnabled(PaymentMethod),
    #[error("Cannot move an order from {from} to {to}")]
    InvalidTransition { from: OrderStatusType, to: OrderStatusType },
    #[error("The order has already been paid")]
    AlreadyPaid,
    #[error("The payment has already been confirmed")]
    AlreadyConfirmed,
    #[error("The payment has already been rejected")]
    PaymentAlreadyRejected,
    #[error("The cashier already has an open shift at this outlet")]
    ShiftAlreadyOpen,
    #[error("The order was modified concurrently. Please retry.")]
    ConcurrentModification,
    #[error("Could not generate a unique order code after {0} attempts")]
    CodeGenerationExhausted(usize),
}

impl PosApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DatabaseError(_) | Self::CatalogError(_) => ErrorKind::Internal,
            Self::OrderNotFound | Self::PaymentNotFound | Self::ShiftNotFound | Self::OutletNotFound(_) => {
                ErrorKind::NotFound
            },
            Self::InvalidRequest(_) | Self::PricingError(_) | Self::PaymentMethodNotEnabled(_) => {
                ErrorKind::InvalidRequest
            },
            Self::InvalidTransition { .. } |
            Self::AlreadyPaid |
            Self::AlreadyConfirmed |
            Self::PaymentAlreadyRejected |
            Self::ShiftAlreadyOpen |
            Self::ConcurrentModification => ErrorKind::Conflict,
            Self::CodeGenerationExhausted(_) => ErrorKind::Exhausted,
        }
    }
}

impl From<PricingError> for PosApiError {
    fn from(e: PricingError) -> Self {
        match e {
            PricingError::CatalogError(s) => Self::CatalogError(s),
            e => Self::PricingError(e),
        }
    }
}

/// Converts a backend error into the caller-facing taxonomy. Backend details are kept in the message only.
pub(crate) fn db_error<E: std::error::Error>(e: E) -> PosApiError {
    PosApiError::DatabaseError(e.to_string())
}
