use crate::{
    db::traits::OpenShiftResult,
    db_types::{Money, NewShift, Shift},
};

/// The `ShiftManagement` trait defines how cashier shifts are recorded in the database backend.
///
/// Backends must enforce "one open shift per (outlet, cashier)" at the store level so that it holds under concurrent
/// opens.
#[allow(async_fn_in_trait)]
pub trait ShiftManagement {
    type Error: std::error::Error;

    async fn open_shift(&self, shift: NewShift) -> Result<OpenShiftResult, Self::Error>;

    /// Closes the cashier's most recently opened shift in the company, whichever outlet it is in. Returns `None` if the
    /// cashier has no open shift.
    async fn close_shift(
        &self,
        company_id: &str,
        cashier_id: &str,
        closing_cash: Money,
        note: Option<&str>,
    ) -> Result<Option<Shift>, Self::Error>;

    async fn current_shift(
        &self,
        company_id: &str,
        outlet_id: &str,
        cashier_id: &str,
    ) -> Result<Option<Shift>, Self::Error>;
}
