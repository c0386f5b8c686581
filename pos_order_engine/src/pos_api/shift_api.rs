use std::fmt::Debug;

use chrono::Utc;
use log::*;

use crate::{
    db::traits::{OpenShiftResult, ShiftManagement},
    db_types::{Money, NewShift, Shift},
    pos_api::{
        errors::{db_error, PosApiError},
        notifier::Notifier,
        order_objects::RequestContext,
    },
};

/// Opens and closes cashier shifts. A cashier can have at most one open shift per outlet.
pub struct ShiftLedgerApi<B> {
    db: B,
    notifier: Notifier,
}

impl<B> Debug for ShiftLedgerApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ShiftLedgerApi")
    }
}

impl<B> ShiftLedgerApi<B> {
    pub fn new(db: B, notifier: Notifier) -> Self {
        Self { db, notifier }
    }
}

impl<B> ShiftLedgerApi<B>
where B: ShiftManagement
{
    pub async fn open_shift(
        &self,
        ctx: &RequestContext,
        outlet_id: &str,
        cashier_id: &str,
        opening_cash: Money,
        note: Option<&str>,
    ) -> Result<Shift, PosApiError> {
        if opening_cash.is_negative() {
            return Err(PosApiError::InvalidRequest("Opening cash cannot be negative".into()));
        }
        let shift = NewShift {
            company_id: ctx.company_id.clone(),
            outlet_id: outlet_id.to_string(),
            cashier_id: cashier_id.to_string(),
            opening_cash,
            note: note.map(String::from),
            opened_at: Utc::now(),
        };
        match self.db.open_shift(shift).await.map_err(db_error)? {
            OpenShiftResult::Opened(shift) => {
                info!("🕰️ Shift #{} opened for cashier {cashier_id} at outlet {outlet_id}", shift.id);
                self.notifier.shift_opened(ctx, &shift);
                Ok(shift)
            },
            OpenShiftResult::AlreadyOpen => {
                info!("🕰️ Cashier {cashier_id} already has an open shift at outlet {outlet_id}");
                Err(PosApiError::ShiftAlreadyOpen)
            },
        }
    }

    /// Closes the cashier's open shift. If the cashier somehow has open shifts at several outlets, the most recently
    /// opened one is closed. Closing is final; a closed shift is never reopened.
    pub async fn close_shift(
        &self,
        ctx: &RequestContext,
        cashier_id: &str,
        closing_cash: Money,
        note: Option<&str>,
    ) -> Result<Shift, PosApiError> {
        if closing_cash.is_negative() {
            return Err(PosApiError::InvalidRequest("Closing cash cannot be negative".into()));
        }
        let closed = self.db.close_shift(&ctx.company_id, cashier_id, closing_cash, note).await.map_err(db_error)?;
        let Some(shift) = closed else {
            debug!("🕰️ Cashier {cashier_id} has no open shift to close");
            return Err(PosApiError::ShiftNotFound);
        };
        info!("🕰️ Shift #{} closed for cashier {cashier_id} with {closing_cash} in the till", shift.id);
        self.notifier.shift_closed(ctx, &shift);
        Ok(shift)
    }

    pub async fn get_current_shift(
        &self,
        ctx: &RequestContext,
        outlet_id: &str,
        cashier_id: &str,
    ) -> Result<Option<Shift>, PosApiError> {
        self.db.current_shift(&ctx.company_id, outlet_id, cashier_id).await.map_err(db_error)
    }
}
