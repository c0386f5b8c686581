use cucumber::World;
use pos_order_engine::{
    db_types::{Order, Payment, Shift},
    order_objects::RequestContext,
    PosApiError,
};

use crate::support::fixtures::{guest, manager, staff, TestSystem};

#[derive(Default, Debug, World)]
pub struct PosWorld {
    pub system: Option<TestSystem>,
    pub order: Option<Order>,
    pub payment: Option<Payment>,
    pub shift: Option<Shift>,
    pub last_error: Option<PosApiError>,
}

impl PosWorld {
    pub fn system(&self) -> &TestSystem {
        self.system.as_ref().expect("Order engine not initialised")
    }

    pub fn order(&self) -> &Order {
        self.order.as_ref().expect("No order has been placed")
    }

    pub fn payment(&self) -> &Payment {
        self.payment.as_ref().expect("No payment has been recorded")
    }

    pub fn context_for(&self, role: &str) -> RequestContext {
        match role {
            "manager" => manager(),
            "guest" => guest(),
            _ => staff(),
        }
    }

    /// Stores the outcome of a request. Failures are kept for a later `Then the request fails` step.
    pub fn record<T, F: FnOnce(&mut Self, T)>(&mut self, result: Result<T, PosApiError>, on_success: F) {
        match result {
            Ok(value) => {
                self.last_error = None;
                on_success(self, value);
            },
            Err(e) => self.last_error = Some(e),
        }
    }
}

/// The variant name of an error, e.g. `InvalidTransition` for `InvalidTransition { from, to }`.
pub fn error_name(e: &PosApiError) -> String {
    format!("{e:?}").chars().take_while(|c| c.is_alphanumeric()).collect()
}
