use std::fmt::Debug;

use log::*;
use sqlx::{migrate, SqliteConnection, SqlitePool};

use super::{new_pool, orders, payments, payments::PendingUpdate, shifts, SqliteDatabaseError};
use crate::{
    config::EngineConfig,
    db::traits::{
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
    },
    db_types::{
        Money,
        NewOrder,
        NewShift,
        Order,
        OrderCode,
        OrderPaymentStatus,
        OrderStatusType,
        Payment,
        PaymentDraft,
        PaymentStatus,
        Shift,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SqliteDatabase ({})", self.url)
    }
}

impl SqliteDatabase {
    /// Connects to the database named in the engine configuration, with a pool of at most `max_connections`.
    pub async fn from_config(config: &EngineConfig) -> Result<Self, SqliteDatabaseError> {
        info!("🗃️ Using database URL: {}", config.database_url);
        Self::new_with_url(&config.database_url, config.max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Applies any outstanding schema migrations.
    pub async fn run_migrations(&self) -> Result<(), SqliteDatabaseError> {
        migrate!("./src/db/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    async fn read_back_order(
        company_id: &str,
        id: i64,
        conn: &mut SqliteConnection,
    ) -> Result<Order, SqliteDatabaseError> {
        orders::fetch_order(company_id, id, conn)
            .await?
            .ok_or_else(|| SqliteDatabaseError::ReadBackError(format!("order #{id}")))
    }

    async fn read_back_payment(
        company_id: &str,
        id: i64,
        conn: &mut SqliteConnection,
    ) -> Result<Payment, SqliteDatabaseError> {
        payments::fetch_payment(company_id, id, conn)
            .await?
            .ok_or_else(|| SqliteDatabaseError::ReadBackError(format!("payment #{id}")))
    }

    /// Works out why a compare-and-swap on a pending payment changed nothing.
    async fn explain_unchanged_payment(
        company_id: &str,
        id: i64,
        conn: &mut SqliteConnection,
    ) -> Result<PaymentUpdateResult, SqliteDatabaseError> {
        let outcome = match payments::fetch_payment(company_id, id, conn).await? {
            None => PaymentUpdateResult::NotFound,
            Some(p) if p.status == PaymentStatus::Rejected => PaymentUpdateResult::AlreadyRejected,
            Some(_) => PaymentUpdateResult::AlreadyPaid,
        };
        Ok(outcome)
    }
}

impl PosDatabase for SqliteDatabase {
    type Error = SqliteDatabaseError;

    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn close(&mut self) -> Result<(), Self::Error> {
        self.pool.close().await;
        Ok(())
    }
}

impl OrderManagement for SqliteDatabase {
    type Error = SqliteDatabaseError;

    async fn insert_order(
        &self,
        order: NewOrder,
        payment: Option<PaymentDraft>,
    ) -> Result<InsertOrderResult, Self::Error> {
        let mut tx = self.pool.begin().await?;
        let Some(id) = orders::insert_order(&order, &mut tx).await? else {
            return Ok(InsertOrderResult::CodeTaken);
        };
        debug!("🗃️ Order {} has been saved in the DB with id {id}", order.order_code);
        let payment = match payment {
            Some(draft) => {
                let payment_id = payments::insert_payment(&order.company_id, id, &draft, &mut tx)
                    .await?
                    .ok_or_else(|| SqliteDatabaseError::ReadBackError(format!("initial payment for order #{id}")))?;
                debug!("🗃️ Initial {} payment #{payment_id} saved for order #{id}", draft.method);
                Some(Self::read_back_payment(&order.company_id, payment_id, &mut tx).await?)
            },
            None => None,
        };
        let order = Self::read_back_order(&order.company_id, id, &mut tx).await?;
        tx.commit().await?;
        Ok(InsertOrderResult::Inserted { order, payment })
    }

    async fn fetch_order(&self, company_id: &str, order_id: i64) -> Result<Option<Order>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order(company_id, order_id, &mut conn).await
    }

    async fn fetch_order_by_code(&self, code: &OrderCode) -> Result<Option<Order>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_by_code(code, &mut conn).await
    }

    async fn search_orders(&self, filter: OrderQueryFilter) -> Result<Page<Order>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        orders::search_orders(&filter, &mut conn).await
    }

    async fn update_order_status(
        &self,
        company_id: &str,
        order_id: i64,
        expected: OrderStatusType,
        new_status: OrderStatusType,
    ) -> Result<StatusUpdateResult, Self::Error> {
        let mut tx = self.pool.begin().await?;
        let result = orders::update_order_status(company_id, order_id, expected, new_status, &mut tx).await?;
        tx.commit().await?;
        if let StatusUpdateResult::Updated(_) = &result {
            debug!("🗃️ Order #{order_id} status changed from {expected} to {new_status}");
        }
        Ok(result)
    }
}

impl PaymentManagement for SqliteDatabase {
    type Error = SqliteDatabaseError;

    /// Takes a new payment, and in a single atomic transaction,
    /// * checks that the order exists in the company and has no settled payment,
    /// * stores the payment,
    /// * updates the order's cached payment status to match the new payment.
    async fn insert_payment(
        &self,
        company_id: &str,
        order_id: i64,
        payment: PaymentDraft,
    ) -> Result<InsertPaymentResult, Self::Error> {
        let mut tx = self.pool.begin().await?;
        if !orders::touch_order(company_id, order_id, &mut tx).await? {
            return Ok(InsertPaymentResult::OrderNotFound);
        }
        if payments::order_has_settled_payment(order_id, &mut tx).await? {
            debug!("🗃️ Order #{order_id} is already settled. Payment not recorded.");
            return Ok(InsertPaymentResult::AlreadyPaid);
        }
        let Some(payment_id) = payments::insert_payment(company_id, order_id, &payment, &mut tx).await? else {
            return Ok(InsertPaymentResult::AlreadyPaid);
        };
        orders::set_payment_status(order_id, OrderPaymentStatus::from(payment.status), &mut tx).await?;
        let payment = Self::read_back_payment(company_id, payment_id, &mut tx).await?;
        let order = Self::read_back_order(company_id, order_id, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ {} payment #{payment_id} of {} recorded for order #{order_id}", payment.method, payment.amount);
        Ok(InsertPaymentResult::Inserted { payment, order })
    }

    async fn fetch_payment(&self, company_id: &str, payment_id: i64) -> Result<Option<Payment>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        payments::fetch_payment(company_id, payment_id, &mut conn).await
    }

    async fn fetch_payments_for_order(&self, company_id: &str, order_id: i64) -> Result<Vec<Payment>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        payments::fetch_payments_for_order(company_id, order_id, &mut conn).await
    }

    async fn latest_payment_for_order(
        &self,
        company_id: &str,
        order_id: i64,
    ) -> Result<Option<Payment>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        payments::latest_payment_for_order(company_id, order_id, &mut conn).await
    }

    async fn settle_payment(
        &self,
        company_id: &str,
        payment_id: i64,
        confirmed_by: Option<&str>,
        note: Option<&str>,
    ) -> Result<PaymentUpdateResult, Self::Error> {
        let mut tx = self.pool.begin().await?;
        match payments::settle_pending(company_id, payment_id, confirmed_by, note, &mut tx).await? {
            PendingUpdate::Applied => {},
            PendingUpdate::NotPending => return Self::explain_unchanged_payment(company_id, payment_id, &mut tx).await,
            PendingUpdate::OrderAlreadySettled => {
                debug!("🗃️ Payment #{payment_id} cannot be settled. Its order already has a settled payment.");
                return Ok(PaymentUpdateResult::OrderAlreadySettled);
            },
        }
        let payment = Self::read_back_payment(company_id, payment_id, &mut tx).await?;
        orders::set_payment_status(payment.order_id, OrderPaymentStatus::Paid, &mut tx).await?;
        let order = Self::read_back_order(company_id, payment.order_id, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Payment #{payment_id} settled. Order #{} is paid.", order.id);
        Ok(PaymentUpdateResult::Updated { payment, order })
    }

    async fn reject_payment(
        &self,
        company_id: &str,
        payment_id: i64,
        note: Option<&str>,
    ) -> Result<PaymentUpdateResult, Self::Error> {
        let mut tx = self.pool.begin().await?;
        match payments::reject_pending(company_id, payment_id, note, &mut tx).await? {
            PendingUpdate::Applied => {},
            _ => return Self::explain_unchanged_payment(company_id, payment_id, &mut tx).await,
        }
        let payment = Self::read_back_payment(company_id, payment_id, &mut tx).await?;
        orders::revert_payment_status(payment.order_id, &mut tx).await?;
        let order = Self::read_back_order(company_id, payment.order_id, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Payment #{payment_id} rejected. Order #{} is now {}.", order.id, order.payment_status);
        Ok(PaymentUpdateResult::Updated { payment, order })
    }
}

impl ShiftManagement for SqliteDatabase {
    type Error = SqliteDatabaseError;

    async fn open_shift(&self, shift: NewShift) -> Result<OpenShiftResult, Self::Error> {
        let mut tx = self.pool.begin().await?;
        let Some(id) = shifts::insert_shift(&shift, &mut tx).await? else {
            debug!("🗃️ Cashier {} already has an open shift at outlet {}", shift.cashier_id, shift.outlet_id);
            return Ok(OpenShiftResult::AlreadyOpen);
        };
        let opened = shifts::fetch_shift(&shift.company_id, id, &mut tx)
            .await?
            .ok_or_else(|| SqliteDatabaseError::ReadBackError(format!("shift #{id}")))?;
        tx.commit().await?;
        debug!("🗃️ Shift #{id} opened for cashier {} at outlet {}", opened.cashier_id, opened.outlet_id);
        Ok(OpenShiftResult::Opened(opened))
    }

    async fn close_shift(
        &self,
        company_id: &str,
        cashier_id: &str,
        closing_cash: Money,
        note: Option<&str>,
    ) -> Result<Option<Shift>, Self::Error> {
        let mut tx = self.pool.begin().await?;
        let Some(id) = shifts::close_latest_open_shift(company_id, cashier_id, closing_cash, note, &mut tx).await?
        else {
            return Ok(None);
        };
        let closed = shifts::fetch_shift(company_id, id, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Shift #{id} closed for cashier {cashier_id}");
        Ok(closed)
    }

    async fn current_shift(
        &self,
        company_id: &str,
        outlet_id: &str,
        cashier_id: &str,
    ) -> Result<Option<Shift>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        shifts::fetch_open_shift(company_id, outlet_id, cashier_id, &mut conn).await
    }
}
