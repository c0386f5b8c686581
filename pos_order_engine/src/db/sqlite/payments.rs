use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection};

use crate::{
    db::sqlite::{is_unique_violation, SqliteDatabaseError},
    db_types::{Money, Payment, PaymentDraft, PaymentStatus},
};

const PAYMENT_COLUMNS: &str = "id, order_id, company_id, outlet_id, method, amount, status, proof_url, note, \
                               created_by, confirmed_by, confirmed_at, created_at, updated_at";

#[derive(Debug, Clone, FromRow)]
pub(crate) struct PaymentRow {
    id: i64,
    order_id: i64,
    company_id: String,
    outlet_id: String,
    method: String,
    amount: Money,
    status: String,
    proof_url: Option<String>,
    note: Option<String>,
    created_by: Option<String>,
    confirmed_by: Option<String>,
    confirmed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = SqliteDatabaseError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let invalid =
            |e: &dyn std::fmt::Display| SqliteDatabaseError::ConversionError("payment", format!("#{id}: {e}"));
        let method = row.method.parse().map_err(|e| invalid(&e))?;
        let status = row.status.parse().map_err(|e| invalid(&e))?;
        Ok(Payment {
            id: row.id,
            order_id: row.order_id,
            company_id: row.company_id,
            outlet_id: row.outlet_id,
            method,
            amount: row.amount,
            status,
            proof_url: row.proof_url,
            note: row.note,
            created_by: row.created_by,
            confirmed_by: row.confirmed_by,
            confirmed_at: row.confirmed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Inserts a payment against an order. The order's outlet is copied onto the payment row.
///
/// Returns `None` if the payment is settled and the order already has a settled payment.
pub(crate) async fn insert_payment(
    company_id: &str,
    order_id: i64,
    payment: &PaymentDraft,
    conn: &mut SqliteConnection,
) -> Result<Option<i64>, SqliteDatabaseError> {
    let confirmed_at = (payment.status == PaymentStatus::Paid).then_some(payment.created_at);
    let result = sqlx::query_scalar::<_, i64>(
        r#"
            INSERT INTO payments (
                order_id,
                company_id,
                outlet_id,
                method,
                amount,
                status,
                proof_url,
                note,
                created_by,
                confirmed_by,
                confirmed_at,
                created_at,
                updated_at
            )
            SELECT id, company_id, outlet_id, $1, $2, $3, $4, $5, $6, $7, $8, $9, $9
            FROM orders WHERE id = $10 AND company_id = $11
            RETURNING id;
        "#,
    )
    .bind(payment.method.to_string())
    .bind(payment.amount)
    .bind(payment.status.to_string())
    .bind(&payment.proof_url)
    .bind(&payment.note)
    .bind(&payment.created_by)
    .bind(payment.confirmed_by())
    .bind(confirmed_at)
    .bind(payment.created_at)
    .bind(order_id)
    .bind(company_id)
    .fetch_optional(conn)
    .await;
    match result {
        Ok(Some(id)) => Ok(Some(id)),
        Ok(None) => {
            Err(SqliteDatabaseError::ReadBackError(format!("order #{order_id} vanished during payment insert")))
        },
        Err(e) if is_unique_violation(&e) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub(crate) async fn fetch_payment(
    company_id: &str,
    id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, SqliteDatabaseError> {
    let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1 AND company_id = $2");
    let row = sqlx::query_as::<_, PaymentRow>(&sql).bind(id).bind(company_id).fetch_optional(conn).await?;
    row.map(Payment::try_from).transpose()
}

/// All payments for the order, newest first.
pub(crate) async fn fetch_payments_for_order(
    company_id: &str,
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Payment>, SqliteDatabaseError> {
    let sql = format!(
        "SELECT {PAYMENT_COLUMNS} FROM payments WHERE order_id = $1 AND company_id = $2 ORDER BY created_at DESC, id \
         DESC"
    );
    let rows = sqlx::query_as::<_, PaymentRow>(&sql).bind(order_id).bind(company_id).fetch_all(conn).await?;
    rows.into_iter().map(Payment::try_from).collect()
}

pub(crate) async fn latest_payment_for_order(
    company_id: &str,
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, SqliteDatabaseError> {
    let sql = format!(
        "SELECT {PAYMENT_COLUMNS} FROM payments WHERE order_id = $1 AND company_id = $2 ORDER BY created_at DESC, id \
         DESC LIMIT 1"
    );
    let row = sqlx::query_as::<_, PaymentRow>(&sql).bind(order_id).bind(company_id).fetch_optional(conn).await?;
    row.map(Payment::try_from).transpose()
}

pub(crate) async fn order_has_settled_payment(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<bool, SqliteDatabaseError> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM payments WHERE order_id = $1 AND status = 'PAID')")
            .bind(order_id)
            .fetch_one(conn)
            .await?;
    Ok(exists)
}

pub(crate) enum PendingUpdate {
    /// The payment moved out of `PENDING`.
    Applied,
    /// The payment is not `PENDING` (or does not exist). Nothing changed.
    NotPending,
    /// Settling would give the order a second settled payment. Nothing changed.
    OrderAlreadySettled,
}

/// Compare-and-swap from `PENDING` to `PAID`.
pub(crate) async fn settle_pending(
    company_id: &str,
    id: i64,
    confirmed_by: Option<&str>,
    note: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<PendingUpdate, SqliteDatabaseError> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
            UPDATE payments SET
                status = 'PAID',
                confirmed_by = $1,
                confirmed_at = $2,
                note = COALESCE($3, note),
                updated_at = $2
            WHERE id = $4 AND company_id = $5 AND status = 'PENDING'
        "#,
    )
    .bind(confirmed_by)
    .bind(now)
    .bind(note)
    .bind(id)
    .bind(company_id)
    .execute(conn)
    .await;
    match result {
        Ok(r) if r.rows_affected() > 0 => Ok(PendingUpdate::Applied),
        Ok(_) => Ok(PendingUpdate::NotPending),
        Err(e) if is_unique_violation(&e) => Ok(PendingUpdate::OrderAlreadySettled),
        Err(e) => Err(e.into()),
    }
}

/// Compare-and-swap from `PENDING` to `REJECTED`.
pub(crate) async fn reject_pending(
    company_id: &str,
    id: i64,
    note: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<PendingUpdate, SqliteDatabaseError> {
    let result = sqlx::query(
        r#"
            UPDATE payments SET
                status = 'REJECTED',
                note = COALESCE($1, note),
                updated_at = $2
            WHERE id = $3 AND company_id = $4 AND status = 'PENDING'
        "#,
    )
    .bind(note)
    .bind(Utc::now())
    .bind(id)
    .bind(company_id)
    .execute(conn)
    .await?;
    if result.rows_affected() > 0 {
        Ok(PendingUpdate::Applied)
    } else {
        Ok(PendingUpdate::NotPending)
    }
}
