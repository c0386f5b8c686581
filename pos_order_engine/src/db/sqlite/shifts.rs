use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection};

use crate::{
    db::sqlite::{is_unique_violation, SqliteDatabaseError},
    db_types::{Money, NewShift, Shift},
};

const SHIFT_COLUMNS: &str =
    "id, company_id, outlet_id, cashier_id, opened_at, opening_cash, closed_at, closing_cash, note";

#[derive(Debug, Clone, FromRow)]
pub(crate) struct ShiftRow {
    id: i64,
    company_id: String,
    outlet_id: String,
    cashier_id: String,
    opened_at: DateTime<Utc>,
    opening_cash: Money,
    closed_at: Option<DateTime<Utc>>,
    closing_cash: Option<Money>,
    note: Option<String>,
}

impl From<ShiftRow> for Shift {
    fn from(row: ShiftRow) -> Self {
        Self {
            id: row.id,
            company_id: row.company_id,
            outlet_id: row.outlet_id,
            cashier_id: row.cashier_id,
            opened_at: row.opened_at,
            opening_cash: row.opening_cash,
            closed_at: row.closed_at,
            closing_cash: row.closing_cash,
            note: row.note,
        }
    }
}

/// Inserts an open shift. Returns `None` if the cashier already has an open shift at the outlet.
pub(crate) async fn insert_shift(
    shift: &NewShift,
    conn: &mut SqliteConnection,
) -> Result<Option<i64>, SqliteDatabaseError> {
    let result = sqlx::query_scalar::<_, i64>(
        r#"
            INSERT INTO shifts (company_id, outlet_id, cashier_id, opened_at, opening_cash, note)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id;
        "#,
    )
    .bind(&shift.company_id)
    .bind(&shift.outlet_id)
    .bind(&shift.cashier_id)
    .bind(shift.opened_at)
    .bind(shift.opening_cash)
    .bind(&shift.note)
    .fetch_one(conn)
    .await;
    match result {
        Ok(id) => Ok(Some(id)),
        Err(e) if is_unique_violation(&e) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub(crate) async fn fetch_shift(
    company_id: &str,
    id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Shift>, SqliteDatabaseError> {
    let sql = format!("SELECT {SHIFT_COLUMNS} FROM shifts WHERE id = $1 AND company_id = $2");
    let row = sqlx::query_as::<_, ShiftRow>(&sql).bind(id).bind(company_id).fetch_optional(conn).await?;
    Ok(row.map(Shift::from))
}

pub(crate) async fn fetch_open_shift(
    company_id: &str,
    outlet_id: &str,
    cashier_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Shift>, SqliteDatabaseError> {
    let sql = format!(
        "SELECT {SHIFT_COLUMNS} FROM shifts WHERE company_id = $1 AND outlet_id = $2 AND cashier_id = $3 AND closed_at \
         IS NULL LIMIT 1"
    );
    let row = sqlx::query_as::<_, ShiftRow>(&sql)
        .bind(company_id)
        .bind(outlet_id)
        .bind(cashier_id)
        .fetch_optional(conn)
        .await?;
    Ok(row.map(Shift::from))
}

/// Closes the cashier's most recently opened shift anywhere in the company in a single conditional update. A note,
/// if given, is appended to the existing note on a new line. Returns the id of the closed shift, or `None` if the
/// cashier had no open shift.
pub(crate) async fn close_latest_open_shift(
    company_id: &str,
    cashier_id: &str,
    closing_cash: Money,
    note: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<Option<i64>, SqliteDatabaseError> {
    let id = sqlx::query_scalar::<_, i64>(
        r#"
            UPDATE shifts SET
                closed_at = $1,
                closing_cash = $2,
                note = CASE
                    WHEN $3 IS NULL THEN note
                    WHEN note IS NULL OR note = '' THEN $3
                    ELSE note || char(10) || $3
                END
            WHERE closed_at IS NULL AND id = (
                SELECT id FROM shifts
                WHERE company_id = $4 AND cashier_id = $5 AND closed_at IS NULL
                ORDER BY opened_at DESC, id DESC
                LIMIT 1
            )
            RETURNING id;
        "#,
    )
    .bind(Utc::now())
    .bind(closing_cash)
    .bind(note)
    .bind(company_id)
    .bind(cashier_id)
    .fetch_optional(conn)
    .await?;
    Ok(id)
}
