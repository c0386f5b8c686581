use chrono::{DateTime, Utc};
use log::*;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db::{
        sqlite::{is_unique_violation, SqliteDatabaseError},
        traits::{OrderQueryFilter, Page, StatusUpdateResult},
    },
    db_types::{Customer, Money, NewOrder, Order, OrderCode, OrderItem, OrderPaymentStatus, OrderStatusType},
};

const ORDER_COLUMNS: &str = "id, order_code, company_id, outlet_id, table_id, session_id, channel, customer, items, \
                             subtotal, discount, tax, service, total, status, payment_status, created_by, note, \
                             created_at, updated_at";

#[derive(Debug, Clone, FromRow)]
pub(crate) struct OrderRow {
    id: i64,
    order_code: String,
    company_id: String,
    outlet_id: String,
    table_id: Option<String>,
    session_id: Option<String>,
    channel: String,
    customer: String,
    items: String,
    subtotal: Money,
    discount: Money,
    tax: Money,
    service: Money,
    total: Money,
    status: String,
    payment_status: String,
    created_by: Option<String>,
    note: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = SqliteDatabaseError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let invalid = |e: &dyn std::fmt::Display| SqliteDatabaseError::ConversionError("order", format!("#{id}: {e}"));
        let order_code = row.order_code.parse::<OrderCode>().map_err(|e| invalid(&e))?;
        let channel = row.channel.parse().map_err(|e| invalid(&e))?;
        let status = row.status.parse().map_err(|e| invalid(&e))?;
        let payment_status = row.payment_status.parse().map_err(|e| invalid(&e))?;
        let customer = serde_json::from_str::<Customer>(&row.customer).map_err(|e| invalid(&e))?;
        let items = serde_json::from_str::<Vec<OrderItem>>(&row.items).map_err(|e| invalid(&e))?;
        Ok(Order {
            id: row.id,
            order_code,
            company_id: row.company_id,
            outlet_id: row.outlet_id,
            table_id: row.table_id,
            session_id: row.session_id,
            channel,
            customer,
            items,
            subtotal: row.subtotal,
            discount: row.discount,
            tax: row.tax,
            service: row.service,
            total: row.total,
            status,
            payment_status,
            created_by: row.created_by,
            note: row.note,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Inserts a new order into the database using the given connection. This is not atomic. You can embed this call
/// inside a transaction if you need to ensure atomicity, and pass `&mut tx` as the connection argument.
///
/// Returns `None` if the order code is already taken.
pub(crate) async fn insert_order(
    order: &NewOrder,
    conn: &mut SqliteConnection,
) -> Result<Option<i64>, SqliteDatabaseError> {
    let customer = serde_json::to_string(&order.customer)?;
    let items = serde_json::to_string(&order.items)?;
    let result = sqlx::query_scalar::<_, i64>(
        r#"
            INSERT INTO orders (
                order_code,
                company_id,
                outlet_id,
                table_id,
                session_id,
                channel,
                customer,
                items,
                subtotal,
                discount,
                tax,
                service,
                total,
                status,
                payment_status,
                created_by,
                note,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $18)
            RETURNING id;
        "#,
    )
    .bind(order.order_code.as_str())
    .bind(&order.company_id)
    .bind(&order.outlet_id)
    .bind(&order.table_id)
    .bind(&order.session_id)
    .bind(order.channel.to_string())
    .bind(customer)
    .bind(items)
    .bind(order.subtotal)
    .bind(order.discount)
    .bind(order.tax)
    .bind(order.service)
    .bind(order.total)
    .bind(OrderStatusType::New.to_string())
    .bind(order.payment_status.to_string())
    .bind(&order.created_by)
    .bind(&order.note)
    .bind(order.created_at)
    .fetch_one(conn)
    .await;
    match result {
        Ok(id) => Ok(Some(id)),
        Err(e) if is_unique_violation(&e) => {
            debug!("🗃️ Order code {} is already taken", order.order_code);
            Ok(None)
        },
        Err(e) => Err(e.into()),
    }
}

pub(crate) async fn fetch_order(
    company_id: &str,
    id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, SqliteDatabaseError> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 AND company_id = $2");
    let row = sqlx::query_as::<_, OrderRow>(&sql).bind(id).bind(company_id).fetch_optional(conn).await?;
    row.map(Order::try_from).transpose()
}

pub(crate) async fn fetch_order_by_code(
    code: &OrderCode,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, SqliteDatabaseError> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_code = $1");
    let row = sqlx::query_as::<_, OrderRow>(&sql).bind(code.as_str()).fetch_optional(conn).await?;
    row.map(Order::try_from).transpose()
}

fn push_filter<'a>(builder: &mut QueryBuilder<'a, Sqlite>, filter: &'a OrderQueryFilter) {
    builder.push(" WHERE company_id = ");
    builder.push_bind(filter.company_id.as_str());
    if let Some(outlet_id) = &filter.outlet_id {
        builder.push(" AND outlet_id = ");
        builder.push_bind(outlet_id.as_str());
    }
    if !filter.statuses.is_empty() {
        builder.push(" AND status IN (");
        let mut statuses = builder.separated(", ");
        for status in &filter.statuses {
            statuses.push_bind(status.to_string());
        }
        statuses.push_unseparated(")");
    }
}

/// Fetches orders according to the criteria in the `OrderQueryFilter`, newest first.
pub(crate) async fn search_orders(
    filter: &OrderQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<Page<Order>, SqliteDatabaseError> {
    let mut count = QueryBuilder::new("SELECT COUNT(*) FROM orders");
    push_filter(&mut count, filter);
    let total: i64 = count.build_query_scalar().fetch_one(&mut *conn).await?;

    let mut builder = QueryBuilder::new(format!("SELECT {ORDER_COLUMNS} FROM orders"));
    push_filter(&mut builder, filter);
    builder.push(" ORDER BY created_at DESC, id DESC LIMIT ");
    builder.push_bind(i64::from(filter.page_size));
    builder.push(" OFFSET ");
    builder.push_bind(filter.offset());
    trace!("🗃️ Executing query: {}", builder.sql());
    let rows = builder.build_query_as::<OrderRow>().fetch_all(conn).await?;
    let items = rows.into_iter().map(Order::try_from).collect::<Result<Vec<_>, _>>()?;
    trace!("🗃️ {} of {total} matching orders fetched", items.len());
    Ok(Page { items, total: u64::try_from(total).unwrap_or_default(), page: filter.page, page_size: filter.page_size })
}

/// Compare-and-swap on the order status. Only rows whose status is still `expected` are changed.
pub(crate) async fn update_order_status(
    company_id: &str,
    id: i64,
    expected: OrderStatusType,
    new_status: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<StatusUpdateResult, SqliteDatabaseError> {
    let result = sqlx::query(
        "UPDATE orders SET status = $1, updated_at = $2 WHERE id = $3 AND company_id = $4 AND status = $5",
    )
    .bind(new_status.to_string())
    .bind(Utc::now())
    .bind(id)
    .bind(company_id)
    .bind(expected.to_string())
    .execute(&mut *conn)
    .await?;
    let order = fetch_order(company_id, id, conn).await?;
    let outcome = match (result.rows_affected(), order) {
        (_, None) => StatusUpdateResult::NotFound,
        (0, Some(order)) => StatusUpdateResult::Stale(order.status),
        (_, Some(order)) => StatusUpdateResult::Updated(order),
    };
    Ok(outcome)
}

/// Bumps `updated_at` on the order. Used as the first statement of a write transaction so that the transaction holds
/// the write lock before anything is read. Returns `false` if the order does not exist in the company.
pub(crate) async fn touch_order(
    company_id: &str,
    id: i64,
    conn: &mut SqliteConnection,
) -> Result<bool, SqliteDatabaseError> {
    let result = sqlx::query("UPDATE orders SET updated_at = $1 WHERE id = $2 AND company_id = $3")
        .bind(Utc::now())
        .bind(id)
        .bind(company_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn set_payment_status(
    id: i64,
    status: OrderPaymentStatus,
    conn: &mut SqliteConnection,
) -> Result<(), SqliteDatabaseError> {
    sqlx::query("UPDATE orders SET payment_status = $1, updated_at = $2 WHERE id = $3")
        .bind(status.to_string())
        .bind(Utc::now())
        .bind(id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Recomputes the cached payment status after a payment was rejected: `PAID` if some other payment settled the
/// order, otherwise `UNPAID`.
pub(crate) async fn revert_payment_status(id: i64, conn: &mut SqliteConnection) -> Result<(), SqliteDatabaseError> {
    sqlx::query(
        r#"
            UPDATE orders SET
                payment_status = CASE
                    WHEN EXISTS (SELECT 1 FROM payments WHERE order_id = orders.id AND status = 'PAID') THEN 'PAID'
                    ELSE 'UNPAID'
                END,
                updated_at = $1
            WHERE id = $2
        "#,
    )
    .bind(Utc::now())
    .bind(id)
    .execute(conn)
    .await?;
    Ok(())
}
