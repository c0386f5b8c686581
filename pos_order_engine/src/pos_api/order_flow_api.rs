use std::fmt::Debug;

use chrono::Utc;
use log::*;

use crate::{
    catalog::{MenuCatalog, Outlet, OutletDirectory},
    config::EngineConfig,
    db::traits::{InsertOrderResult, OrderManagement, OrderQueryFilter, Page, StatusUpdateResult},
    db_types::{Money, NewOrder, Order, OrderCode, OrderPaymentStatus, OrderStatusType, PaymentDraft, PaymentStatus},
    pos_api::{
        errors::{db_error, PosApiError},
        notifier::Notifier,
        order_objects::{ListOrdersRequest, NewOrderRequest, NewOrderResult, PaymentRequest, RequestContext},
    },
    pricing::price_order,
};

/// How many times a status update re-reads the order after losing a race with another writer.
const STATUS_UPDATE_ATTEMPTS: usize = 3;

/// `OrderFlowApi` is the primary API for placing orders and driving them through the kitchen/service lifecycle.
///
/// Orders are priced against the live catalog once, at creation, and never edited afterwards. Every successful
/// mutation is followed by a fan-out publish, the lifecycle hooks and an audit entry, none of which can fail the
/// call.
pub struct OrderFlowApi<B, C> {
    db: B,
    catalog: C,
    notifier: Notifier,
    config: EngineConfig,
}

impl<B, C> Debug for OrderFlowApi<B, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi (strict transitions: {})", self.config.strict_transitions)
    }
}

impl<B, C> OrderFlowApi<B, C> {
    pub fn new(db: B, catalog: C, notifier: Notifier, config: EngineConfig) -> Self {
        Self { db, catalog, notifier, config }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }
}

impl<B, C> OrderFlowApi<B, C>
where
    B: OrderManagement,
    C: MenuCatalog + OutletDirectory,
{
    /// Prices and places a new order.
    ///
    /// The outlet must exist, be active and belong to the caller's company. If the request carries a payment, it is
    /// recorded in the same transaction as the order; a cash payment with `mark_as_paid` settles the order on the
    /// spot, with the creator recorded as the confirming user.
    ///
    /// Order codes are random. A collision is retried with a fresh code up to the configured number of times.
    pub async fn create_order(
        &self,
        ctx: &RequestContext,
        request: NewOrderRequest,
    ) -> Result<NewOrderResult, PosApiError> {
        if request.discount.is_negative() {
            return Err(PosApiError::InvalidRequest("The discount cannot be negative".into()));
        }
        let outlet = self.active_outlet(ctx, &request.outlet_id).await?;
        if let Some(payment) = &request.payment {
            if !outlet.settings.accepts(payment.method) {
                return Err(PosApiError::PaymentMethodNotEnabled(payment.method));
            }
        }
        let priced = price_order(&self.catalog, &request.items, request.discount, &outlet.settings).await?;
        let totals = priced.totals;
        if totals.discount > totals.subtotal {
            return Err(PosApiError::InvalidRequest(format!(
                "The discount ({}) exceeds the order subtotal ({})",
                totals.discount, totals.subtotal
            )));
        }
        let now = Utc::now();
        let payment = request
            .payment
            .as_ref()
            .map(|p| payment_draft(ctx, p, totals.total, now))
            .transpose()?;
        let payment_status =
            payment.as_ref().map(|p| OrderPaymentStatus::from(p.status)).unwrap_or(OrderPaymentStatus::Unpaid);
        let order = NewOrder {
            order_code: OrderCode::random(&mut rand::thread_rng()),
            company_id: ctx.company_id.clone(),
            outlet_id: outlet.id.clone(),
            table_id: request.table_id,
            session_id: request.session_id,
            channel: request.channel,
            customer: request.customer,
            items: priced.items,
            subtotal: totals.subtotal,
            discount: totals.discount,
            tax: totals.tax,
            service: totals.service,
            total: totals.total,
            payment_status,
            created_by: ctx.actor_id.clone(),
            note: request.note,
            created_at: now,
        };
        let retries = self.config.order_code_retries.max(1);
        for attempt in 1..=retries {
            let candidate = if attempt == 1 {
                order.clone()
            } else {
                order.clone().with_code(OrderCode::random(&mut rand::thread_rng()))
            };
            let code = candidate.order_code.clone();
            match self.db.insert_order(candidate, payment.clone()).await.map_err(db_error)? {
                InsertOrderResult::Inserted { order, payment } => {
                    info!(
                        "🔄️ Order {} (#{}) placed at outlet {} for {}",
                        order.order_code, order.id, order.outlet_id, order.total
                    );
                    self.notifier.order_created(ctx, &order);
                    if let Some(payment) = &payment {
                        self.notifier.payment_created(ctx, payment, &order);
                    }
                    return Ok(NewOrderResult { order, payment });
                },
                InsertOrderResult::CodeTaken => {
                    warn!("🔄️ Order code {code} collided on attempt {attempt} of {retries}. Drawing a new one.");
                },
            }
        }
        error!("🔄️ Gave up generating an order code after {retries} attempts");
        Err(PosApiError::CodeGenerationExhausted(retries))
    }

    async fn active_outlet(&self, ctx: &RequestContext, outlet_id: &str) -> Result<Outlet, PosApiError> {
        let outlet = OutletDirectory::fetch_outlet(&self.catalog, outlet_id)
            .await
            .map_err(|e| PosApiError::CatalogError(e.to_string()))?;
        match outlet {
            Some(outlet) if outlet.is_active && outlet.company_id == ctx.company_id => Ok(outlet),
            _ => {
                debug!("🔄️ Outlet {outlet_id} is missing, inactive or belongs to another company");
                Err(PosApiError::OutletNotFound(outlet_id.to_string()))
            },
        }
    }

    pub async fn get_order_by_id(&self, ctx: &RequestContext, order_id: i64) -> Result<Order, PosApiError> {
        self.db.fetch_order(&ctx.company_id, order_id).await.map_err(db_error)?.ok_or(PosApiError::OrderNotFound)
    }

    /// Looks up an order by its public code, for guest order tracking. Malformed and unknown codes get the same
    /// `OrderNotFound` response.
    pub async fn get_order_by_code(&self, code: &str) -> Result<Order, PosApiError> {
        let Ok(code) = code.parse::<OrderCode>() else {
            debug!("🔄️ '{code}' is not a valid order code");
            return Err(PosApiError::OrderNotFound);
        };
        self.db.fetch_order_by_code(&code).await.map_err(db_error)?.ok_or(PosApiError::OrderNotFound)
    }

    /// Lists the outlet's orders, newest first.
    pub async fn list_orders_by_outlet(
        &self,
        ctx: &RequestContext,
        outlet_id: &str,
        request: ListOrdersRequest,
    ) -> Result<Page<Order>, PosApiError> {
        let filter = OrderQueryFilter::for_outlet(ctx.company_id.as_str(), outlet_id);
        self.list_orders(filter, request).await
    }

    /// Lists orders across every outlet of the caller's company, newest first.
    pub async fn list_orders_by_company(
        &self,
        ctx: &RequestContext,
        request: ListOrdersRequest,
    ) -> Result<Page<Order>, PosApiError> {
        let filter = OrderQueryFilter::for_company(ctx.company_id.as_str());
        self.list_orders(filter, request).await
    }

    async fn list_orders(
        &self,
        filter: OrderQueryFilter,
        request: ListOrdersRequest,
    ) -> Result<Page<Order>, PosApiError> {
        let max_page_size = self.config.max_page_size.max(1);
        let page_size = request.page_size.unwrap_or(self.config.default_page_size).clamp(1, max_page_size);
        let page = request.page.unwrap_or(1).max(1);
        let filter = filter.with_statuses(&request.statuses).with_page(page, page_size);
        self.db.search_orders(filter).await.map_err(db_error)
    }

    /// Moves the order to `new_status`.
    ///
    /// By default any status may be set at any time, including on closed or cancelled orders. With strict
    /// transitions enabled, only forward moves (or cancellation of a live order) are accepted. Setting the status the
    /// order already has changes nothing and notifies no one.
    ///
    /// The write is a compare-and-swap on the status that was read, so concurrent updates never overwrite each other
    /// silently.
    pub async fn update_order_status(
        &self,
        ctx: &RequestContext,
        order_id: i64,
        new_status: OrderStatusType,
    ) -> Result<Order, PosApiError> {
        for _ in 0..STATUS_UPDATE_ATTEMPTS {
            let order = self.get_order_by_id(ctx, order_id).await?;
            let old_status = order.status;
            if old_status == new_status {
                debug!("🔄️ Order #{order_id} is already {new_status}. Nothing to do.");
                return Ok(order);
            }
            if self.config.strict_transitions && !old_status.is_forward_transition(new_status) {
                return Err(PosApiError::InvalidTransition { from: old_status, to: new_status });
            }
            if old_status.is_terminal() {
                warn!("🔄️ Order #{order_id} is {old_status}, but is being moved to {new_status}");
            }
            let result = self
                .db
                .update_order_status(&ctx.company_id, order_id, old_status, new_status)
                .await
                .map_err(db_error)?;
            match result {
                StatusUpdateResult::Updated(order) => {
                    info!("🔄️ Order #{order_id} moved from {old_status} to {new_status}");
                    self.notifier.order_status_changed(ctx, &order, old_status);
                    return Ok(order);
                },
                StatusUpdateResult::NotFound => return Err(PosApiError::OrderNotFound),
                StatusUpdateResult::Stale(current) => {
                    debug!("🔄️ Order #{order_id} changed to {current} underneath us. Retrying.");
                },
            }
        }
        warn!("🔄️ Order #{order_id} kept changing during a status update. Giving up.");
        Err(PosApiError::ConcurrentModification)
    }
}

/// Builds the stored form of a payment request. Shared with the payment ledger.
pub(crate) fn payment_draft(
    ctx: &RequestContext,
    request: &PaymentRequest,
    order_total: Money,
    now: chrono::DateTime<Utc>,
) -> Result<PaymentDraft, PosApiError> {
    let amount = request.amount.unwrap_or(order_total);
    if amount <= Money::ZERO {
        return Err(PosApiError::InvalidRequest(format!("Payment amount must be positive, got {amount}")));
    }
    Ok(PaymentDraft {
        method: request.method,
        amount,
        status: PaymentStatus::initial(request.method, request.mark_as_paid),
        proof_url: request.proof_url.clone(),
        note: request.note.clone(),
        created_by: ctx.actor_id.clone(),
        created_at: now,
    })
}

#[cfg(test)]
mod test {
    use std::{
        convert::Infallible,
        sync::atomic::{AtomicUsize, Ordering},
    };

    use super::*;
    use crate::{
        catalog::{InMemoryCatalog, MenuItem, Outlet, OutletSettings},
        db_types::{Customer, OrderChannel},
        pos_api::errors::ErrorKind,
        pricing::ItemRequest,
    };

    /// An order store under heavy contention: every order code is already taken, and every status update finds that
    /// someone else got there first.
    #[derive(Default)]
    struct ContendedStore {
        inserts: AtomicUsize,
        updates: AtomicUsize,
    }

    impl OrderManagement for ContendedStore {
        type Error = Infallible;

        async fn insert_order(
            &self,
            _order: NewOrder,
            _payment: Option<PaymentDraft>,
        ) -> Result<InsertOrderResult, Self::Error> {
            self.inserts.fetch_add(1, Ordering::SeqCst);
            Ok(InsertOrderResult::CodeTaken)
        }

        async fn fetch_order(&self, company_id: &str, order_id: i64) -> Result<Option<Order>, Self::Error> {
            let now = Utc::now();
            Ok(Some(Order {
                id: order_id,
                order_code: "K7Q2MX".parse().unwrap(),
                company_id: company_id.to_string(),
                outlet_id: "central".into(),
                table_id: None,
                session_id: None,
                channel: OrderChannel::Pos,
                customer: Customer::default(),
                items: vec![],
                subtotal: Money::from(5_000),
                discount: Money::ZERO,
                tax: Money::ZERO,
                service: Money::ZERO,
                total: Money::from(5_000),
                status: OrderStatusType::New,
                payment_status: OrderPaymentStatus::Unpaid,
                created_by: None,
                note: None,
                created_at: now,
                updated_at: now,
            }))
        }

        async fn fetch_order_by_code(&self, _code: &OrderCode) -> Result<Option<Order>, Self::Error> {
            Ok(None)
        }

        async fn search_orders(&self, _filter: OrderQueryFilter) -> Result<Page<Order>, Self::Error> {
            unimplemented!("listing is not exercised here")
        }

        async fn update_order_status(
            &self,
            _company_id: &str,
            _order_id: i64,
            _expected: OrderStatusType,
            _new_status: OrderStatusType,
        ) -> Result<StatusUpdateResult, Self::Error> {
            self.updates.fetch_add(1, Ordering::SeqCst);
            Ok(StatusUpdateResult::Stale(OrderStatusType::InProgress))
        }
    }

    fn api(config: EngineConfig) -> OrderFlowApi<ContendedStore, InMemoryCatalog> {
        let catalog = InMemoryCatalog::new();
        catalog.upsert_menu_item(MenuItem::new("es-teh", "Es Teh", Money::from(5_000)));
        catalog.upsert_outlet(Outlet {
            id: "central".into(),
            company_id: "acme".into(),
            is_active: true,
            settings: OutletSettings::default(),
        });
        OrderFlowApi::new(ContendedStore::default(), catalog, Notifier::silent(), config)
    }

    #[tokio::test]
    async fn order_codes_run_out_after_the_configured_retries() {
        let config = EngineConfig { order_code_retries: 4, ..EngineConfig::default() };
        let api = api(config);
        let request = NewOrderRequest::new("central", OrderChannel::Pos).with_item(ItemRequest::new("es-teh", 1));
        let err = api.create_order(&RequestContext::staff("acme", "cashier-ana"), request).await.unwrap_err();
        assert_eq!(err, PosApiError::CodeGenerationExhausted(4));
        assert_eq!(err.kind(), ErrorKind::Exhausted);
        assert_eq!(api.db().inserts.load(Ordering::SeqCst), 4);
        assert_eq!(api.db().updates.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn status_updates_give_up_when_the_order_keeps_changing() {
        let api = api(EngineConfig::default());
        let ctx = RequestContext::staff("acme", "manager-budi");
        let err = api.update_order_status(&ctx, 7, OrderStatusType::Accepted).await.unwrap_err();
        assert_eq!(err, PosApiError::ConcurrentModification);
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(api.db().updates.load(Ordering::SeqCst), STATUS_UPDATE_ATTEMPTS);
    }
}
