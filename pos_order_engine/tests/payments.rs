use std::time::Duration;

use pos_common::Money;
use pos_order_engine::{
    audit::AuditAction,
    db_types::{Order, OrderChannel, OrderPaymentStatus, PaymentMethod, PaymentStatus},
    order_objects::{NewOrderRequest, PaymentRequest},
    pricing::ItemRequest,
    ErrorKind,
    PosApiError,
};

use crate::support::fixtures::*;

mod support;

async fn place_order(system: &TestSystem, payment: Option<PaymentRequest>) -> (Order, Option<i64>) {
    let mut request = NewOrderRequest::new(OUTLET, OrderChannel::Pos)
        .with_item(ItemRequest::new("nasi-goreng", 2).with_variant("large").with_addon("egg"));
    if let Some(payment) = payment {
        request = request.with_payment(payment);
    }
    let result = system.engine.orders().create_order(&staff(), request).await.expect("Error creating order");
    (result.order, result.payment.map(|p| p.id))
}

#[tokio::test]
async fn cash_marked_as_paid_settles_immediately() {
    let system = TestSystem::new().await;
    let request = NewOrderRequest::new(OUTLET, OrderChannel::Pos)
        .with_item(ItemRequest::new("es-teh", 2))
        .with_payment(PaymentRequest::cash_paid());
    let result = system.engine.orders().create_order(&staff(), request).await.unwrap();
    let payment = result.payment.expect("Initial payment missing");
    assert_eq!(result.order.payment_status, OrderPaymentStatus::Paid);
    assert_eq!(payment.status, PaymentStatus::Paid);
    assert_eq!(payment.method, PaymentMethod::Cash);
    assert_eq!(payment.amount, result.order.total);
    assert_eq!(payment.created_by.as_deref(), Some(CASHIER));
    assert_eq!(payment.confirmed_by.as_deref(), Some(CASHIER));
    assert!(payment.confirmed_at.is_some());
    assert_eq!(payment.outlet_id, OUTLET);
    system.tear_down().await;
}

#[tokio::test]
async fn mark_as_paid_is_ignored_for_transfers() {
    let system = TestSystem::new().await;
    let request = PaymentRequest::new(PaymentMethod::Transfer).mark_as_paid();
    let (order, payment_id) = place_order(&system, Some(request)).await;
    assert_eq!(order.payment_status, OrderPaymentStatus::Pending);
    let payment = system.engine.payments().get_payment(&staff(), payment_id.unwrap()).await.unwrap();
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert!(payment.confirmed_by.is_none());
    system.tear_down().await;
}

#[tokio::test]
async fn confirming_a_transfer_pays_the_order() {
    let system = TestSystem::new().await;
    let payments = system.engine.payments();
    let (order, _) = place_order(&system, None).await;
    let request = PaymentRequest::new(PaymentMethod::Transfer).with_proof_url("https://cdn.example/receipt-1.jpg");
    let payment = payments.create_payment(&staff(), order.id, request).await.unwrap();
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert_eq!(payment.amount, Money::from(64_000));
    let order = system.engine.orders().get_order_by_id(&staff(), order.id).await.unwrap();
    assert_eq!(order.payment_status, OrderPaymentStatus::Pending);

    let confirmed = payments.confirm_payment(&manager(), payment.id, Some("Checked bank app")).await.unwrap();
    assert_eq!(confirmed.status, PaymentStatus::Paid);
    assert_eq!(confirmed.confirmed_by.as_deref(), Some(MANAGER));
    assert_eq!(confirmed.note.as_deref(), Some("Checked bank app"));
    let order = system.engine.orders().get_order_by_id(&staff(), order.id).await.unwrap();
    assert_eq!(order.payment_status, OrderPaymentStatus::Paid);

    let err = payments.confirm_payment(&manager(), payment.id, None).await.unwrap_err();
    assert_eq!(err, PosApiError::AlreadyConfirmed);
    assert_eq!(err.kind(), ErrorKind::Conflict);
    let err = payments.reject_payment(&manager(), payment.id, None).await.unwrap_err();
    assert_eq!(err, PosApiError::AlreadyConfirmed);
    system.tear_down().await;
}

#[tokio::test]
async fn rejecting_a_payment_reverts_the_order_to_unpaid() {
    let system = TestSystem::new().await;
    let payments = system.engine.payments();
    let (order, payment_id) = place_order(&system, Some(PaymentRequest::new(PaymentMethod::Qr))).await;
    assert_eq!(order.payment_status, OrderPaymentStatus::Pending);
    let rejected = payments.reject_payment(&manager(), payment_id.unwrap(), Some("Blurry screenshot")).await.unwrap();
    assert_eq!(rejected.status, PaymentStatus::Rejected);
    let order = system.engine.orders().get_order_by_id(&staff(), order.id).await.unwrap();
    assert_eq!(order.payment_status, OrderPaymentStatus::Unpaid);

    let err = payments.confirm_payment(&manager(), rejected.id, None).await.unwrap_err();
    assert_eq!(err, PosApiError::PaymentAlreadyRejected);
    let err = payments.reject_payment(&manager(), rejected.id, None).await.unwrap_err();
    assert_eq!(err, PosApiError::PaymentAlreadyRejected);
    system.tear_down().await;
}

#[tokio::test]
async fn a_paid_order_takes_no_further_payments() {
    let system = TestSystem::new().await;
    let payments = system.engine.payments();
    let (order, _) = place_order(&system, Some(PaymentRequest::cash_paid())).await;
    let err = payments.create_payment(&staff(), order.id, PaymentRequest::new(PaymentMethod::Transfer)).await;
    assert_eq!(err.unwrap_err(), PosApiError::AlreadyPaid);
    let history = payments.find_payments_by_order(&staff(), order.id).await.unwrap();
    assert_eq!(history.len(), 1);
    system.tear_down().await;
}

#[tokio::test]
async fn only_one_payment_can_settle_an_order() {
    let system = TestSystem::new().await;
    let payments = system.engine.payments();
    let (order, first) = place_order(&system, Some(PaymentRequest::new(PaymentMethod::Transfer))).await;
    let second = payments.create_payment(&staff(), order.id, PaymentRequest::new(PaymentMethod::Qr)).await.unwrap();
    payments.confirm_payment(&manager(), second.id, None).await.unwrap();
    let err = payments.confirm_payment(&manager(), first.unwrap(), None).await.unwrap_err();
    assert_eq!(err, PosApiError::AlreadyPaid);
    let first = payments.get_payment(&staff(), first.unwrap()).await.unwrap();
    assert_eq!(first.status, PaymentStatus::Pending);

    // Rejecting the leftover attempt keeps the order paid, since another payment settled it
    payments.reject_payment(&manager(), first.id, None).await.unwrap();
    let order = system.engine.orders().get_order_by_id(&staff(), order.id).await.unwrap();
    assert_eq!(order.payment_status, OrderPaymentStatus::Paid);
    system.tear_down().await;
}

#[tokio::test]
async fn concurrent_confirmations_settle_once() {
    let system = TestSystem::new().await;
    let payments = system.engine.payments();
    let (order, first) = place_order(&system, Some(PaymentRequest::new(PaymentMethod::Transfer))).await;
    let second = payments.create_payment(&staff(), order.id, PaymentRequest::new(PaymentMethod::Qr)).await.unwrap();
    let ctx = manager();
    let (a, b) = tokio::join!(
        payments.confirm_payment(&ctx, first.unwrap(), None),
        payments.confirm_payment(&ctx, second.id, None)
    );
    assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1, "Exactly one confirmation must win: {a:?} / {b:?}");
    let settled = payments
        .find_payments_by_order(&staff(), order.id)
        .await
        .unwrap()
        .into_iter()
        .filter(|p| p.status == PaymentStatus::Paid)
        .count();
    assert_eq!(settled, 1);
    system.tear_down().await;
}

#[tokio::test]
async fn confirm_by_order_uses_the_latest_attempt() {
    let system = TestSystem::new().await;
    let payments = system.engine.payments();
    let (order, _) = place_order(&system, None).await;
    let err = payments.confirm_payment_by_order(&manager(), order.id, None).await.unwrap_err();
    assert_eq!(err, PosApiError::PaymentNotFound);

    let first = payments.create_payment(&staff(), order.id, PaymentRequest::new(PaymentMethod::Qr)).await.unwrap();
    payments.reject_payment(&manager(), first.id, None).await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second =
        payments.create_payment(&staff(), order.id, PaymentRequest::new(PaymentMethod::Transfer)).await.unwrap();
    let confirmed = payments.confirm_payment_by_order(&manager(), order.id, None).await.unwrap();
    assert_eq!(confirmed.id, second.id);

    let history = payments.find_payments_by_order(&staff(), order.id).await.unwrap();
    assert_eq!(history.iter().map(|p| p.id).collect::<Vec<_>>(), vec![second.id, first.id]);

    let err = payments.confirm_payment_by_order(&manager(), 9_999, None).await.unwrap_err();
    assert_eq!(err, PosApiError::OrderNotFound);
    system.tear_down().await;
}

#[tokio::test]
async fn payment_requests_are_validated() {
    let system = TestSystem::new().await;
    let payments = system.engine.payments();
    let (order, _) = place_order(&system, None).await;
    let err = payments.create_payment(&staff(), order.id, PaymentRequest::new(PaymentMethod::Card)).await;
    assert_eq!(err.unwrap_err(), PosApiError::PaymentMethodNotEnabled(PaymentMethod::Card));
    let request = PaymentRequest::new(PaymentMethod::Cash).with_amount(Money::ZERO);
    let err = payments.create_payment(&staff(), order.id, request).await.unwrap_err();
    assert!(matches!(err, PosApiError::InvalidRequest(_)));
    let err = payments.create_payment(&staff(), 9_999, PaymentRequest::cash_paid()).await.unwrap_err();
    assert_eq!(err, PosApiError::OrderNotFound);
    let err = payments.create_payment(&outsider(), order.id, PaymentRequest::cash_paid()).await.unwrap_err();
    assert_eq!(err, PosApiError::OrderNotFound);
    let err = payments.confirm_payment(&manager(), 9_999, None).await.unwrap_err();
    assert_eq!(err, PosApiError::PaymentNotFound);

    let partial = PaymentRequest::new(PaymentMethod::Cash).with_amount(Money::from(20_000)).with_note("Split bill");
    let payment = payments.create_payment(&staff(), order.id, partial).await.unwrap();
    assert_eq!(payment.amount, Money::from(20_000));
    assert_eq!(payment.status, PaymentStatus::Pending);
    system.tear_down().await;
}

#[tokio::test]
async fn payments_are_audited() {
    let system = TestSystem::new().await;
    let payments = system.engine.payments();
    let (order, payment_id) = place_order(&system, Some(PaymentRequest::new(PaymentMethod::Transfer))).await;
    payments.confirm_payment(&manager(), payment_id.unwrap(), None).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    let created = system.audit.entries_for(AuditAction::OrderCreated);
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].entity_id, order.id.to_string());
    assert_eq!(created[0].actor_user_id.as_deref(), Some(CASHIER));
    assert_eq!(system.audit.entries_for(AuditAction::PaymentCreated).len(), 1);
    let confirmed = system.audit.entries_for(AuditAction::PaymentConfirmed);
    assert_eq!(confirmed.len(), 1);
    assert_eq!(confirmed[0].actor_user_id.as_deref(), Some(MANAGER));
    assert_eq!(confirmed[0].entity_type, "payment");
    system.tear_down().await;
}

#[tokio::test]
async fn payments_need_the_outlet_in_the_directory() {
    let system = TestSystem::new().await;
    let payments = system.engine.payments();
    let (order, _) = place_order(&system, None).await;
    system.catalog.remove_outlet(OUTLET).expect("Outlet was not seeded");
    let err = payments.create_payment(&staff(), order.id, PaymentRequest::cash_paid()).await.unwrap_err();
    assert_eq!(err, PosApiError::OutletNotFound(OUTLET.to_string()));
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let history = payments.find_payments_by_order(&staff(), order.id).await.unwrap();
    assert!(history.is_empty());
    system.tear_down().await;
}
