use pos_common::Money;
use pos_order_engine::{audit::AuditAction, ErrorKind, PosApiError};

use crate::support::fixtures::*;

mod support;

#[tokio::test]
async fn one_open_shift_per_outlet_and_cashier() {
    let system = TestSystem::new().await;
    let shifts = system.engine.shifts();
    let ctx = staff();
    let shift = shifts.open_shift(&ctx, OUTLET, CASHIER, Money::from(500_000), Some("Float counted")).await.unwrap();
    assert!(shift.is_open());
    assert_eq!(shift.opening_cash, Money::from(500_000));
    assert_eq!(shift.note.as_deref(), Some("Float counted"));

    let err = shifts.open_shift(&ctx, OUTLET, CASHIER, Money::from(100_000), None).await.unwrap_err();
    assert_eq!(err, PosApiError::ShiftAlreadyOpen);
    assert_eq!(err.kind(), ErrorKind::Conflict);

    // Same cashier at another outlet, and another cashier at the same outlet, are both fine
    shifts.open_shift(&ctx, KIOSK, CASHIER, Money::ZERO, None).await.unwrap();
    shifts.open_shift(&ctx, OUTLET, MANAGER, Money::ZERO, None).await.unwrap();

    let current = shifts.get_current_shift(&ctx, OUTLET, CASHIER).await.unwrap().expect("No open shift");
    assert_eq!(current.id, shift.id);
    system.tear_down().await;
}

#[tokio::test]
async fn concurrent_opens_leave_one_shift() {
    let system = TestSystem::new().await;
    let shifts = system.engine.shifts();
    let ctx = staff();
    let (a, b) = tokio::join!(
        shifts.open_shift(&ctx, OUTLET, CASHIER, Money::ZERO, None),
        shifts.open_shift(&ctx, OUTLET, CASHIER, Money::ZERO, None)
    );
    assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1, "Exactly one open must win: {a:?} / {b:?}");
    let loser = if a.is_err() { a } else { b };
    assert_eq!(loser.unwrap_err(), PosApiError::ShiftAlreadyOpen);
    system.tear_down().await;
}

#[tokio::test]
async fn closing_is_final_and_appends_the_note() {
    let system = TestSystem::new().await;
    let shifts = system.engine.shifts();
    let ctx = staff();
    let opened = shifts.open_shift(&ctx, OUTLET, CASHIER, Money::from(500_000), Some("Float counted")).await.unwrap();
    let closed = shifts.close_shift(&ctx, CASHIER, Money::from(1_250_000), Some("Till short 2000")).await.unwrap();
    assert_eq!(closed.id, opened.id);
    assert!(!closed.is_open());
    assert_eq!(closed.closing_cash, Some(Money::from(1_250_000)));
    assert_eq!(closed.note.as_deref(), Some("Float counted\nTill short 2000"));
    assert!(closed.closed_at.unwrap() >= closed.opened_at);

    let err = shifts.close_shift(&ctx, CASHIER, Money::ZERO, None).await.unwrap_err();
    assert_eq!(err, PosApiError::ShiftNotFound);
    assert!(shifts.get_current_shift(&ctx, OUTLET, CASHIER).await.unwrap().is_none());

    // A new shift can be opened once the old one is closed
    let next = shifts.open_shift(&ctx, OUTLET, CASHIER, Money::ZERO, None).await.unwrap();
    assert_ne!(next.id, opened.id);
    system.tear_down().await;
}

#[tokio::test]
async fn close_picks_the_latest_open_shift_in_the_company() {
    let system = TestSystem::new().await;
    let shifts = system.engine.shifts();
    let ctx = staff();
    let first = shifts.open_shift(&ctx, OUTLET, CASHIER, Money::ZERO, None).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = shifts.open_shift(&ctx, KIOSK, CASHIER, Money::ZERO, None).await.unwrap();
    let closed = shifts.close_shift(&ctx, CASHIER, Money::from(10_000), None).await.unwrap();
    assert_eq!(closed.id, second.id);
    assert!(closed.note.is_none());
    let still_open = shifts.get_current_shift(&ctx, OUTLET, CASHIER).await.unwrap().expect("First shift closed");
    assert_eq!(still_open.id, first.id);
    system.tear_down().await;
}

#[tokio::test]
async fn shifts_are_tenant_scoped() {
    let system = TestSystem::new().await;
    let shifts = system.engine.shifts();
    shifts.open_shift(&staff(), OUTLET, CASHIER, Money::ZERO, None).await.unwrap();
    assert!(shifts.get_current_shift(&outsider(), OUTLET, CASHIER).await.unwrap().is_none());
    let err = shifts.close_shift(&outsider(), CASHIER, Money::ZERO, None).await.unwrap_err();
    assert_eq!(err, PosApiError::ShiftNotFound);
    let err = shifts.open_shift(&staff(), OUTLET, MANAGER, Money::from(-1), None).await.unwrap_err();
    assert!(matches!(err, PosApiError::InvalidRequest(_)));

    // Another company may reuse the same outlet and cashier ids without clashing
    let theirs = shifts.open_shift(&outsider(), OUTLET, CASHIER, Money::from(50_000), None).await.unwrap();
    assert_eq!(theirs.company_id, OTHER_COMPANY);
    let ours = shifts.get_current_shift(&staff(), OUTLET, CASHIER).await.unwrap().expect("Our shift went missing");
    assert_ne!(ours.id, theirs.id);
    let closed = shifts.close_shift(&outsider(), CASHIER, Money::from(50_000), None).await.unwrap();
    assert_eq!(closed.id, theirs.id);
    assert!(shifts.get_current_shift(&staff(), OUTLET, CASHIER).await.unwrap().is_some());

    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert_eq!(system.audit.entries_for(AuditAction::ShiftOpened).len(), 2);
    assert_eq!(system.audit.entries_for(AuditAction::ShiftClosed).len(), 1);
    system.tear_down().await;
}
