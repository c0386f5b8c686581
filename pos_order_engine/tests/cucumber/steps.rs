use cucumber::{then, when};
use pos_common::Money;
use pos_order_engine::{
    db_types::{OrderChannel, OrderPaymentStatus, OrderStatusType, PaymentMethod, PaymentStatus},
    order_objects::{NewOrderRequest, PaymentRequest},
    pricing::ItemRequest,
};

use crate::cucumber::{pos_world::error_name, PosWorld};

async fn place_order(world: &mut PosWorld, role: &str, request: NewOrderRequest) {
    let ctx = world.context_for(role);
    let result = world.system().engine.orders().create_order(&ctx, request).await;
    world.record(result, |w, r| {
        w.order = Some(r.order);
        w.payment = r.payment;
    });
}

fn order_request(outlet: &str, qty: u32, item: &str, role: &str) -> NewOrderRequest {
    let channel = if role == "guest" { OrderChannel::Qr } else { OrderChannel::Pos };
    NewOrderRequest::new(outlet, channel).with_item(ItemRequest::new(item, qty))
}

#[when(expr = "the {word} orders {int} {string} at outlet {string}")]
async fn simple_order(world: &mut PosWorld, role: String, qty: u32, item: String, outlet: String) {
    let request = order_request(&outlet, qty, &item, &role);
    place_order(world, &role, request).await;
}

#[when(expr = "the {word} orders {int} {string} with variant {string} and addon {string} at outlet {string}")]
async fn order_with_extras(
    world: &mut PosWorld,
    role: String,
    qty: u32,
    item: String,
    variant: String,
    addon: String,
    outlet: String,
) {
    let channel = OrderChannel::Pos;
    let line = ItemRequest::new(item, qty).with_variant(variant).with_addon(addon);
    place_order(world, &role, NewOrderRequest::new(outlet, channel).with_item(line)).await;
}

#[when(expr = "the {word} orders {int} {string} at outlet {string} paying cash on the spot")]
async fn order_paid_in_cash(world: &mut PosWorld, role: String, qty: u32, item: String, outlet: String) {
    let request = order_request(&outlet, qty, &item, &role).with_payment(PaymentRequest::cash_paid());
    place_order(world, &role, request).await;
}

#[when(expr = "the {word} orders {int} {string} at outlet {string} paying by {word}")]
async fn order_with_payment(
    world: &mut PosWorld,
    role: String,
    qty: u32,
    item: String,
    outlet: String,
    method: String,
) {
    let method = method.parse::<PaymentMethod>().expect("Not a payment method");
    let request = order_request(&outlet, qty, &item, &role).with_payment(PaymentRequest::new(method));
    place_order(world, &role, request).await;
}

#[when(expr = "the order is moved to {word}")]
async fn move_order(world: &mut PosWorld, status: String) {
    let status = status.parse::<OrderStatusType>().expect("Not an order status");
    let order_id = world.order().id;
    let ctx = world.context_for("cashier");
    let result = world.system().engine.orders().update_order_status(&ctx, order_id, status).await;
    world.record(result, |w, order| w.order = Some(order));
}

#[when(expr = "the {word} confirms the payment")]
async fn confirm_payment(world: &mut PosWorld, role: String) {
    let payment_id = world.payment().id;
    let ctx = world.context_for(&role);
    let result = world.system().engine.payments().confirm_payment(&ctx, payment_id, None).await;
    world.record(result, |w, payment| w.payment = Some(payment));
}

#[when(expr = "the {word} rejects the payment")]
async fn reject_payment(world: &mut PosWorld, role: String) {
    let payment_id = world.payment().id;
    let ctx = world.context_for(&role);
    let result = world.system().engine.payments().reject_payment(&ctx, payment_id, None).await;
    world.record(result, |w, payment| w.payment = Some(payment));
}

#[when(expr = "{string} opens a shift at {string} with {int} in the till")]
async fn open_shift(world: &mut PosWorld, cashier: String, outlet: String, cash: i64) {
    let ctx = world.context_for("cashier");
    let result = world.system().engine.shifts().open_shift(&ctx, &outlet, &cashier, Money::from(cash), None).await;
    world.record(result, |w, shift| w.shift = Some(shift));
}

#[when(expr = "{string} closes their shift with {int} in the till")]
async fn close_shift(world: &mut PosWorld, cashier: String, cash: i64) {
    let ctx = world.context_for("cashier");
    let result = world.system().engine.shifts().close_shift(&ctx, &cashier, Money::from(cash), None).await;
    world.record(result, |w, shift| w.shift = Some(shift));
}

async fn refreshed_order(world: &mut PosWorld) -> pos_order_engine::db_types::Order {
    let ctx = world.context_for("cashier");
    let id = world.order().id;
    world.system().engine.orders().get_order_by_id(&ctx, id).await.expect("Error fetching order")
}

#[then(expr = "the order {word} is {int}")]
async fn check_amount(world: &mut PosWorld, field: String, amount: i64) {
    let order = refreshed_order(world).await;
    let actual = match field.as_str() {
        "subtotal" => order.subtotal,
        "discount" => order.discount,
        "tax" => order.tax,
        "service" => order.service,
        "total" => order.total,
        _ => panic!("Unknown order amount: {field}"),
    };
    assert_eq!(actual, Money::from(amount), "Order {field} is incorrect");
}

#[then(expr = "the order status is {word}")]
async fn check_order_status(world: &mut PosWorld, status: String) {
    let order = refreshed_order(world).await;
    assert_eq!(order.status.to_string(), status);
}

#[then(expr = "the order payment status is {word}")]
async fn check_order_payment_status(world: &mut PosWorld, status: String) {
    let expected = status.parse::<OrderPaymentStatus>().expect("Not an order payment status");
    let order = refreshed_order(world).await;
    assert_eq!(order.payment_status, expected);
}

#[then(expr = "the payment status is {word}")]
async fn check_payment_status(world: &mut PosWorld, status: String) {
    let expected = status.parse::<PaymentStatus>().expect("Not a payment status");
    let ctx = world.context_for("cashier");
    let id = world.payment().id;
    let payment = world.system().engine.payments().get_payment(&ctx, id).await.expect("Error fetching payment");
    assert_eq!(payment.status, expected);
}

#[then(expr = "the payment was confirmed by {string}")]
async fn check_confirmed_by(world: &mut PosWorld, user: String) {
    assert_eq!(world.payment().confirmed_by.as_deref(), Some(user.as_str()));
}

#[then("the order can be found by its code")]
async fn check_order_code(world: &mut PosWorld) {
    let code = world.order().order_code.to_string();
    let found = world.system().engine.orders().get_order_by_code(&code).await.expect("Order not found by code");
    assert_eq!(found.id, world.order().id);
}

#[then(expr = "the request fails with {string}")]
async fn check_failure(world: &mut PosWorld, expected: String) {
    let err = world.last_error.as_ref().expect("The last request succeeded");
    assert_eq!(error_name(err), expected, "Unexpected error: {err}");
}

#[then(expr = "{string} has no open shift at {string}")]
async fn check_no_shift(world: &mut PosWorld, cashier: String, outlet: String) {
    let ctx = world.context_for("cashier");
    let shift = world.system().engine.shifts().get_current_shift(&ctx, &outlet, &cashier).await.unwrap();
    assert!(shift.is_none(), "{cashier} still has an open shift");
}
