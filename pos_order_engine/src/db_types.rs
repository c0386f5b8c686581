use std::{fmt::Display, str::FromStr, sync::OnceLock};

use chrono::{DateTime, Utc};
pub use pos_common::Money;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid {kind}: {value}")]
pub struct ConversionError {
    kind: &'static str,
    value: String,
}

impl ConversionError {
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self { kind, value: value.to_string() }
    }
}

/// Generates `Display` and `FromStr` for a fieldless enum using a fixed table of wire names.
macro_rules! wire_names {
    ($for_enum:ident, $kind:literal, { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl Display for $for_enum {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => write!(f, $name),)+
                }
            }
        }

        impl FromStr for $for_enum {
            type Err = ConversionError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(Self::$variant),)+
                    s => Err(ConversionError::new($kind, s)),
                }
            }
        }
    };
}

//--------------------------------------       OrderCode       ---------------------------------------------------------
pub const ORDER_CODE_LENGTH: usize = 6;
const ORDER_CODE_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

fn order_code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[0-9A-Z]{6}$").expect("order code pattern is a valid regex"))
}

/// The short, human-readable base-36 code that guests use to track an order without logging in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrderCode(String);

impl OrderCode {
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let code = (0..ORDER_CODE_LENGTH)
            .map(|_| ORDER_CODE_ALPHABET[rng.gen_range(0..ORDER_CODE_ALPHABET.len())] as char)
            .collect();
        Self(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for OrderCode {
    type Err = ConversionError;

    /// Codes are case-insensitive on input, since guests type them by hand.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_uppercase();
        if order_code_pattern().is_match(&code) {
            Ok(Self(code))
        } else {
            Err(ConversionError::new("order code", s))
        }
    }
}

impl TryFrom<String> for OrderCode {
    type Error = ConversionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OrderCode> for String {
    fn from(code: OrderCode) -> Self {
        code.0
    }
}

impl Display for OrderCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatusType {
    /// The order has been placed, but staff have not looked at it yet.
    New,
    /// Staff have acknowledged the order.
    Accepted,
    /// The kitchen is preparing the order.
    InProgress,
    /// The order is ready to be served or collected.
    Ready,
    /// The order has been delivered to the table or customer.
    Served,
    /// The order is complete.
    Closed,
    /// The order was cancelled before completion.
    Cancelled,
}

wire_names!(OrderStatusType, "order status", {
    New => "NEW",
    Accepted => "ACCEPTED",
    InProgress => "IN_PROGRESS",
    Ready => "READY",
    Served => "SERVED",
    Closed => "CLOSED",
    Cancelled => "CANCELLED",
});

impl OrderStatusType {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Cancelled)
    }

    /// Position along the kitchen/service pipeline. `Cancelled` sits outside the pipeline.
    fn stage(&self) -> Option<u8> {
        match self {
            Self::New => Some(0),
            Self::Accepted => Some(1),
            Self::InProgress => Some(2),
            Self::Ready => Some(3),
            Self::Served => Some(4),
            Self::Closed => Some(5),
            Self::Cancelled => None,
        }
    }

    /// Whether `self -> next` is a forward edge of the lifecycle. Skipping stages is allowed, moving backwards is not,
    /// and nothing leaves a terminal state. Cancellation is reachable from every non-terminal state.
    pub fn is_forward_transition(&self, next: OrderStatusType) -> bool {
        if self.is_terminal() {
            return false;
        }
        match (self.stage(), next.stage()) {
            (_, None) => true,
            (Some(from), Some(to)) => to > from,
            (None, Some(_)) => false,
        }
    }
}

//-------------------------------------- OrderPaymentStatus  ---------------------------------------------------------
/// The coarse settlement state cached on an order so that terminals can filter without touching the payment ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderPaymentStatus {
    Unpaid,
    Pending,
    Paid,
}

wire_names!(OrderPaymentStatus, "order payment status", {
    Unpaid => "UNPAID",
    Pending => "PENDING",
    Paid => "PAID",
});

//--------------------------------------    PaymentStatus      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Rejected,
}

wire_names!(PaymentStatus, "payment status", {
    Pending => "PENDING",
    Paid => "PAID",
    Rejected => "REJECTED",
});

impl PaymentStatus {
    /// The status a freshly created payment starts in. Only cash can be settled on the spot, and only when the
    /// cashier explicitly asks for it.
    pub fn initial(method: PaymentMethod, mark_as_paid: bool) -> Self {
        if method == PaymentMethod::Cash && mark_as_paid {
            Self::Paid
        } else {
            Self::Pending
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl From<PaymentStatus> for OrderPaymentStatus {
    fn from(status: PaymentStatus) -> Self {
        match status {
            PaymentStatus::Pending => OrderPaymentStatus::Pending,
            PaymentStatus::Paid => OrderPaymentStatus::Paid,
            PaymentStatus::Rejected => OrderPaymentStatus::Unpaid,
        }
    }
}

//--------------------------------------    PaymentMethod      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    Transfer,
    Qr,
    Card,
}

wire_names!(PaymentMethod, "payment method", {
    Cash => "CASH",
    Transfer => "TRANSFER",
    Qr => "QR",
    Card => "CARD",
});

//--------------------------------------     OrderChannel      ---------------------------------------------------------
/// Where the order was placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderChannel {
    /// Entered by staff on a point-of-sale terminal.
    Pos,
    /// Self-ordered by a guest after scanning the table's QR code.
    Qr,
}

wire_names!(OrderChannel, "order channel", {
    Pos => "POS",
    Qr => "QR",
});

//--------------------------------------       Customer        ---------------------------------------------------------
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Reference to a loyalty member record, if the customer is a member.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_id: Option<String>,
}

impl Customer {
    pub fn guest<S: Into<String>>(name: S) -> Self {
        Self { name: Some(name.into()), ..Default::default() }
    }

    pub fn with_phone<S: Into<String>>(mut self, phone: S) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn member<S: Into<String>>(member_id: S) -> Self {
        Self { member_id: Some(member_id.into()), ..Default::default() }
    }
}

//--------------------------------------       OrderItem       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedVariant {
    pub name: String,
    pub price_delta: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedAddon {
    pub addon_id: String,
    pub name: String,
    pub price: Money,
}

/// A line of an order, frozen at the moment the order was placed.
///
/// Names and prices are copies of the catalog entries at order time, so later menu edits never change historical
/// totals. The fields are private and there are no setters: an `OrderItem` is built once, by the pricing calculator,
/// and then only read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    menu_item_id: String,
    name: String,
    base_price: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    variant: Option<SelectedVariant>,
    #[serde(default)]
    addons: Vec<SelectedAddon>,
    qty: u32,
    unit_price: Money,
    line_total: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    note: Option<String>,
}

impl OrderItem {
    /// Prices a line from its snapshot parts. Returns `None` if the unit price or line total does not fit in a
    /// `Money`.
    pub fn new(
        menu_item_id: String,
        name: String,
        base_price: Money,
        variant: Option<SelectedVariant>,
        addons: Vec<SelectedAddon>,
        qty: u32,
        note: Option<String>,
    ) -> Option<Self> {
        let variant_delta = variant.as_ref().map(|v| v.price_delta).unwrap_or_default();
        let addon_total = Money::checked_sum(addons.iter().map(|a| a.price))?;
        let unit_price = base_price.checked_add(variant_delta)?.checked_add(addon_total)?;
        let line_total = unit_price.checked_mul(i64::from(qty))?;
        Some(Self { menu_item_id, name, base_price, variant, addons, qty, unit_price, line_total, note })
    }

    pub fn menu_item_id(&self) -> &str {
        &self.menu_item_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_price(&self) -> Money {
        self.base_price
    }

    pub fn variant(&self) -> Option<&SelectedVariant> {
        self.variant.as_ref()
    }

    pub fn addons(&self) -> &[SelectedAddon] {
        &self.addons
    }

    pub fn qty(&self) -> u32 {
        self.qty
    }

    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    pub fn line_total(&self) -> Money {
        self.line_total
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }
}

//--------------------------------------        Order          ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_code: OrderCode,
    pub company_id: String,
    pub outlet_id: String,
    pub table_id: Option<String>,
    pub session_id: Option<String>,
    pub channel: OrderChannel,
    pub customer: Customer,
    pub items: Vec<OrderItem>,
    pub subtotal: Money,
    pub discount: Money,
    pub tax: Money,
    pub service: Money,
    pub total: Money,
    pub status: OrderStatusType,
    pub payment_status: OrderPaymentStatus,
    pub created_by: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------        NewOrder       ---------------------------------------------------------
/// A fully priced order, ready to be written to the store.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_code: OrderCode,
    pub company_id: String,
    pub outlet_id: String,
    pub table_id: Option<String>,
    pub session_id: Option<String>,
    pub channel: OrderChannel,
    pub customer: Customer,
    pub items: Vec<OrderItem>,
    pub subtotal: Money,
    pub discount: Money,
    pub tax: Money,
    pub service: Money,
    pub total: Money,
    pub payment_status: OrderPaymentStatus,
    pub created_by: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    /// Swap in a fresh order code after a collision.
    pub fn with_code(mut self, code: OrderCode) -> Self {
        self.order_code = code;
        self
    }
}

//--------------------------------------        Payment        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub order_id: i64,
    pub company_id: String,
    pub outlet_id: String,
    pub method: PaymentMethod,
    pub amount: Money,
    pub status: PaymentStatus,
    pub proof_url: Option<String>,
    pub note: Option<String>,
    pub created_by: Option<String>,
    /// Set only when the payment is settled.
    pub confirmed_by: Option<String>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The parts of a payment attempt that the caller decides. The store fills in the order back-reference and tenant
/// scope.
#[derive(Debug, Clone)]
pub struct PaymentDraft {
    pub method: PaymentMethod,
    pub amount: Money,
    pub status: PaymentStatus,
    pub proof_url: Option<String>,
    pub note: Option<String>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PaymentDraft {
    pub fn confirmed_by(&self) -> Option<&str> {
        match self.status {
            PaymentStatus::Paid => self.created_by.as_deref(),
            _ => None,
        }
    }
}

//--------------------------------------         Shift         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shift {
    pub id: i64,
    pub company_id: String,
    pub outlet_id: String,
    pub cashier_id: String,
    pub opened_at: DateTime<Utc>,
    pub opening_cash: Money,
    pub closed_at: Option<DateTime<Utc>>,
    pub closing_cash: Option<Money>,
    pub note: Option<String>,
}

impl Shift {
    pub fn is_open(&self) -> bool {
        self.closed_at.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct NewShift {
    pub company_id: String,
    pub outlet_id: String,
    pub cashier_id: String,
    pub opening_cash: Money,
    pub note: Option<String>,
    pub opened_at: DateTime<Utc>,
}
