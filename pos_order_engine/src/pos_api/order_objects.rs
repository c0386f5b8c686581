use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Customer, Money, Order, OrderChannel, OrderStatusType, Payment, PaymentMethod},
    pricing::ItemRequest,
};

/// The identity context of a request, as established by the transport layer. The engine never authenticates; it
/// only scopes every read and write to `company_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    pub company_id: String,
    /// The authenticated user, or `None` for a guest ordering through a table QR code.
    pub actor_id: Option<String>,
}

impl RequestContext {
    pub fn staff<S: Into<String>>(company_id: S, actor_id: S) -> Self {
        Self { company_id: company_id.into(), actor_id: Some(actor_id.into()) }
    }

    pub fn guest<S: Into<String>>(company_id: S) -> Self {
        Self { company_id: company_id.into(), actor_id: None }
    }

    pub fn actor(&self) -> Option<&str> {
        self.actor_id.as_deref()
    }
}

/// A payment attempt, either attached to a new order or recorded against an existing one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub method: PaymentMethod,
    /// Defaults to the order total.
    #[serde(default)]
    pub amount: Option<Money>,
    /// Settle the payment immediately. Only honoured for cash.
    #[serde(default)]
    pub mark_as_paid: bool,
    #[serde(default)]
    pub proof_url: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

impl PaymentRequest {
    pub fn new(method: PaymentMethod) -> Self {
        Self { method, amount: None, mark_as_paid: false, proof_url: None, note: None }
    }

    pub fn cash_paid() -> Self {
        Self::new(PaymentMethod::Cash).mark_as_paid()
    }

    pub fn mark_as_paid(mut self) -> Self {
        self.mark_as_paid = true;
        self
    }

    pub fn with_amount(mut self, amount: Money) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_proof_url<S: Into<String>>(mut self, url: S) -> Self {
        self.proof_url = Some(url.into());
        self
    }

    pub fn with_note<S: Into<String>>(mut self, note: S) -> Self {
        self.note = Some(note.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderRequest {
    pub outlet_id: String,
    #[serde(default)]
    pub table_id: Option<String>,
    /// The guest's QR ordering session, if the order came from one.
    #[serde(default)]
    pub session_id: Option<String>,
    pub channel: OrderChannel,
    #[serde(default)]
    pub customer: Customer,
    pub items: Vec<ItemRequest>,
    #[serde(default)]
    pub discount: Money,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub payment: Option<PaymentRequest>,
}

impl NewOrderRequest {
    pub fn new<S: Into<String>>(outlet_id: S, channel: OrderChannel) -> Self {
        Self {
            outlet_id: outlet_id.into(),
            table_id: None,
            session_id: None,
            channel,
            customer: Customer::default(),
            items: Vec::new(),
            discount: Money::ZERO,
            note: None,
            payment: None,
        }
    }

    pub fn with_item(mut self, item: ItemRequest) -> Self {
        self.items.push(item);
        self
    }

    pub fn with_table<S: Into<String>>(mut self, table_id: S) -> Self {
        self.table_id = Some(table_id.into());
        self
    }

    pub fn with_session<S: Into<String>>(mut self, session_id: S) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_customer(mut self, customer: Customer) -> Self {
        self.customer = customer;
        self
    }

    pub fn with_discount(mut self, discount: Money) -> Self {
        self.discount = discount;
        self
    }

    pub fn with_note<S: Into<String>>(mut self, note: S) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_payment(mut self, payment: PaymentRequest) -> Self {
        self.payment = Some(payment);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderResult {
    pub order: Order,
    /// The initial payment, if the request carried one.
    pub payment: Option<Payment>,
}

/// Listing options. Unset page values use the configured defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListOrdersRequest {
    #[serde(default)]
    pub statuses: Vec<OrderStatusType>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub page_size: Option<u32>,
}

impl ListOrdersRequest {
    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.statuses.push(status);
        self
    }

    pub fn with_page(mut self, page: u32, page_size: u32) -> Self {
        self.page = Some(page);
        self.page_size = Some(page_size);
        self
    }
}
