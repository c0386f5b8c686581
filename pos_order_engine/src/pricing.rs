//! # Pricing calculator
//!
//! Turns a cart of item requests into immutable [`OrderItem`] snapshots and the order's aggregate totals.
//!
//! Pricing happens in two steps:
//! 1. [`snapshot_items`] resolves each request against the live catalog (the only I/O in this module, and it is
//!    read-only) and freezes names and prices into snapshots.
//! 2. [`compute_totals`] is a pure function of the snapshots, the discount and the outlet settings.
//!
//! All arithmetic is on integer minor units. Percentages round half away from zero; the outlet rounding mode rounds
//! the final total to the nearest multiple, with ties going up.
use std::fmt::Display;

use log::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    catalog::{MenuCatalog, OutletSettings},
    db_types::{Money, OrderItem, SelectedAddon, SelectedVariant},
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    #[error("The order does not contain any items")]
    EmptyOrder,
    #[error("Menu item {0} is not available")]
    ItemUnavailable(String),
    #[error("Addon {addon_id} is not available for menu item {menu_item_id}")]
    AddonUnavailable { menu_item_id: String, addon_id: String },
    #[error("Quantity for menu item {0} must be at least 1")]
    InvalidQuantity(String),
    #[error("The price of menu item {0} is too large to represent")]
    AmountOverflow(String),
    #[error("The order total is too large to represent")]
    TotalOverflow,
    #[error("Could not read the menu catalog: {0}")]
    CatalogError(String),
}

//--------------------------------------         Rate          ---------------------------------------------------------
/// A percentage with two decimal places, stored as basis points (1% == 100).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Rate(u32);

#[derive(Debug, Clone, Error)]
#[error("Rate must be between 0% and 100%, got {0} basis points")]
pub struct RateOutOfRange(u32);

impl Rate {
    pub const ZERO: Rate = Rate(0);
    const FULL: u32 = 10_000;

    pub fn from_percent(percent: u32) -> Result<Self, RateOutOfRange> {
        Self::from_basis_points(percent.saturating_mul(100))
    }

    pub fn from_basis_points(bps: u32) -> Result<Self, RateOutOfRange> {
        if bps > Self::FULL {
            Err(RateOutOfRange(bps))
        } else {
            Ok(Self(bps))
        }
    }

    pub fn basis_points(&self) -> u32 {
        self.0
    }

    /// `amount * rate`, rounded half away from zero.
    pub fn apply(&self, amount: Money) -> Money {
        let scaled = i128::from(amount.value()) * i128::from(self.0);
        let divisor = i128::from(Self::FULL);
        let quotient = scaled / divisor;
        let remainder = scaled % divisor;
        let rounded = if remainder.abs() * 2 >= divisor { quotient + scaled.signum() } else { quotient };
        #[allow(clippy::cast_possible_truncation)]
        Money::from(rounded as i64)
    }
}

impl TryFrom<u32> for Rate {
    type Error = RateOutOfRange;

    fn try_from(bps: u32) -> Result<Self, Self::Error> {
        Self::from_basis_points(bps)
    }
}

impl From<Rate> for u32 {
    fn from(rate: Rate) -> Self {
        rate.0
    }
}

impl Display for Rate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

//--------------------------------------     RoundingMode      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundingMode {
    #[default]
    #[serde(rename = "none")]
    None,
    #[serde(rename = "nearest-100")]
    Nearest100,
    #[serde(rename = "nearest-500")]
    Nearest500,
    #[serde(rename = "nearest-1000")]
    Nearest1000,
}

impl RoundingMode {
    pub fn step(&self) -> Option<i64> {
        match self {
            Self::None => None,
            Self::Nearest100 => Some(100),
            Self::Nearest500 => Some(500),
            Self::Nearest1000 => Some(1000),
        }
    }

    /// Rounds to the nearest multiple of the step. Ties round up. Returns `None` if the rounded amount does not fit.
    pub fn apply(&self, amount: Money) -> Option<Money> {
        match self.step() {
            None => Some(amount),
            Some(step) => {
                let shifted = amount.value().checked_add(step / 2)?;
                shifted.div_euclid(step).checked_mul(step).map(Money::from)
            },
        }
    }
}

//--------------------------------------      ItemRequest      ---------------------------------------------------------
/// One line of a cart, as submitted by a terminal or the guest ordering page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRequest {
    pub menu_item_id: String,
    pub qty: u32,
    #[serde(default)]
    pub variant_name: Option<String>,
    #[serde(default)]
    pub addon_ids: Vec<String>,
    #[serde(default)]
    pub note: Option<String>,
}

impl ItemRequest {
    pub fn new<S: Into<String>>(menu_item_id: S, qty: u32) -> Self {
        Self { menu_item_id: menu_item_id.into(), qty, variant_name: None, addon_ids: Vec::new(), note: None }
    }

    pub fn with_variant<S: Into<String>>(mut self, variant: S) -> Self {
        self.variant_name = Some(variant.into());
        self
    }

    pub fn with_addon<S: Into<String>>(mut self, addon_id: S) -> Self {
        self.addon_ids.push(addon_id.into());
        self
    }

    pub fn with_note<S: Into<String>>(mut self, note: S) -> Self {
        self.note = Some(note.into());
        self
    }
}

//--------------------------------------      OrderTotals      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Money,
    pub discount: Money,
    pub tax: Money,
    pub service: Money,
    pub total: Money,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedOrder {
    pub items: Vec<OrderItem>,
    pub totals: OrderTotals,
}

/// Resolves every request against the live catalog and freezes the result into order item snapshots.
///
/// * Unknown or inactive menu items fail with [`PricingError::ItemUnavailable`].
/// * A variant name that the menu item does not offer is ignored and the line is priced without a variant.
/// * Addons must exist, be active, and be offered by the menu item, otherwise [`PricingError::AddonUnavailable`].
pub async fn snapshot_items<C: MenuCatalog>(
    catalog: &C,
    requests: &[ItemRequest],
) -> Result<Vec<OrderItem>, PricingError> {
    if requests.is_empty() {
        return Err(PricingError::EmptyOrder);
    }
    let mut items = Vec::with_capacity(requests.len());
    for request in requests {
        if request.qty == 0 {
            return Err(PricingError::InvalidQuantity(request.menu_item_id.clone()));
        }
        let menu_item = catalog
            .fetch_menu_item(&request.menu_item_id)
            .await
            .map_err(|e| PricingError::CatalogError(e.to_string()))?
            .filter(|m| m.is_active)
            .ok_or_else(|| PricingError::ItemUnavailable(request.menu_item_id.clone()))?;
        let variant = request.variant_name.as_deref().and_then(|name| {
            let found = menu_item.variant(name);
            if found.is_none() {
                debug!("🧾️ Menu item {} has no variant '{name}'. Pricing without a variant.", menu_item.id);
            }
            found.map(|v| SelectedVariant { name: v.name.clone(), price_delta: v.price_delta })
        });
        let mut addons = Vec::with_capacity(request.addon_ids.len());
        for addon_id in &request.addon_ids {
            let unavailable =
                || PricingError::AddonUnavailable { menu_item_id: menu_item.id.clone(), addon_id: addon_id.clone() };
            if !menu_item.offers_addon(addon_id) {
                return Err(unavailable());
            }
            let addon = catalog
                .fetch_addon(addon_id)
                .await
                .map_err(|e| PricingError::CatalogError(e.to_string()))?
                .filter(|a| a.is_active)
                .ok_or_else(unavailable)?;
            addons.push(SelectedAddon { addon_id: addon.id, name: addon.name, price: addon.price });
        }
        let item = OrderItem::new(
            menu_item.id.clone(),
            menu_item.name,
            menu_item.base_price,
            variant,
            addons,
            request.qty,
            request.note.clone(),
        )
        .ok_or(PricingError::AmountOverflow(menu_item.id))?;
        items.push(item);
    }
    Ok(items)
}

/// Computes the order totals from item snapshots. This function is pure: identical inputs always give identical
/// outputs.
///
/// The discount is not clamped. If it exceeds the subtotal, tax and service come out negative; callers must reject
/// that case before persisting anything. Totals that do not fit in a `Money` fail with
/// [`PricingError::TotalOverflow`].
pub fn compute_totals(
    items: &[OrderItem],
    discount: Money,
    settings: &OutletSettings,
) -> Result<OrderTotals, PricingError> {
    let subtotal = Money::checked_sum(items.iter().map(|i| i.line_total())).ok_or(PricingError::TotalOverflow)?;
    let taxable = subtotal.checked_sub(discount).ok_or(PricingError::TotalOverflow)?;
    let tax = settings.tax_rate.apply(taxable);
    let service = settings.service_rate.apply(taxable);
    let total = taxable
        .checked_add(tax)
        .and_then(|t| t.checked_add(service))
        .and_then(|t| settings.rounding.apply(t))
        .ok_or(PricingError::TotalOverflow)?;
    Ok(OrderTotals { subtotal, discount, tax, service, total })
}

/// Convenience wrapper that runs [`snapshot_items`] followed by [`compute_totals`].
pub async fn price_order<C: MenuCatalog>(
    catalog: &C,
    requests: &[ItemRequest],
    discount: Money,
    settings: &OutletSettings,
) -> Result<PricedOrder, PricingError> {
    let items = snapshot_items(catalog, requests).await?;
    let totals = compute_totals(&items, discount, settings)?;
    trace!(
        "🧾️ Priced {} items. Subtotal {}, tax {}, service {}, total {}",
        items.len(),
        totals.subtotal,
        totals.tax,
        totals.service,
        totals.total
    );
    Ok(PricedOrder { items, totals })
}
