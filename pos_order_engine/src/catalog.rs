//! Read-only access to the catalog and outlet records owned by the rest of the platform.
//!
//! Menu, addon and outlet CRUD live elsewhere. The engine only ever reads these records: to price an order and to
//! check that the outlet taking it is open for business. Backends implement [`MenuCatalog`] and [`OutletDirectory`];
//! [`InMemoryCatalog`] is a simple implementation of both for embedding and tests.
use std::{convert::Infallible, sync::Arc};

use dashmap::DashMap;
use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Money, PaymentMethod},
    pricing::{Rate, RoundingMode},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuVariant {
    pub name: String,
    pub price_delta: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: String,
    pub name: String,
    pub base_price: Money,
    pub is_active: bool,
    pub variants: Vec<MenuVariant>,
    /// The addons that may be ordered with this item.
    pub addon_ids: Vec<String>,
}

impl MenuItem {
    pub fn new<S: Into<String>>(id: S, name: S, base_price: Money) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            base_price,
            is_active: true,
            variants: Vec::new(),
            addon_ids: Vec::new(),
        }
    }

    pub fn with_variant<S: Into<String>>(mut self, name: S, price_delta: Money) -> Self {
        self.variants.push(MenuVariant { name: name.into(), price_delta });
        self
    }

    pub fn with_addon<S: Into<String>>(mut self, addon_id: S) -> Self {
        self.addon_ids.push(addon_id.into());
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn variant(&self, name: &str) -> Option<&MenuVariant> {
        self.variants.iter().find(|v| v.name == name)
    }

    pub fn offers_addon(&self, addon_id: &str) -> bool {
        self.addon_ids.iter().any(|a| a == addon_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Addon {
    pub id: String,
    pub name: String,
    pub price: Money,
    pub is_active: bool,
}

impl Addon {
    pub fn new<S: Into<String>>(id: S, name: S, price: Money) -> Self {
        Self { id: id.into(), name: name.into(), price, is_active: true }
    }
}

/// Outlet-level pricing and payment settings. Owned by the outlet record; the engine only reads them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutletSettings {
    pub tax_rate: Rate,
    pub service_rate: Rate,
    pub rounding: RoundingMode,
    pub enabled_payment_methods: Vec<PaymentMethod>,
}

impl Default for OutletSettings {
    fn default() -> Self {
        Self {
            tax_rate: Rate::ZERO,
            service_rate: Rate::ZERO,
            rounding: RoundingMode::None,
            enabled_payment_methods: vec![PaymentMethod::Cash],
        }
    }
}

impl OutletSettings {
    pub fn accepts(&self, method: PaymentMethod) -> bool {
        self.enabled_payment_methods.contains(&method)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outlet {
    pub id: String,
    pub company_id: String,
    pub is_active: bool,
    pub settings: OutletSettings,
}

#[allow(async_fn_in_trait)]
pub trait MenuCatalog {
    type Error: std::error::Error;

    async fn fetch_menu_item(&self, menu_item_id: &str) -> Result<Option<MenuItem>, Self::Error>;

    async fn fetch_addon(&self, addon_id: &str) -> Result<Option<Addon>, Self::Error>;
}

#[allow(async_fn_in_trait)]
pub trait OutletDirectory {
    type Error: std::error::Error;

    async fn fetch_outlet(&self, outlet_id: &str) -> Result<Option<Outlet>, Self::Error>;
}

#[derive(Debug, Default)]
struct CatalogData {
    menu_items: DashMap<String, MenuItem>,
    addons: DashMap<String, Addon>,
    outlets: DashMap<String, Outlet>,
}

/// A thread-safe, in-process catalog. Cloning is cheap and clones share the same records, so the catalog can be
/// edited while orders are being priced against it.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    data: Arc<CatalogData>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert_menu_item(&self, item: MenuItem) {
        trace!("🧾️ Catalog: menu item {} updated", item.id);
        self.data.menu_items.insert(item.id.clone(), item);
    }

    pub fn upsert_addon(&self, addon: Addon) {
        trace!("🧾️ Catalog: addon {} updated", addon.id);
        self.data.addons.insert(addon.id.clone(), addon);
    }

    pub fn upsert_outlet(&self, outlet: Outlet) {
        trace!("🧾️ Catalog: outlet {} updated", outlet.id);
        self.data.outlets.insert(outlet.id.clone(), outlet);
    }

    /// Removes the outlet from the directory, returning the old record if there was one.
    pub fn remove_outlet(&self, outlet_id: &str) -> Option<Outlet> {
        self.data.outlets.remove(outlet_id).map(|(_, outlet)| outlet)
    }
}

impl MenuCatalog for InMemoryCatalog {
    type Error = Infallible;

    async fn fetch_menu_item(&self, menu_item_id: &str) -> Result<Option<MenuItem>, Self::Error> {
        Ok(self.data.menu_items.get(menu_item_id).map(|item| item.value().clone()))
    }

    async fn fetch_addon(&self, addon_id: &str) -> Result<Option<Addon>, Self::Error> {
        Ok(self.data.addons.get(addon_id).map(|addon| addon.value().clone()))
    }
}

impl OutletDirectory for InMemoryCatalog {
    type Error = Infallible;

    async fn fetch_outlet(&self, outlet_id: &str) -> Result<Option<Outlet>, Self::Error> {
        Ok(self.data.outlets.get(outlet_id).map(|outlet| outlet.value().clone()))
    }
}
