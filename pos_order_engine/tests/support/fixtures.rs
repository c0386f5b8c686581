use pos_common::Money;
use pos_order_engine::{
    audit::MemoryAuditSink,
    catalog::{Addon, InMemoryCatalog, MenuItem, Outlet, OutletSettings},
    config::EngineConfig,
    db_types::PaymentMethod,
    events::EventHooks,
    order_objects::RequestContext,
    pricing::{Rate, RoundingMode},
    PosEngine,
    SqliteDatabase,
};

use super::prepare_env::{prepare_test_env, random_db_path, tear_down};

pub const COMPANY: &str = "acme";
pub const OTHER_COMPANY: &str = "globex";
/// 10% tax, 5% service, rounded to the nearest 1000. Accepts cash, transfer and QR.
pub const OUTLET: &str = "acme-central";
/// Cash only, no tax, no rounding.
pub const KIOSK: &str = "acme-kiosk";
pub const CLOSED_OUTLET: &str = "acme-old-town";
pub const FOREIGN_OUTLET: &str = "globex-harbour";

pub const CASHIER: &str = "cashier-ana";
pub const MANAGER: &str = "manager-budi";

pub fn staff() -> RequestContext {
    RequestContext::staff(COMPANY, CASHIER)
}

pub fn manager() -> RequestContext {
    RequestContext::staff(COMPANY, MANAGER)
}

pub fn guest() -> RequestContext {
    RequestContext::guest(COMPANY)
}

pub fn outsider() -> RequestContext {
    RequestContext::staff(OTHER_COMPANY, "cashier-zed")
}

/// A small menu:
/// * `nasi-goreng` at 20000, variant `large` (+5000), offers the `egg` (3000) and `satay` (7000) addons
/// * `es-teh` at 5000, no variants or addons
/// * `seasonal-soup`, inactive
/// * `cheese` is an addon that exists but is switched off
pub fn seeded_catalog() -> InMemoryCatalog {
    let catalog = InMemoryCatalog::new();
    catalog.upsert_menu_item(
        MenuItem::new("nasi-goreng", "Nasi Goreng", Money::from(20_000))
            .with_variant("large", Money::from(5_000))
            .with_addon("egg")
            .with_addon("satay")
            .with_addon("cheese"),
    );
    catalog.upsert_menu_item(MenuItem::new("es-teh", "Es Teh", Money::from(5_000)));
    catalog.upsert_menu_item(MenuItem::new("seasonal-soup", "Seasonal Soup", Money::from(15_000)).inactive());
    catalog.upsert_addon(Addon::new("egg", "Fried egg", Money::from(3_000)));
    catalog.upsert_addon(Addon::new("satay", "Satay skewers", Money::from(7_000)));
    let mut cheese = Addon::new("cheese", "Cheese", Money::from(2_000));
    cheese.is_active = false;
    catalog.upsert_addon(cheese);

    let full_service = OutletSettings {
        tax_rate: Rate::from_percent(10).unwrap(),
        service_rate: Rate::from_percent(5).unwrap(),
        rounding: RoundingMode::Nearest1000,
        enabled_payment_methods: vec![PaymentMethod::Cash, PaymentMethod::Transfer, PaymentMethod::Qr],
    };
    catalog.upsert_outlet(Outlet {
        id: OUTLET.into(),
        company_id: COMPANY.into(),
        is_active: true,
        settings: full_service.clone(),
    });
    catalog.upsert_outlet(Outlet {
        id: KIOSK.into(),
        company_id: COMPANY.into(),
        is_active: true,
        settings: OutletSettings::default(),
    });
    catalog.upsert_outlet(Outlet {
        id: CLOSED_OUTLET.into(),
        company_id: COMPANY.into(),
        is_active: false,
        settings: full_service.clone(),
    });
    catalog.upsert_outlet(Outlet {
        id: FOREIGN_OUTLET.into(),
        company_id: OTHER_COMPANY.into(),
        is_active: true,
        settings: full_service,
    });
    catalog
}

#[derive(Debug)]
pub struct TestSystem {
    pub db: SqliteDatabase,
    pub catalog: InMemoryCatalog,
    pub audit: MemoryAuditSink,
    pub engine: PosEngine<SqliteDatabase, InMemoryCatalog>,
}

impl TestSystem {
    pub async fn new() -> Self {
        Self::with_options(EngineConfig::default(), EventHooks::default()).await
    }

    pub async fn strict() -> Self {
        Self::with_options(EngineConfig::default().with_strict_transitions(true), EventHooks::default()).await
    }

    pub async fn with_options(config: EngineConfig, hooks: EventHooks) -> Self {
        let config = EngineConfig { database_url: random_db_path(), max_connections: 5, ..config };
        prepare_test_env(&config).await;
        let catalog = seeded_catalog();
        let audit = MemoryAuditSink::new();
        let engine = PosEngine::connect(config, catalog.clone(), hooks, audit.clone())
            .await
            .expect("Error starting the engine");
        let db = engine.orders().db().clone();
        Self { db, catalog, audit, engine }
    }

    pub async fn tear_down(self) {
        tear_down(&self.db).await;
    }
}
