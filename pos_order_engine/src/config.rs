use std::{env, fmt::Display, str::FromStr};

use log::*;
use pos_common::helpers::{parse_boolean_flag, parse_number};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/pos_store.db";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_ORDER_CODE_RETRIES: usize = 8;
const DEFAULT_HOOK_BUFFER_SIZE: usize = 25;
const DEFAULT_SESSION_BUFFER_SIZE: usize = 64;
const DEFAULT_PAGE_SIZE: u32 = 20;
const DEFAULT_MAX_PAGE_SIZE: u32 = 100;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    pub database_url: String,
    pub max_connections: u32,
    /// How many times order creation draws a fresh order code after a collision before giving up.
    pub order_code_retries: usize,
    /// Queue depth for each lifecycle hook and for the audit worker.
    pub hook_buffer_size: usize,
    /// Queue depth for each connected fan-out session. Slow sessions miss events once their queue is full.
    pub session_buffer_size: usize,
    /// When true, order status updates must move forward through the kitchen pipeline (or to `CANCELLED`), and
    /// terminal orders are frozen. When false, any status may be set at any time.
    pub strict_transitions: bool,
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            order_code_retries: DEFAULT_ORDER_CODE_RETRIES,
            hook_buffer_size: DEFAULT_HOOK_BUFFER_SIZE,
            session_buffer_size: DEFAULT_SESSION_BUFFER_SIZE,
            strict_transitions: false,
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }
}

impl EngineConfig {
    pub fn new(database_url: &str) -> Self {
        Self { database_url: database_url.to_string(), ..Default::default() }
    }

    pub fn with_strict_transitions(mut self, strict: bool) -> Self {
        self.strict_transitions = strict;
        self
    }

    /// Reads the configuration from `POS_*` environment variables (after loading a `.env` file, if present). Missing
    /// or malformed values fall back to their defaults with a warning.
    pub fn from_env_or_default() -> Self {
        dotenvy::dotenv().ok();
        let database_url = env::var("POS_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ POS_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let max_connections = number_from_env("POS_DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS);
        let order_code_retries = number_from_env("POS_ORDER_CODE_RETRIES", DEFAULT_ORDER_CODE_RETRIES);
        let hook_buffer_size = number_from_env("POS_HOOK_BUFFER_SIZE", DEFAULT_HOOK_BUFFER_SIZE);
        let session_buffer_size = number_from_env("POS_SESSION_BUFFER_SIZE", DEFAULT_SESSION_BUFFER_SIZE);
        let strict_transitions = parse_boolean_flag(env::var("POS_STRICT_TRANSITIONS").ok(), false);
        let default_page_size = number_from_env("POS_DEFAULT_PAGE_SIZE", DEFAULT_PAGE_SIZE);
        let mut max_page_size = number_from_env("POS_MAX_PAGE_SIZE", DEFAULT_MAX_PAGE_SIZE);
        if max_page_size < default_page_size {
            warn!(
                "🪛️ POS_MAX_PAGE_SIZE ({max_page_size}) is smaller than POS_DEFAULT_PAGE_SIZE \
                 ({default_page_size}). Raising the maximum to match."
            );
            max_page_size = default_page_size;
        }
        let config = Self {
            database_url,
            max_connections,
            order_code_retries,
            hook_buffer_size,
            session_buffer_size,
            strict_transitions,
            default_page_size,
            max_page_size,
        };
        debug!("🪛️ Engine configuration: {config:?}");
        config
    }
}

fn number_from_env<T>(key: &str, default: T) -> T
where
    T: FromStr + Display + Copy + PartialOrd + Default,
{
    let raw = env::var(key).ok();
    match (raw.as_deref(), parse_number::<T>(raw.clone())) {
        (None, _) => default,
        (Some(_), Some(v)) if v > T::default() => v,
        (Some(s), _) => {
            warn!("🪛️ {s} is not a valid value for {key}. Using the default, {default}, instead.");
            default
        },
    }
}
