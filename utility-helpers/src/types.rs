use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::env::var;

/// Engine tunables, read from the environment. Every knob has a default so a
/// bare environment still produces a working engine.
#[derive(Debug, Clone)]
pub struct EnvVarConfig {
    /// Hard cap applied to order book snapshot depth requests.
    pub max_book_depth: usize,
    /// Page size used when a caller passes 0.
    pub default_page_size: u64,
    /// Capacity of the broadcast channel carrying market events.
    pub event_channel_capacity: usize,
    pub expiry_sweep_interval_secs: u64,
    /// When set, the match loop skips makers owned by the taker's user.
    pub prevent_self_trade: bool,
}

impl EnvVarConfig {
    pub fn new() -> Self {
        dotenv::dotenv().ok();

        let max_book_depth = var("MAX_BOOK_DEPTH")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(50);
        let default_page_size = var("DEFAULT_PAGE_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(20);
        let event_channel_capacity = var("EVENT_CHANNEL_CAPACITY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(256);
        let expiry_sweep_interval_secs = var("EXPIRY_SWEEP_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30);
        let prevent_self_trade = var("PREVENT_SELF_TRADE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(false);

        EnvVarConfig {
            max_book_depth,
            default_page_size,
            event_channel_capacity,
            expiry_sweep_interval_secs,
            prevent_self_trade,
        }
    }
}

impl Default for EnvVarConfig {
    fn default() -> Self {
        EnvVarConfig {
            max_book_depth: 50,
            default_page_size: 20,
            event_channel_capacity: 256,
            expiry_sweep_interval_secs: 30,
            prevent_self_trade: false,
        }
    }
}

/**
 *
 * Order book helper types
 *
*/

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OrderLevel {
    pub price: Decimal,
    pub shares: Decimal,
    pub users: usize,
}

#[derive(Serialize, Default, Deserialize, Clone, Debug, PartialEq)]
pub struct OrderBookDataStruct {
    pub bids: Vec<OrderLevel>,
    pub asks: Vec<OrderLevel>,
}
