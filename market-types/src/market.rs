use chrono::{NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::MarketStatus;

/// Market metadata as supplied by the market directory. The engine reads
/// `status`, `liquidity_b` and `market_expiry`; the rest is display data.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Market {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub status: MarketStatus,
    /// Liquidity parameter of the market
    ///
    /// The higher `b` = more liquidity, slower price changes
    pub liquidity_b: Decimal,
    pub market_expiry: NaiveDateTime,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Market {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        liquidity_b: Decimal,
        market_expiry: NaiveDateTime,
    ) -> Self {
        let now = Utc::now().naive_utc();
        Market {
            id: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
            status: MarketStatus::OPEN,
            liquidity_b,
            market_expiry,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_expired(&self, now: NaiveDateTime) -> bool {
        now >= self.market_expiry
    }

    pub fn is_open(&self, now: NaiveDateTime) -> bool {
        self.status == MarketStatus::OPEN && !self.is_expired(now)
    }
}
