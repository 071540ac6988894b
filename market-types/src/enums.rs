use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarketStatus {
    #[default]
    #[serde(rename = "open")]
    OPEN,
    #[serde(rename = "closed")]
    CLOSED,
    #[serde(rename = "settled")]
    SETTLED,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    #[serde(rename = "yes")]
    YES,
    #[serde(rename = "no")]
    NO,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderSide {
    #[serde(rename = "buy")]
    BUY, // bids
    #[serde(rename = "sell")]
    SELL, // asks
}

impl OrderSide {
    pub fn opposite(&self) -> OrderSide {
        match self {
            OrderSide::BUY => OrderSide::SELL,
            OrderSide::SELL => OrderSide::BUY,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    #[serde(rename = "open")]
    OPEN,
    #[serde(rename = "partially_filled")]
    PartiallyFilled,
    #[serde(rename = "filled")]
    FILLED,
    #[serde(rename = "cancelled")]
    CANCELLED,
    #[serde(rename = "expired")]
    EXPIRED,
    #[serde(rename = "pending_update")]
    PendingUpdate,
    #[serde(rename = "pending_cancel")]
    PendingCancel,
}

impl OrderStatus {
    /// Terminal orders are immutable; no command may move them again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::FILLED | OrderStatus::CANCELLED | OrderStatus::EXPIRED
        )
    }

    /// Statuses allowed to rest inside a price level.
    pub fn is_restable(&self) -> bool {
        matches!(
            self,
            OrderStatus::OPEN | OrderStatus::PartiallyFilled | OrderStatus::PendingCancel
        )
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderType {
    #[default]
    #[serde(rename = "limit")]
    LIMIT,
    #[serde(rename = "market")]
    MARKET,
}
