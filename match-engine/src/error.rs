use market_types::enums::OrderStatus;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// Every failure a caller can provoke. Book-structural inconsistencies are
/// not represented here; those panic the market's mutation path instead of
/// being handed back as recoverable errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("invalid order: {0}")]
    InvalidOrder(&'static str),

    #[error("order {0} not found")]
    NotFound(Uuid),

    #[error("order does not belong to the requesting user")]
    Forbidden,

    #[error("order is already terminal ({0:?})")]
    AlreadyTerminal(OrderStatus),

    /// The market order consumed everything it could; the unfilled remainder
    /// was discarded. Fills up to `filled` are committed.
    #[error("insufficient liquidity for order {order_id}: filled {filled} of {requested}")]
    InsufficientLiquidity {
        order_id: Uuid,
        filled: Decimal,
        requested: Decimal,
    },

    #[error("market {0} is closed for trading")]
    MarketClosed(Uuid),
}
