use chrono::{NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{OrderSide, Outcome};

/// A fill between one resting (maker) order and one incoming (taker) order.
/// Trades are append-only; nothing mutates them after creation.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Trade {
    pub id: Uuid,
    pub market_id: Uuid,
    pub outcome: Outcome,
    pub maker_order_id: Uuid,
    pub taker_order_id: Uuid,
    pub maker_user_id: Uuid,
    pub taker_user_id: Uuid,
    /// Side of the aggressing (taker) order.
    pub taker_side: OrderSide,
    /// Always the maker's resting price; price improvement goes to the taker.
    pub price: Decimal,
    pub quantity: Decimal,
    pub executed_at: NaiveDateTime,
}

impl Trade {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        market_id: Uuid,
        outcome: Outcome,
        maker_order_id: Uuid,
        taker_order_id: Uuid,
        maker_user_id: Uuid,
        taker_user_id: Uuid,
        taker_side: OrderSide,
        price: Decimal,
        quantity: Decimal,
    ) -> Self {
        Trade {
            id: Uuid::new_v4(),
            market_id,
            outcome,
            maker_order_id,
            taker_order_id,
            maker_user_id,
            taker_user_id,
            taker_side,
            price,
            quantity,
            executed_at: Utc::now().naive_utc(),
        }
    }
}
