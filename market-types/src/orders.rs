use chrono::{NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{OrderSide, OrderStatus, OrderType, Outcome};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub market_id: Uuid,
    pub side: OrderSide,
    pub outcome: Outcome,
    pub price: Decimal,
    pub quantity: Decimal,
    pub filled_quantity: Decimal,
    pub status: OrderStatus,
    pub order_type: OrderType,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Order {
    pub fn new_limit(
        user_id: Uuid,
        market_id: Uuid,
        outcome: Outcome,
        side: OrderSide,
        price: Decimal,
        quantity: Decimal,
    ) -> Self {
        let now = Utc::now().naive_utc();
        Order {
            id: Uuid::new_v4(),
            user_id,
            market_id,
            side,
            outcome,
            price,
            quantity,
            filled_quantity: Decimal::ZERO,
            status: OrderStatus::OPEN,
            order_type: OrderType::LIMIT,
            created_at: now,
            updated_at: now,
        }
    }

    /// Market orders carry no price; they take whatever the opposite side offers.
    pub fn new_market(
        user_id: Uuid,
        market_id: Uuid,
        outcome: Outcome,
        side: OrderSide,
        quantity: Decimal,
    ) -> Self {
        let now = Utc::now().naive_utc();
        Order {
            id: Uuid::new_v4(),
            user_id,
            market_id,
            side,
            outcome,
            price: Decimal::ZERO,
            quantity,
            filled_quantity: Decimal::ZERO,
            status: OrderStatus::OPEN,
            order_type: OrderType::MARKET,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn remaining_quantity(&self) -> Decimal {
        self.quantity - self.filled_quantity
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Records a fill and derives the resulting status.
    pub fn apply_fill(&mut self, quantity: Decimal) {
        self.filled_quantity += quantity;
        self.status = if self.filled_quantity >= self.quantity {
            OrderStatus::FILLED
        } else {
            OrderStatus::PartiallyFilled
        };
        self.updated_at = Utc::now().naive_utc();
    }

    pub fn transition(&mut self, status: OrderStatus) {
        self.status = status;
        self.updated_at = Utc::now().naive_utc();
    }
}
