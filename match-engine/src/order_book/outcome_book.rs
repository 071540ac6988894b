/*
 * Prices are probabilities: every resting order must quote within (0, 1].
 * Scaling to cents/percent is the caller's concern, the book never sees it.
 *
 * ## Market order rules
 *
 * 1. Market orders cross every level until their quantity is done.
 * 2. Whatever quantity cannot be matched is discarded by the session layer.
 * 3. Market orders are never inserted into the book.
 */

use std::collections::{BTreeMap, HashMap, VecDeque};

use market_types::{
    enums::{OrderSide, OrderType},
    orders::Order,
};
use rust_decimal::Decimal;
use utility_helpers::{
    log_debug,
    types::{OrderBookDataStruct, OrderLevel},
};
use uuid::Uuid;

use crate::error::EngineError;

#[derive(Debug)]
pub(crate) struct BookEntry {
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub quantity: Decimal,
    pub filled_quantity: Decimal,
}

impl BookEntry {
    fn remaining(&self) -> Decimal {
        self.quantity - self.filled_quantity
    }
}

#[derive(Default, Debug)]
pub(crate) struct PriceLevel {
    /// Resting orders in arrival order; fills always consume from the front.
    pub orders: VecDeque<BookEntry>,
    /// Sum of the unfilled remainders in the queue.
    pub total_quantity: Decimal,
}

/// One fill produced by a matching pass. The session resolves maker ids back
/// to full orders and derives status transitions from `maker_remaining`.
#[derive(Debug)]
pub(crate) struct MatchFill {
    pub maker_order_id: Uuid,
    pub maker_user_id: Uuid,
    /// The maker's resting price; price improvement goes to the taker.
    pub price: Decimal,
    pub quantity: Decimal,
    pub maker_remaining: Decimal,
}

#[derive(Debug, Default)]
pub(crate) struct OutcomeBook {
    pub(crate) bids: BTreeMap<Decimal, PriceLevel>, // buyers side
    pub(crate) asks: BTreeMap<Decimal, PriceLevel>, // sellers side
    /// order id -> (side, price) so removal needs no caller-supplied coordinates
    resting: HashMap<Uuid, (OrderSide, Decimal)>,
}

impl OutcomeBook {
    pub(crate) fn insert(&mut self, order: &Order) -> Result<(), EngineError> {
        if order.price <= Decimal::ZERO || order.price > Decimal::ONE {
            return Err(EngineError::InvalidOrder("price must be within (0, 1]"));
        }
        if order.quantity <= Decimal::ZERO {
            return Err(EngineError::InvalidOrder("quantity must be positive"));
        }
        if order.remaining_quantity() <= Decimal::ZERO || !order.status.is_restable() {
            return Err(EngineError::InvalidOrder(
                "only working orders with open quantity may rest",
            ));
        }
        if self.resting.contains_key(&order.id) {
            return Err(EngineError::InvalidOrder("order already resting"));
        }

        let side = match order.side {
            OrderSide::BUY => &mut self.bids,
            OrderSide::SELL => &mut self.asks,
        };
        let level = side.entry(order.price).or_default();
        level.orders.push_back(BookEntry {
            order_id: order.id,
            user_id: order.user_id,
            quantity: order.quantity,
            filled_quantity: order.filled_quantity,
        });
        level.total_quantity += order.remaining_quantity();
        self.resting.insert(order.id, (order.side, order.price));
        Ok(())
    }

    pub(crate) fn remove(&mut self, order_id: Uuid) -> Result<(OrderSide, Decimal), EngineError> {
        let (side, price) = self
            .resting
            .remove(&order_id)
            .ok_or(EngineError::NotFound(order_id))?;

        let book = match side {
            OrderSide::BUY => &mut self.bids,
            OrderSide::SELL => &mut self.asks,
        };
        if let Some(level) = book.get_mut(&price) {
            if let Some(pos) = level.orders.iter().position(|o| o.order_id == order_id) {
                let entry = level.orders.remove(pos).unwrap();
                level.total_quantity -= entry.remaining();
                if level.orders.is_empty() {
                    book.remove(&price);
                }
                return Ok((side, price));
            }
        }
        // the locator claimed the order rests here but the ladder disagrees
        unreachable!("resting index out of sync for order {order_id}");
    }

    pub(crate) fn contains(&self, order_id: Uuid) -> bool {
        self.resting.contains_key(&order_id)
    }

    pub(super) fn best_bid(&self) -> Option<Decimal> {
        // keys sorted ascending, highest bid is the last one
        self.bids.keys().next_back().cloned()
    }

    pub(super) fn best_ask(&self) -> Option<Decimal> {
        self.asks.keys().next().cloned()
    }

    /// Matches `taker` against the opposite side in price-time priority and
    /// mutates both the book and the taker's fill state. Makers that reach
    /// full fill leave their level immediately; the caller owns the decision
    /// about what happens to the taker's remainder.
    pub(crate) fn match_order(
        &mut self,
        taker: &mut Order,
        prevent_self_trade: bool,
    ) -> Vec<MatchFill> {
        let mut fills = Vec::new();

        if taker.status.is_terminal() {
            return fills;
        }
        let mut remaining = taker.remaining_quantity();
        if remaining <= Decimal::ZERO {
            return fills;
        }

        let is_buy = taker.side == OrderSide::BUY;
        let resting = &mut self.resting;
        let book = if is_buy { &mut self.asks } else { &mut self.bids };

        // price levels the taker can cross, best first
        let crossable: Vec<Decimal> = if is_buy {
            book.keys()
                .filter(|p| taker.order_type == OrderType::MARKET || **p <= taker.price)
                .cloned()
                .collect()
        } else {
            book.keys()
                .rev()
                .filter(|p| taker.order_type == OrderType::MARKET || **p >= taker.price)
                .cloned()
                .collect()
        };

        for price in crossable {
            let Some(level) = book.get_mut(&price) else {
                continue;
            };

            for maker in level.orders.iter_mut() {
                if prevent_self_trade && maker.user_id == taker.user_id {
                    log_debug!(
                        "skipping maker {} owned by taker's user {}",
                        maker.order_id,
                        taker.user_id
                    );
                    continue;
                }
                let available = maker.remaining();
                if available <= Decimal::ZERO {
                    continue;
                }

                let quantity = remaining.min(available);
                maker.filled_quantity += quantity;
                taker.apply_fill(quantity);
                remaining -= quantity;

                fills.push(MatchFill {
                    maker_order_id: maker.order_id,
                    maker_user_id: maker.user_id,
                    price,
                    quantity,
                    maker_remaining: maker.remaining(),
                });

                if remaining == Decimal::ZERO {
                    break;
                }
            }

            // fully consumed makers leave the book the moment they fill
            level.orders.retain(|o| {
                if o.remaining() <= Decimal::ZERO {
                    resting.remove(&o.order_id);
                    false
                } else {
                    true
                }
            });
            level.total_quantity = level.orders.iter().map(|o| o.remaining()).sum();
            if level.orders.is_empty() {
                book.remove(&price);
            }

            if remaining == Decimal::ZERO {
                break;
            }
        }

        fills
    }

    /// Aggregated view of up to `depth` levels per side, bids descending and
    /// asks ascending. Callers hold the session lock, so the view is a single
    /// consistent point in time.
    pub(crate) fn snapshot(&self, depth: usize) -> OrderBookDataStruct {
        let level_view = |(price, level): (&Decimal, &PriceLevel)| OrderLevel {
            price: *price,
            shares: level.total_quantity,
            users: level.orders.len(),
        };

        OrderBookDataStruct {
            bids: self.bids.iter().rev().take(depth).map(level_view).collect(),
            asks: self.asks.iter().take(depth).map(level_view).collect(),
        }
    }
}

#[cfg(test)]
mod test {
    use market_types::enums::{OrderStatus, Outcome};
    use rust_decimal_macros::dec;

    use super::*;

    fn limit_order(side: OrderSide, price: Decimal, quantity: Decimal) -> Order {
        Order::new_limit(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Outcome::YES,
            side,
            price,
            quantity,
        )
    }

    #[test]
    fn test_insert_and_best_prices() {
        let mut book = OutcomeBook::default();
        let bid = limit_order(OrderSide::BUY, dec!(0.55), dec!(10));
        let ask = limit_order(OrderSide::SELL, dec!(0.60), dec!(5));

        book.insert(&bid).unwrap();
        book.insert(&ask).unwrap();

        assert_eq!(book.best_bid(), Some(dec!(0.55)));
        assert_eq!(book.best_ask(), Some(dec!(0.60)));
        assert!(book.contains(bid.id));

        let level = book.bids.get(&dec!(0.55)).unwrap();
        assert_eq!(level.total_quantity, dec!(10));
        assert_eq!(level.orders.len(), 1);
    }

    #[test]
    fn test_insert_rejects_bad_prices_and_quantities() {
        let mut book = OutcomeBook::default();

        let zero_price = limit_order(OrderSide::BUY, dec!(0), dec!(10));
        assert!(matches!(
            book.insert(&zero_price),
            Err(EngineError::InvalidOrder(_))
        ));

        let above_one = limit_order(OrderSide::BUY, dec!(1.01), dec!(10));
        assert!(matches!(
            book.insert(&above_one),
            Err(EngineError::InvalidOrder(_))
        ));

        let zero_quantity = limit_order(OrderSide::SELL, dec!(0.5), dec!(0));
        assert!(matches!(
            book.insert(&zero_quantity),
            Err(EngineError::InvalidOrder(_))
        ));

        let mut filled = limit_order(OrderSide::SELL, dec!(0.5), dec!(4));
        filled.apply_fill(dec!(4));
        assert!(matches!(
            book.insert(&filled),
            Err(EngineError::InvalidOrder(_))
        ));
    }

    #[test]
    fn test_remove_unknown_order_reports_not_found() {
        let mut book = OutcomeBook::default();
        let ghost = Uuid::new_v4();
        assert_eq!(book.remove(ghost), Err(EngineError::NotFound(ghost)));
    }

    #[test]
    fn test_remove_drops_empty_level() {
        let mut book = OutcomeBook::default();
        let order = limit_order(OrderSide::BUY, dec!(0.4), dec!(10));
        book.insert(&order).unwrap();

        let (side, price) = book.remove(order.id).unwrap();
        assert_eq!(side, OrderSide::BUY);
        assert_eq!(price, dec!(0.4));
        assert!(book.bids.is_empty());
        assert!(!book.contains(order.id));
    }

    #[test]
    fn test_match_at_maker_price() {
        let mut book = OutcomeBook::default();
        let bid = limit_order(OrderSide::BUY, dec!(0.55), dec!(10));
        book.insert(&bid).unwrap();

        // seller quotes below the bid, trade happens at the maker's 0.55
        let mut taker = limit_order(OrderSide::SELL, dec!(0.50), dec!(4));
        let fills = book.match_order(&mut taker, false);

        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].maker_order_id, bid.id);
        assert_eq!(fills[0].price, dec!(0.55));
        assert_eq!(fills[0].quantity, dec!(4));
        assert_eq!(fills[0].maker_remaining, dec!(6));

        assert_eq!(taker.status, OrderStatus::FILLED);
        assert_eq!(taker.filled_quantity, dec!(4));

        let level = book.bids.get(&dec!(0.55)).unwrap();
        assert_eq!(level.total_quantity, dec!(6));
    }

    #[test]
    fn test_no_match_when_prices_do_not_cross() {
        let mut book = OutcomeBook::default();
        let bid = limit_order(OrderSide::BUY, dec!(0.20), dec!(10));
        book.insert(&bid).unwrap();

        let mut taker = limit_order(OrderSide::SELL, dec!(0.25), dec!(10));
        let fills = book.match_order(&mut taker, false);

        assert!(fills.is_empty());
        assert_eq!(taker.status, OrderStatus::OPEN);
        assert_eq!(taker.filled_quantity, Decimal::ZERO);
    }

    #[test]
    fn test_fifo_within_a_level() {
        let mut book = OutcomeBook::default();
        let first = limit_order(OrderSide::BUY, dec!(0.60), dec!(10));
        let second = limit_order(OrderSide::BUY, dec!(0.60), dec!(10));
        book.insert(&first).unwrap();
        book.insert(&second).unwrap();

        let mut taker = limit_order(OrderSide::SELL, dec!(0.60), dec!(15));
        let fills = book.match_order(&mut taker, false);

        // first order fully consumed, second takes the remainder
        assert_eq!(fills.len(), 2);
        assert_eq!(fills[0].maker_order_id, first.id);
        assert_eq!(fills[0].quantity, dec!(10));
        assert_eq!(fills[1].maker_order_id, second.id);
        assert_eq!(fills[1].quantity, dec!(5));

        assert!(!book.contains(first.id));
        assert!(book.contains(second.id));
        let level = book.bids.get(&dec!(0.60)).unwrap();
        assert_eq!(level.orders.len(), 1);
        assert_eq!(level.orders[0].order_id, second.id);
        assert_eq!(level.total_quantity, dec!(5));
    }

    #[test]
    fn test_price_priority_across_levels() {
        let mut book = OutcomeBook::default();
        let best = limit_order(OrderSide::BUY, dec!(0.25), dec!(10));
        let worst = limit_order(OrderSide::BUY, dec!(0.20), dec!(3));
        let middle = limit_order(OrderSide::BUY, dec!(0.23), dec!(4));
        book.insert(&best).unwrap();
        book.insert(&worst).unwrap();
        book.insert(&middle).unwrap();

        let mut taker = limit_order(OrderSide::SELL, dec!(0.20), dec!(15));
        let fills = book.match_order(&mut taker, false);

        assert_eq!(taker.status, OrderStatus::FILLED);
        assert_eq!(fills.len(), 3);
        assert_eq!(fills[0].maker_order_id, best.id);
        assert_eq!(fills[1].maker_order_id, middle.id);
        assert_eq!(fills[2].maker_order_id, worst.id);

        // 15 = 10 + 4 + 1, last level keeps 2
        let level = book.bids.get(&dec!(0.20)).unwrap();
        assert_eq!(level.total_quantity, dec!(2));
    }

    #[test]
    fn test_market_taker_crosses_every_level() {
        let mut book = OutcomeBook::default();
        let cheap = limit_order(OrderSide::SELL, dec!(0.60), dec!(5));
        let expensive = limit_order(OrderSide::SELL, dec!(0.62), dec!(10));
        book.insert(&cheap).unwrap();
        book.insert(&expensive).unwrap();

        let mut taker = Order::new_market(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Outcome::YES,
            OrderSide::BUY,
            dec!(20),
        );
        let fills = book.match_order(&mut taker, false);

        assert_eq!(fills.len(), 2);
        assert_eq!(fills[0].price, dec!(0.60));
        assert_eq!(fills[0].quantity, dec!(5));
        assert_eq!(fills[1].price, dec!(0.62));
        assert_eq!(fills[1].quantity, dec!(10));

        // 5 of 20 could not be matched; the session layer discards it
        assert_eq!(taker.filled_quantity, dec!(15));
        assert_eq!(taker.remaining_quantity(), dec!(5));
        assert!(book.asks.is_empty());
    }

    #[test]
    fn test_self_trade_filter_skips_own_orders() {
        let user_id = Uuid::new_v4();
        let market_id = Uuid::new_v4();

        let mut book = OutcomeBook::default();
        let own_ask = Order::new_limit(
            user_id,
            market_id,
            Outcome::YES,
            OrderSide::SELL,
            dec!(0.50),
            dec!(10),
        );
        book.insert(&own_ask).unwrap();

        let mut taker = Order::new_limit(
            user_id,
            market_id,
            Outcome::YES,
            OrderSide::BUY,
            dec!(0.55),
            dec!(5),
        );

        // filter on: the user's own ask is untouchable
        let fills = book.match_order(&mut taker, true);
        assert!(fills.is_empty());
        assert_eq!(taker.status, OrderStatus::OPEN);
        assert!(book.contains(own_ask.id));

        // filter off: the core design allows the self-trade
        let fills = book.match_order(&mut taker, false);
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].maker_user_id, user_id);
    }

    #[test]
    fn test_partially_filled_maker_keeps_queue_head() {
        let mut book = OutcomeBook::default();
        let head = limit_order(OrderSide::SELL, dec!(0.30), dec!(10));
        let tail = limit_order(OrderSide::SELL, dec!(0.30), dec!(10));
        book.insert(&head).unwrap();
        book.insert(&tail).unwrap();

        let mut first_taker = limit_order(OrderSide::BUY, dec!(0.30), dec!(4));
        book.match_order(&mut first_taker, false);

        // the partially filled head keeps priority for the next taker
        let mut second_taker = limit_order(OrderSide::BUY, dec!(0.30), dec!(6));
        let fills = book.match_order(&mut second_taker, false);
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].maker_order_id, head.id);
        assert!(!book.contains(head.id));
        assert!(book.contains(tail.id));
    }

    #[test]
    fn test_snapshot_depth_and_ordering() {
        let mut book = OutcomeBook::default();
        for (price, quantity) in [(dec!(0.40), dec!(5)), (dec!(0.45), dec!(2)), (dec!(0.35), dec!(7))] {
            book.insert(&limit_order(OrderSide::BUY, price, quantity)).unwrap();
        }
        for (price, quantity) in [(dec!(0.60), dec!(4)), (dec!(0.55), dec!(1))] {
            book.insert(&limit_order(OrderSide::SELL, price, quantity)).unwrap();
        }

        let snapshot = book.snapshot(2);

        // bids descending, asks ascending, both truncated to the depth
        assert_eq!(snapshot.bids.len(), 2);
        assert_eq!(snapshot.bids[0].price, dec!(0.45));
        assert_eq!(snapshot.bids[1].price, dec!(0.40));
        assert_eq!(snapshot.asks.len(), 2);
        assert_eq!(snapshot.asks[0].price, dec!(0.55));
        assert_eq!(snapshot.asks[1].price, dec!(0.60));
        assert_eq!(snapshot.asks[1].shares, dec!(4));
        assert_eq!(snapshot.asks[1].users, 1);
    }

    #[test]
    fn test_book_never_stays_crossed_after_a_pass() {
        let mut book = OutcomeBook::default();
        book.insert(&limit_order(OrderSide::BUY, dec!(0.50), dec!(5))).unwrap();
        book.insert(&limit_order(OrderSide::BUY, dec!(0.45), dec!(5))).unwrap();
        book.insert(&limit_order(OrderSide::SELL, dec!(0.60), dec!(5))).unwrap();

        // crossing seller sweeps the 0.50 bid, remainder rests at 0.48
        let mut taker = limit_order(OrderSide::SELL, dec!(0.48), dec!(8));
        book.match_order(&mut taker, false);
        if taker.remaining_quantity() > Decimal::ZERO {
            book.insert(&taker).unwrap();
        }

        let (best_bid, best_ask) = (book.best_bid().unwrap(), book.best_ask().unwrap());
        assert!(best_bid < best_ask, "book crossed: {best_bid} >= {best_ask}");
        assert_eq!(best_bid, dec!(0.45));
        assert_eq!(best_ask, dec!(0.48));
    }
}
