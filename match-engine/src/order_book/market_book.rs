use market_types::{enums::Outcome, orders::Order};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use utility_helpers::types::OrderBookDataStruct;
use uuid::Uuid;

use crate::error::EngineError;

use super::outcome_book::{MatchFill, OutcomeBook};

/// Both outcome ladders of one market plus the derived market prices.
#[derive(Debug)]
pub(crate) struct MarketBook {
    yes_order_book: OutcomeBook,
    no_order_book: OutcomeBook,

    executed_yes_buy_volume: Decimal,
    executed_no_buy_volume: Decimal,

    pub(crate) current_yes_price: Decimal,
    pub(crate) current_no_price: Decimal,

    liquidity_b: Decimal,
}

impl MarketBook {
    pub(crate) fn new(liquidity_b: Decimal) -> Self {
        Self {
            yes_order_book: OutcomeBook::default(),
            no_order_book: OutcomeBook::default(),

            executed_yes_buy_volume: Decimal::ZERO,
            executed_no_buy_volume: Decimal::ZERO,

            current_yes_price: dec!(0.5),
            current_no_price: dec!(0.5),
            liquidity_b,
        }
    }

    fn book(&self, outcome: Outcome) -> &OutcomeBook {
        match outcome {
            Outcome::YES => &self.yes_order_book,
            Outcome::NO => &self.no_order_book,
        }
    }

    fn book_mut(&mut self, outcome: Outcome) -> &mut OutcomeBook {
        match outcome {
            Outcome::YES => &mut self.yes_order_book,
            Outcome::NO => &mut self.no_order_book,
        }
    }

    pub(crate) fn insert_order(&mut self, order: &Order) -> Result<(), EngineError> {
        self.book_mut(order.outcome).insert(order)?;
        self.update_market_price();
        Ok(())
    }

    pub(crate) fn match_order(
        &mut self,
        taker: &mut Order,
        prevent_self_trade: bool,
    ) -> Vec<MatchFill> {
        let outcome = taker.outcome;
        let fills = self.book_mut(outcome).match_order(taker, prevent_self_trade);

        if !fills.is_empty() {
            // every fill has exactly one buying party; its spend feeds the
            // LMSR funds for this outcome
            let executed_value = fills
                .iter()
                .map(|f| f.price * f.quantity)
                .sum::<Decimal>();
            match outcome {
                Outcome::YES => self.executed_yes_buy_volume += executed_value,
                Outcome::NO => self.executed_no_buy_volume += executed_value,
            }
        }

        self.update_market_price();
        fills
    }

    pub(crate) fn remove_order(
        &mut self,
        order_id: Uuid,
        outcome: Outcome,
    ) -> Result<(), EngineError> {
        self.book_mut(outcome).remove(order_id)?;
        self.update_market_price();
        Ok(())
    }

    pub(crate) fn contains(&self, order_id: Uuid, outcome: Outcome) -> bool {
        self.book(outcome).contains(order_id)
    }

    pub(crate) fn snapshot(&self, outcome: Outcome, depth: usize) -> OrderBookDataStruct {
        self.book(outcome).snapshot(depth)
    }

    ///// Helpers //////

    /// LMSR-weighted prices when the market carries liquidity, midpoint
    /// blending otherwise. See
    /// https://www.cultivatelabs.com/crowdsourced-forecasting-guide/how-does-logarithmic-market-scoring-rule-lmsr-work
    fn update_market_price(&mut self) {
        if self.liquidity_b > Decimal::ZERO {
            let funds_yes = self.calculate_total_funds(Outcome::YES);
            let funds_no = self.calculate_total_funds(Outcome::NO);

            let total_liquidity = self.liquidity_b * dec!(2); // b on both sides
            let total_funds = funds_yes + funds_no;

            if total_funds > Decimal::ZERO {
                let yes_weight = (self.liquidity_b + funds_yes) / (total_liquidity + total_funds);
                let no_weight = (self.liquidity_b + funds_no) / (total_liquidity + total_funds);

                let total_weight = yes_weight + no_weight;
                self.current_yes_price = yes_weight / total_weight;
                self.current_no_price = no_weight / total_weight;
            } else {
                self.current_yes_price = dec!(0.5);
                self.current_no_price = dec!(0.5);
            }
        } else {
            let yes_mid = Self::midpoint(&self.yes_order_book);
            let no_mid = Self::midpoint(&self.no_order_book);

            match (yes_mid, no_mid) {
                (Some(yes_price), Some(no_price)) => {
                    let total = yes_price + no_price;
                    if total > Decimal::ZERO {
                        self.current_yes_price = yes_price / total;
                        self.current_no_price = no_price / total;
                    } else {
                        self.current_yes_price = dec!(0.5);
                        self.current_no_price = dec!(0.5);
                    }
                }
                (Some(yes_price), None) => {
                    self.current_yes_price = yes_price.min(dec!(0.95)); // cap at 0.95
                    self.current_no_price = dec!(1) - self.current_yes_price;
                }
                (None, Some(no_price)) => {
                    self.current_no_price = no_price.min(dec!(0.95)); // cap at 0.95
                    self.current_yes_price = dec!(1) - self.current_no_price;
                }
                (None, None) => {
                    self.current_yes_price = dec!(0.5);
                    self.current_no_price = dec!(0.5);
                }
            }
        }
    }

    fn calculate_total_funds(&self, outcome: Outcome) -> Decimal {
        // buyers put money in, sellers put shares; funds = the bid side
        let book_funds: Decimal = self
            .book(outcome)
            .bids
            .iter()
            .map(|(price, level)| *price * level.total_quantity)
            .sum();

        let executed_funds = match outcome {
            Outcome::YES => self.executed_yes_buy_volume,
            Outcome::NO => self.executed_no_buy_volume,
        };

        book_funds + executed_funds
    }

    fn midpoint(order_book: &OutcomeBook) -> Option<Decimal> {
        match (order_book.best_bid(), order_book.best_ask()) {
            (Some(bid), Some(ask)) => Some((bid + ask) / dec!(2)),
            (Some(bid), None) => Some(bid),
            (None, Some(ask)) => Some(ask),
            (None, None) => None,
        }
    }
}

#[cfg(test)]
mod test {
    use market_types::enums::{OrderSide, OrderStatus};
    use rust_decimal_macros::dec;

    use super::*;

    fn order(outcome: Outcome, side: OrderSide, price: Decimal, quantity: Decimal) -> Order {
        Order::new_limit(Uuid::new_v4(), Uuid::new_v4(), outcome, side, price, quantity)
    }

    #[test]
    fn test_new_market_book_starts_at_even_odds() {
        let book = MarketBook::new(dec!(100));
        assert_eq!(book.current_yes_price, dec!(0.5));
        assert_eq!(book.current_no_price, dec!(0.5));
        assert!(book.yes_order_book.bids.is_empty());
        assert!(book.no_order_book.asks.is_empty());
    }

    #[test]
    fn test_outcomes_route_to_their_own_ladder() {
        let mut book = MarketBook::new(dec!(100));
        let yes_bid = order(Outcome::YES, OrderSide::BUY, dec!(0.4), dec!(5));
        let no_bid = order(Outcome::NO, OrderSide::BUY, dec!(0.3), dec!(7));

        book.insert_order(&yes_bid).unwrap();
        book.insert_order(&no_bid).unwrap();

        assert!(book.contains(yes_bid.id, Outcome::YES));
        assert!(!book.contains(yes_bid.id, Outcome::NO));

        let yes_view = book.snapshot(Outcome::YES, 10);
        assert_eq!(yes_view.bids.len(), 1);
        assert_eq!(yes_view.bids[0].price, dec!(0.4));

        let no_view = book.snapshot(Outcome::NO, 10);
        assert_eq!(no_view.bids[0].shares, dec!(7));
    }

    #[test]
    fn test_lmsr_price_skews_toward_funded_side() {
        let mut book = MarketBook::new(dec!(100));
        assert_eq!(book.current_yes_price, dec!(0.5));

        book.insert_order(&order(Outcome::YES, OrderSide::BUY, dec!(0.5), dec!(10)))
            .unwrap();
        assert!(book.current_yes_price > dec!(0.5));
        assert!(book.current_no_price < dec!(0.5));
        // binary market prices stay complementary (modulo division rounding)
        let drift = book.current_yes_price + book.current_no_price - dec!(1);
        assert!(drift.abs() < dec!(0.000001), "price drift {drift}");
    }

    #[test]
    fn test_midpoint_pricing_without_liquidity() {
        let mut book = MarketBook::new(Decimal::ZERO);
        book.insert_order(&order(Outcome::YES, OrderSide::BUY, dec!(0.4), dec!(5)))
            .unwrap();
        book.insert_order(&order(Outcome::YES, OrderSide::SELL, dec!(0.6), dec!(5)))
            .unwrap();

        // one-sided NO book leaves YES at its own midpoint
        assert_eq!(book.current_yes_price, dec!(0.5));
        assert_eq!(book.current_no_price, dec!(0.5));
    }

    #[test]
    fn test_match_accumulates_executed_volume() {
        let mut book = MarketBook::new(dec!(100));
        book.insert_order(&order(Outcome::YES, OrderSide::SELL, dec!(0.3), dec!(10)))
            .unwrap();

        let mut taker = order(Outcome::YES, OrderSide::BUY, dec!(0.3), dec!(5));
        let fills = book.match_order(&mut taker, false);

        assert_eq!(fills.len(), 1);
        assert_eq!(taker.status, OrderStatus::FILLED);
        assert_eq!(book.executed_yes_buy_volume, dec!(1.5)); // 0.3 * 5
        assert_eq!(book.executed_no_buy_volume, Decimal::ZERO);
    }

    #[test]
    fn test_remove_order_updates_prices() {
        let mut book = MarketBook::new(dec!(100));
        let bid = order(Outcome::YES, OrderSide::BUY, dec!(0.5), dec!(10));
        book.insert_order(&bid).unwrap();
        let skewed = book.current_yes_price;
        assert!(skewed > dec!(0.5));

        book.remove_order(bid.id, Outcome::YES).unwrap();
        assert_eq!(book.current_yes_price, dec!(0.5));
        assert!(!book.contains(bid.id, Outcome::YES));
    }
}
