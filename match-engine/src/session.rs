use std::collections::HashMap;

use chrono::{NaiveDateTime, Utc};
use market_types::{
    enums::{OrderSide, OrderStatus, OrderType, Outcome},
    market::Market,
    orders::Order,
    trades::Trade,
};
use rust_decimal::Decimal;
use utility_helpers::{log_info, log_warn, types::OrderBookDataStruct};
use uuid::Uuid;

use crate::{
    error::EngineError,
    events::{BookDeltaData, MarketEvent},
    order_book::{market_book::MarketBook, outcome_book::MatchFill},
};

/// Exclusive owner of one market's books, order table and trade log. Every
/// mutating call commits book state, order statuses and trade records as one
/// step; the produced events are handed back so the engine can publish them
/// after releasing the session lock.
pub(crate) struct MarketSession {
    market: Market,
    book: MarketBook,
    orders: HashMap<Uuid, Order>,
    trades: Vec<Trade>,
}

impl MarketSession {
    pub(crate) fn new(market: Market) -> Self {
        let liquidity_b = market.liquidity_b;
        MarketSession {
            market,
            book: MarketBook::new(liquidity_b),
            orders: HashMap::new(),
            trades: Vec::new(),
        }
    }

    pub(crate) fn market(&self) -> &Market {
        &self.market
    }

    pub(crate) fn order(&self, order_id: Uuid) -> Option<&Order> {
        self.orders.get(&order_id)
    }

    pub(crate) fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub(crate) fn current_price(&self, outcome: Outcome) -> Decimal {
        match outcome {
            Outcome::YES => self.book.current_yes_price,
            Outcome::NO => self.book.current_no_price,
        }
    }

    /// Places a new order and runs the matching pass. For market orders an
    /// unmatched remainder is discarded and reported as
    /// `InsufficientLiquidity`; the fills that did happen stay committed.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn place_order(
        &mut self,
        user_id: Uuid,
        outcome: Outcome,
        side: OrderSide,
        order_type: OrderType,
        price: Decimal,
        quantity: Decimal,
        prevent_self_trade: bool,
        events: &mut Vec<MarketEvent>,
    ) -> Result<Uuid, EngineError> {
        let now = Utc::now().naive_utc();
        if !self.market.is_open(now) {
            return Err(EngineError::MarketClosed(self.market.id));
        }
        if quantity <= Decimal::ZERO {
            return Err(EngineError::InvalidOrder("quantity must be positive"));
        }
        if order_type == OrderType::LIMIT && (price <= Decimal::ZERO || price > Decimal::ONE) {
            return Err(EngineError::InvalidOrder("price must be within (0, 1]"));
        }

        let mut order = match order_type {
            OrderType::LIMIT => {
                Order::new_limit(user_id, self.market.id, outcome, side, price, quantity)
            }
            OrderType::MARKET => Order::new_market(user_id, self.market.id, outcome, side, quantity),
        };
        let order_id = order.id;

        let fills = self.book.match_order(&mut order, prevent_self_trade);
        self.apply_fills(&order, &fills, events);

        let mut result = Ok(order_id);
        if order.remaining_quantity() > Decimal::ZERO {
            match order_type {
                OrderType::LIMIT => {
                    // remainder becomes a resting maker at the taker's price
                    self.book.insert_order(&order)?;
                }
                OrderType::MARKET => {
                    log_info!(
                        "market order {} short by {} units, discarding remainder",
                        order_id,
                        order.remaining_quantity()
                    );
                    result = Err(EngineError::InsufficientLiquidity {
                        order_id,
                        filled: order.filled_quantity,
                        requested: order.quantity,
                    });
                    order.transition(OrderStatus::CANCELLED);
                }
            }
        }

        events.push(Self::status_event(&order));
        self.push_book_delta(events);
        self.orders.insert(order_id, order);

        result
    }

    /// Re-inserts a previously accepted order, e.g. when the engine is
    /// rebuilding its books at startup. The order keeps its identity and fill
    /// state but goes through a fresh matching pass.
    pub(crate) fn restore_order(
        &mut self,
        mut order: Order,
        prevent_self_trade: bool,
        events: &mut Vec<MarketEvent>,
    ) -> Result<(), EngineError> {
        if order.is_terminal() {
            return Err(EngineError::AlreadyTerminal(order.status));
        }
        if order.order_type == OrderType::MARKET {
            return Err(EngineError::InvalidOrder("market orders never rest"));
        }

        // a restored pending state collapses back to its working status
        order.status = if order.filled_quantity > Decimal::ZERO {
            OrderStatus::PartiallyFilled
        } else {
            OrderStatus::OPEN
        };

        let fills = self.book.match_order(&mut order, prevent_self_trade);
        self.apply_fills(&order, &fills, events);
        if order.remaining_quantity() > Decimal::ZERO {
            self.book.insert_order(&order)?;
        }

        events.push(Self::status_event(&order));
        self.push_book_delta(events);
        self.orders.insert(order.id, order);
        Ok(())
    }

    pub(crate) fn cancel_order(
        &mut self,
        order_id: Uuid,
        requesting_user: Uuid,
        events: &mut Vec<MarketEvent>,
    ) -> Result<(), EngineError> {
        let (outcome, owner, status) = {
            let order = self
                .orders
                .get(&order_id)
                .ok_or(EngineError::NotFound(order_id))?;
            (order.outcome, order.user_id, order.status)
        };
        if owner != requesting_user {
            return Err(EngineError::Forbidden);
        }
        if status.is_terminal() {
            return Err(EngineError::AlreadyTerminal(status));
        }

        // a non-terminal order is always resting; anything else is corruption
        self.book
            .remove_order(order_id, outcome)
            .unwrap_or_else(|_| panic!("working order {order_id} missing from the book"));

        let order = self.orders.get_mut(&order_id).unwrap();
        order.transition(OrderStatus::CANCELLED);
        log_info!("Order cancelled - {:?}", order_id);

        events.push(Self::status_event(order));
        self.push_book_delta(events);
        Ok(())
    }

    /// Cancel-then-replace: the order leaves its level, re-matches at the new
    /// price (which may now cross) and any remainder re-enters at the tail of
    /// the new level. Original time priority is always lost.
    pub(crate) fn update_order(
        &mut self,
        order_id: Uuid,
        requesting_user: Uuid,
        new_price: Decimal,
        new_quantity: Decimal,
        prevent_self_trade: bool,
        events: &mut Vec<MarketEvent>,
    ) -> Result<(), EngineError> {
        let now = Utc::now().naive_utc();
        if !self.market.is_open(now) {
            return Err(EngineError::MarketClosed(self.market.id));
        }

        let (outcome, owner, status, filled_quantity) = {
            let order = self
                .orders
                .get(&order_id)
                .ok_or(EngineError::NotFound(order_id))?;
            (
                order.outcome,
                order.user_id,
                order.status,
                order.filled_quantity,
            )
        };
        if owner != requesting_user {
            return Err(EngineError::Forbidden);
        }
        if status.is_terminal() {
            return Err(EngineError::AlreadyTerminal(status));
        }
        if new_price <= Decimal::ZERO || new_price > Decimal::ONE {
            return Err(EngineError::InvalidOrder("price must be within (0, 1]"));
        }
        if new_quantity <= Decimal::ZERO {
            return Err(EngineError::InvalidOrder("quantity must be positive"));
        }
        if new_quantity < filled_quantity {
            return Err(EngineError::InvalidOrder(
                "new quantity cannot undercut the filled quantity",
            ));
        }

        self.book
            .remove_order(order_id, outcome)
            .unwrap_or_else(|_| panic!("working order {order_id} missing from the book"));

        let mut order = self.orders.remove(&order_id).unwrap();
        order.price = new_price;
        order.quantity = new_quantity;
        order.transition(if order.filled_quantity > Decimal::ZERO {
            OrderStatus::PartiallyFilled
        } else {
            OrderStatus::OPEN
        });

        let fills = self.book.match_order(&mut order, prevent_self_trade);
        self.apply_fills(&order, &fills, events);

        if order.remaining_quantity() > Decimal::ZERO {
            self.book.insert_order(&order)?;
        } else if !order.is_terminal() {
            // shrinking the quantity down to the filled amount completes it
            order.transition(OrderStatus::FILLED);
        }

        events.push(Self::status_event(&order));
        self.push_book_delta(events);
        self.orders.insert(order_id, order);
        Ok(())
    }

    /// Expires every working order once the market's close time has passed.
    /// Returns the number of orders transitioned.
    pub(crate) fn expire_due(
        &mut self,
        now: NaiveDateTime,
        events: &mut Vec<MarketEvent>,
    ) -> usize {
        if !self.market.is_expired(now) {
            return 0;
        }
        self.expire_all(events)
    }

    /// Unconditional teardown: used by expiry and by market finalization.
    pub(crate) fn expire_all(&mut self, events: &mut Vec<MarketEvent>) -> usize {
        let working: Vec<Uuid> = self
            .orders
            .values()
            .filter(|o| !o.is_terminal())
            .map(|o| o.id)
            .collect();

        for order_id in &working {
            let outcome = self.orders[order_id].outcome;
            self.book
                .remove_order(*order_id, outcome)
                .unwrap_or_else(|_| panic!("working order {order_id} missing from the book"));

            let order = self.orders.get_mut(order_id).unwrap();
            order.transition(OrderStatus::EXPIRED);
            events.push(Self::status_event(order));
        }

        if !working.is_empty() {
            log_info!(
                "Expired {} working orders on market {}",
                working.len(),
                self.market.id
            );
            self.push_book_delta(events);
        }
        working.len()
    }

    pub(crate) fn snapshot(&self, outcome: Outcome, depth: usize) -> OrderBookDataStruct {
        self.book.snapshot(outcome, depth)
    }

    /// All of one user's orders on this market, newest first.
    pub(crate) fn user_orders(
        &self,
        user_id: Uuid,
        status_filter: Option<OrderStatus>,
    ) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .orders
            .values()
            .filter(|o| o.user_id == user_id)
            .filter(|o| status_filter.map_or(true, |wanted| o.status == wanted))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        orders
    }

    ///// Helpers //////

    fn apply_fills(&mut self, taker: &Order, fills: &[MatchFill], events: &mut Vec<MarketEvent>) {
        for fill in fills {
            let trade = Trade::new(
                self.market.id,
                taker.outcome,
                fill.maker_order_id,
                taker.id,
                fill.maker_user_id,
                taker.user_id,
                taker.side,
                fill.price,
                fill.quantity,
            );
            events.push(MarketEvent::Trade(trade.clone()));

            match self.orders.get_mut(&fill.maker_order_id) {
                Some(maker) => {
                    maker.apply_fill(fill.quantity);
                    events.push(Self::status_event(maker));
                }
                // restore paths may replay fills against makers the session
                // never saw; the book already accounted for them
                None => log_warn!(
                    "maker order {} not tracked by session {}",
                    fill.maker_order_id,
                    self.market.id
                ),
            }

            self.trades.push(trade);
        }
    }

    fn status_event(order: &Order) -> MarketEvent {
        MarketEvent::OrderStatusChanged {
            order_id: order.id,
            user_id: order.user_id,
            status: order.status,
            filled_quantity: order.filled_quantity,
        }
    }

    fn push_book_delta(&self, events: &mut Vec<MarketEvent>) {
        events.push(MarketEvent::BookDelta(BookDeltaData {
            market_id: self.market.id,
            yes_book: self.book.snapshot(Outcome::YES, usize::MAX),
            no_book: self.book.snapshot(Outcome::NO, usize::MAX),
            yes_price: self.book.current_yes_price,
            no_price: self.book.current_no_price,
            timestamp: Utc::now().naive_utc(),
        }));
    }
}
