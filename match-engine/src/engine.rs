use std::{collections::HashMap, sync::Arc};

use chrono::Utc;
use market_types::{
    enums::{MarketStatus, OrderSide, OrderStatus, OrderType, Outcome},
    market::Market,
    orders::Order,
    pagination::PaginatedResponse,
};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use utility_helpers::{log_info, log_warn, types::{EnvVarConfig, OrderBookDataStruct}};
use uuid::Uuid;

use crate::{
    error::EngineError,
    events::{EventPublisher, MarketEvent},
    session::MarketSession,
};

/// Entry point for every command and query. Each market lives behind its own
/// lock with a single writer, so mutations on one market serialize while
/// readers and independent markets proceed in parallel; the registry lock is
/// only held long enough to clone a session handle.
///
/// Sessions buffer their events during the mutation; the engine publishes
/// them only after the session lock is released, so a slow event consumer
/// never extends the lock hold time.
pub struct MatchEngine {
    config: EnvVarConfig,
    publisher: Arc<dyn EventPublisher>,
    sessions: RwLock<HashMap<Uuid, Arc<RwLock<MarketSession>>>>,
    /// order id -> market id, so order-addressed commands find their session
    order_index: RwLock<HashMap<Uuid, Uuid>>,
}

impl MatchEngine {
    pub fn new(config: EnvVarConfig, publisher: Arc<dyn EventPublisher>) -> Self {
        MatchEngine {
            config,
            publisher,
            sessions: RwLock::new(HashMap::new()),
            order_index: RwLock::new(HashMap::new()),
        }
    }

    /// Builds an engine from environment-driven configuration.
    pub fn from_env(publisher: Arc<dyn EventPublisher>) -> Self {
        Self::new(EnvVarConfig::new(), publisher)
    }

    /// How often the expiry sweep should run for this configuration.
    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.config.expiry_sweep_interval_secs)
    }

    /// Registers a market and spins up its session.
    pub fn create_market(&self, market: Market) -> Result<Uuid, EngineError> {
        let market_id = market.id;
        let mut sessions = self.sessions.write();
        if sessions.contains_key(&market_id) {
            return Err(EngineError::InvalidOrder("market already registered"));
        }
        sessions.insert(market_id, Arc::new(RwLock::new(MarketSession::new(market))));
        log_info!("Market session created - {:?}", market_id);
        Ok(market_id)
    }

    /// Tears a market down: every working order expires, the final book
    /// delta goes out, and the session is dropped.
    pub fn finalize_market(&self, market_id: Uuid) -> Result<(), EngineError> {
        let session = {
            let mut sessions = self.sessions.write();
            sessions
                .remove(&market_id)
                .ok_or(EngineError::InvalidOrder("unknown market"))?
        };

        let mut events = Vec::new();
        let expired = {
            let mut session = session.write();
            session.expire_all(&mut events)
        };
        self.order_index
            .write()
            .retain(|_, owning_market| *owning_market != market_id);
        self.publish(market_id, events);

        log_info!(
            "Market {} finalized, {} orders expired",
            market_id,
            expired
        );
        Ok(())
    }

    pub fn create_limit_order(
        &self,
        market_id: Uuid,
        outcome: Outcome,
        side: OrderSide,
        price: Decimal,
        quantity: Decimal,
        user_id: Uuid,
    ) -> Result<Uuid, EngineError> {
        self.place_order(
            market_id,
            outcome,
            side,
            OrderType::LIMIT,
            price,
            quantity,
            user_id,
        )
    }

    /// Market orders take liquidity only; whatever cannot be matched is
    /// discarded and reported as `InsufficientLiquidity`.
    pub fn create_market_order(
        &self,
        market_id: Uuid,
        outcome: Outcome,
        side: OrderSide,
        quantity: Decimal,
        user_id: Uuid,
    ) -> Result<Uuid, EngineError> {
        self.place_order(
            market_id,
            outcome,
            side,
            OrderType::MARKET,
            Decimal::ZERO,
            quantity,
            user_id,
        )
    }

    pub fn cancel_order(&self, order_id: Uuid, user_id: Uuid) -> Result<(), EngineError> {
        let (market_id, session) = self.session_for_order(order_id)?;

        let mut events = Vec::new();
        let result = {
            let mut session = session.write();
            session.cancel_order(order_id, user_id, &mut events)
        };
        self.publish(market_id, events);
        result
    }

    pub fn update_order(
        &self,
        order_id: Uuid,
        user_id: Uuid,
        new_price: Decimal,
        new_quantity: Decimal,
    ) -> Result<(), EngineError> {
        let (market_id, session) = self.session_for_order(order_id)?;

        let mut events = Vec::new();
        let result = {
            let mut session = session.write();
            session.update_order(
                order_id,
                user_id,
                new_price,
                new_quantity,
                self.config.prevent_self_trade,
                &mut events,
            )
        };
        self.publish(market_id, events);
        result
    }

    /// Aggregated ladder for one outcome; `depth == 0` means "as deep as the
    /// engine allows".
    pub fn get_order_book(
        &self,
        market_id: Uuid,
        outcome: Outcome,
        depth: usize,
    ) -> Result<OrderBookDataStruct, EngineError> {
        let session = self.session(market_id)?;
        let depth = if depth == 0 {
            self.config.max_book_depth
        } else {
            depth.min(self.config.max_book_depth)
        };
        let session = session.read();
        Ok(session.snapshot(outcome, depth))
    }

    pub fn get_market_price(
        &self,
        market_id: Uuid,
        outcome: Outcome,
    ) -> Result<Decimal, EngineError> {
        let session = self.session(market_id)?;
        let session = session.read();
        Ok(session.current_price(outcome))
    }

    pub fn get_order(&self, order_id: Uuid) -> Result<Order, EngineError> {
        let (_, session) = self.session_for_order(order_id)?;
        let session = session.read();
        session
            .order(order_id)
            .cloned()
            .ok_or(EngineError::NotFound(order_id))
    }

    /// One user's orders on one market, newest first, 1-based pages.
    pub fn list_user_orders(
        &self,
        market_id: Uuid,
        user_id: Uuid,
        status_filter: Option<OrderStatus>,
        page: u64,
        page_size: u64,
    ) -> Result<PaginatedResponse<Order>, EngineError> {
        let session = self.session(market_id)?;

        let page = page.max(1);
        let page_size = if page_size == 0 {
            self.config.default_page_size
        } else {
            page_size
        };

        let orders = {
            let session = session.read();
            session.user_orders(user_id, status_filter)
        };

        let total_items = orders.len() as u64;
        let offset = (page - 1) * page_size;
        let items: Vec<Order> = orders
            .into_iter()
            .skip(offset as usize)
            .take(page_size as usize)
            .collect();

        Ok(PaginatedResponse::new(items, page, page_size, total_items))
    }

    /// Replays previously accepted working orders into the books, e.g. after
    /// a restart. Orders referencing unknown markets are skipped.
    pub fn restore_orders(&self, orders: Vec<Order>) -> usize {
        let mut restored = 0;
        for order in orders {
            let Ok(session) = self.session(order.market_id) else {
                log_warn!(
                    "Skipping order {} for unknown market {}",
                    order.id,
                    order.market_id
                );
                continue;
            };

            let order_id = order.id;
            let market_id = order.market_id;
            let mut events = Vec::new();
            let result = {
                let mut session = session.write();
                session.restore_order(order, self.config.prevent_self_trade, &mut events)
            };
            match result {
                Ok(()) => {
                    self.order_index.write().insert(order_id, market_id);
                    self.publish(market_id, events);
                    restored += 1;
                }
                Err(e) => log_warn!("Skipping order {} during restore: {}", order_id, e),
            }
        }
        log_info!("Loaded {} open orders into the books", restored);
        restored
    }

    /// One expiry pass over every session. Returns how many orders expired.
    pub fn sweep_expired(&self) -> usize {
        let now = Utc::now().naive_utc();
        let sessions: Vec<(Uuid, Arc<RwLock<MarketSession>>)> = self
            .sessions
            .read()
            .iter()
            .map(|(id, session)| (*id, Arc::clone(session)))
            .collect();

        let mut expired = 0;
        for (market_id, session) in sessions {
            let mut events = Vec::new();
            expired += {
                let mut session = session.write();
                session.expire_due(now, &mut events)
            };
            self.publish(market_id, events);
        }
        expired
    }

    ///// Helpers //////

    #[allow(clippy::too_many_arguments)]
    fn place_order(
        &self,
        market_id: Uuid,
        outcome: Outcome,
        side: OrderSide,
        order_type: OrderType,
        price: Decimal,
        quantity: Decimal,
        user_id: Uuid,
    ) -> Result<Uuid, EngineError> {
        let session = self.session(market_id)?;

        let mut events = Vec::new();
        let result = {
            let mut session = session.write();
            session.place_order(
                user_id,
                outcome,
                side,
                order_type,
                price,
                quantity,
                self.config.prevent_self_trade,
                &mut events,
            )
        };

        // a partially filled market order is stored despite the error, so it
        // must be addressable afterwards
        let accepted_id = match &result {
            Ok(order_id) => Some(*order_id),
            Err(EngineError::InsufficientLiquidity { order_id, .. }) => Some(*order_id),
            Err(_) => None,
        };
        if let Some(order_id) = accepted_id {
            self.order_index.write().insert(order_id, market_id);
        }
        self.publish(market_id, events);
        result
    }

    fn session(&self, market_id: Uuid) -> Result<Arc<RwLock<MarketSession>>, EngineError> {
        self.sessions
            .read()
            .get(&market_id)
            .cloned()
            .ok_or(EngineError::InvalidOrder("unknown market"))
    }

    fn session_for_order(
        &self,
        order_id: Uuid,
    ) -> Result<(Uuid, Arc<RwLock<MarketSession>>), EngineError> {
        let market_id = self
            .order_index
            .read()
            .get(&order_id)
            .cloned()
            .ok_or(EngineError::NotFound(order_id))?;
        Ok((market_id, self.session(market_id)?))
    }

    fn publish(&self, market_id: Uuid, events: Vec<MarketEvent>) {
        for event in events {
            self.publisher.publish(market_id, event);
        }
    }
}

/// Markets the engine no longer tracks report as closed to status queries.
impl MatchEngine {
    pub fn market_status(&self, market_id: Uuid) -> Option<MarketStatus> {
        let session = self.sessions.read().get(&market_id).cloned()?;
        let session = session.read();
        Some(session.market().status)
    }
}
