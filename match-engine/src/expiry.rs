use std::{sync::Arc, time::Duration};

use utility_helpers::log_info;

use crate::engine::MatchEngine;

/// Periodically expires working orders on markets whose close time has
/// passed. The sweep complements the lazy check each command performs, so an
/// idle market still converges to the expired state. Runs until the task is
/// dropped; pass `engine.sweep_interval()` unless a caller wants its own
/// cadence.
pub async fn run_expiry_sweep(engine: Arc<MatchEngine>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let expired = engine.sweep_expired();
        if expired > 0 {
            log_info!("Expiry sweep transitioned {} orders", expired);
        }
    }
}

#[cfg(test)]
mod test {
    use chrono::{Duration as ChronoDuration, Utc};
    use market_types::{
        enums::{OrderSide, OrderStatus, Outcome},
        market::Market,
    };
    use rust_decimal_macros::dec;
    use utility_helpers::types::EnvVarConfig;
    use uuid::Uuid;

    use crate::events::NullPublisher;

    use super::*;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_sweep_expires_orders_once_market_closes() {
        let engine = Arc::new(MatchEngine::new(
            EnvVarConfig::default(),
            Arc::new(NullPublisher),
        ));

        let market = Market::new(
            "short lived",
            "closes almost immediately",
            dec!(100),
            Utc::now().naive_utc() + ChronoDuration::milliseconds(250),
        );
        let market_id = engine.create_market(market).unwrap();
        let user_id = Uuid::new_v4();
        let order_id = engine
            .create_limit_order(market_id, Outcome::YES, OrderSide::BUY, dec!(0.5), dec!(5), user_id)
            .unwrap();

        // market still open, nothing to do
        assert_eq!(engine.sweep_expired(), 0);

        let sweeper = tokio::spawn(run_expiry_sweep(
            Arc::clone(&engine),
            Duration::from_millis(20),
        ));

        tokio::time::sleep(Duration::from_millis(600)).await;
        sweeper.abort();

        let order = engine.get_order(order_id).unwrap();
        assert_eq!(order.status, OrderStatus::EXPIRED);

        // once expired the market rejects new commands
        assert!(matches!(
            engine.create_limit_order(market_id, Outcome::YES, OrderSide::BUY, dec!(0.5), dec!(1), user_id),
            Err(crate::error::EngineError::MarketClosed(_))
        ));
    }
}
