use chrono::NaiveDateTime;
use market_types::{enums::OrderStatus, trades::Trade};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::broadcast;
use utility_helpers::types::OrderBookDataStruct;
use uuid::Uuid;

/// Full-depth view of both outcome books plus the current market prices,
/// emitted after every committed mutation.
#[derive(Debug, Serialize, Clone)]
pub struct BookDeltaData {
    pub market_id: Uuid,
    pub yes_book: OrderBookDataStruct,
    pub no_book: OrderBookDataStruct,
    pub yes_price: Decimal,
    pub no_price: Decimal,
    pub timestamp: NaiveDateTime,
}

#[derive(Debug, Serialize, Clone)]
pub enum MarketEvent {
    BookDelta(BookDeltaData),
    Trade(Trade),
    OrderStatusChanged {
        order_id: Uuid,
        user_id: Uuid,
        status: OrderStatus,
        filled_quantity: Decimal,
    },
}

/// Fan-out seam toward the notification bus. Implementations must not block:
/// events are handed over after the market session already committed, so a
/// slow consumer can only delay delivery, never a mutation.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, market_id: Uuid, event: MarketEvent);
}

/// In-process publisher over a tokio broadcast channel. Consumers subscribe
/// and forward to whatever transport they own; a consumer that lags past the
/// channel capacity misses events and is expected to re-snapshot.
pub struct ChannelPublisher {
    tx: broadcast::Sender<(Uuid, MarketEvent)>,
}

impl ChannelPublisher {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        ChannelPublisher { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<(Uuid, MarketEvent)> {
        self.tx.subscribe()
    }
}

impl EventPublisher for ChannelPublisher {
    fn publish(&self, market_id: Uuid, event: MarketEvent) {
        // send only fails when nobody is subscribed, which is fine
        let _ = self.tx.send((market_id, event));
    }
}

/// Publisher that drops everything. Used when a caller embeds the engine and
/// has no interest in the event stream.
pub struct NullPublisher;

impl EventPublisher for NullPublisher {
    fn publish(&self, _market_id: Uuid, _event: MarketEvent) {}
}

#[cfg(test)]
mod test {
    use market_types::enums::{OrderSide, Outcome};
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_channel_publisher_delivers_to_subscribers() {
        let publisher = ChannelPublisher::new(8);
        let mut rx = publisher.subscribe();

        let market_id = Uuid::new_v4();
        let trade = Trade::new(
            market_id,
            Outcome::YES,
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            OrderSide::BUY,
            dec!(0.5),
            dec!(2),
        );
        publisher.publish(market_id, MarketEvent::Trade(trade.clone()));

        let (received_market, event) = rx.try_recv().unwrap();
        assert_eq!(received_market, market_id);
        match event {
            MarketEvent::Trade(received) => {
                assert_eq!(received.id, trade.id);
                assert_eq!(received.price, dec!(0.5));
            }
            other => panic!("expected a trade event, got {other:?}"),
        }
    }

    #[test]
    fn test_publish_without_subscribers_is_a_noop() {
        let publisher = ChannelPublisher::new(8);
        publisher.publish(
            Uuid::new_v4(),
            MarketEvent::OrderStatusChanged {
                order_id: Uuid::new_v4(),
                user_id: Uuid::new_v4(),
                status: OrderStatus::OPEN,
                filled_quantity: dec!(0),
            },
        );
    }
}
