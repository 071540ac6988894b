pub mod engine;
pub mod error;
pub mod events;
pub mod expiry;

mod order_book;
mod session;

pub use engine::MatchEngine;
pub use error::EngineError;
pub use events::{BookDeltaData, ChannelPublisher, EventPublisher, MarketEvent, NullPublisher};
