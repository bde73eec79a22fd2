//! Application layer: the engine over its ports, and the loop that drives it.

pub mod builder;
pub mod engine;
pub mod status;
pub mod ticker;

pub use self::builder::EngineBuilder;
pub use self::engine::{Engine, TickReport};
pub use self::status::StatusCounts;
pub use self::ticker::{EngineHandle, Ticker, TickerStatus};
