//! jobwatch-core
//!
//! SLA/status escalation engine for field-service jobs.
//!
//! - **domain**: jobs, milestones, SLA policies, status, reminders, notifications, timeline
//! - **engine**: pure evaluation, transition emission, reminder sweep, display labels
//! - **ports**: clock, id generation, store accessor
//! - **impls**: in-memory store
//! - **app**: `Engine`, `Ticker`, `EngineBuilder`

pub mod app;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod impls;
pub mod ports;

pub use app::{Engine, EngineBuilder, EngineHandle, StatusCounts, TickReport, Ticker};
pub use config::{EngineConfig, MAX_TICK_INTERVAL_SECS, PolicyDefaults};
pub use error::{ConfigError, EngineError};
