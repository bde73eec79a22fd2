//! EngineBuilder: wiring with fail-fast validation.
//!
//! `build()` validates the configuration before an `Engine` exists, so a bad
//! interval or a negative default budget is reported at startup rather than
//! on the first job that uses it.

use std::sync::Arc;

use crate::app::engine::Engine;
use crate::app::ticker::Ticker;
use crate::config::EngineConfig;
use crate::error::ConfigError;
use crate::impls::InMemoryStore;
use crate::ports::{Clock, EngineStore, IdGenerator, SystemClock, UlidGenerator};

/// # Example
/// ```ignore
/// let engine = EngineBuilder::new()
///     .store(store.clone())
///     .config(EngineConfig::from_json_file("jobwatch.json")?)
///     .build()?;
/// let ticker = Ticker::spawn(engine);
/// ```
#[derive(Default)]
pub struct EngineBuilder {
    store: Option<Arc<dyn EngineStore>>,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
    config: EngineConfig,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults to an empty `InMemoryStore`.
    pub fn store(mut self, store: Arc<dyn EngineStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Defaults to `SystemClock`.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Defaults to a `UlidGenerator` over the engine clock.
    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<Engine, ConfigError> {
        self.config.validate()?;

        let clock: Arc<dyn Clock> = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let ids = self
            .ids
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(clock.clone())));
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryStore::new()));

        Ok(Engine::new(store, clock, ids, self.config))
    }

    /// Build and start a `Ticker` on the current runtime.
    pub fn spawn(self) -> Result<Ticker, ConfigError> {
        Ok(Ticker::spawn(self.build()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewJob, Priority, SlaPolicy};
    use crate::ports::FixedClock;
    use chrono::{TimeZone, Utc};

    #[test]
    fn build_with_defaults() {
        let engine = EngineBuilder::new().build().unwrap();
        assert_eq!(engine.config(), &EngineConfig::default());
    }

    #[test]
    fn build_rejects_invalid_config() {
        let mut config = EngineConfig::default();
        config.policies.high = SlaPolicy {
            on_site_within: -10,
            ..SlaPolicy::for_priority(Priority::High)
        };

        let result = EngineBuilder::new().config(config).build();
        assert!(matches!(result, Err(ConfigError::Invalid(msg)) if msg.contains("high")));
    }

    #[tokio::test]
    async fn built_engine_uses_given_clock_and_config() {
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let mut config = EngineConfig::default();
        config.policies.low = SlaPolicy::new(45, 120, 480, Default::default()).unwrap();

        let mut engine = EngineBuilder::new()
            .clock(Arc::new(FixedClock::new(t0)))
            .config(config)
            .build()
            .unwrap();

        let job = engine
            .create_job(NewJob::new("JOB-3").with_priority(Priority::Low))
            .await
            .unwrap();
        assert_eq!(job.milestones.logged, t0);
        assert_eq!(job.policy.accept_within, 45);
        assert_eq!(job.id.as_ulid().timestamp_ms(), t0.timestamp_millis() as u64);
    }
}
