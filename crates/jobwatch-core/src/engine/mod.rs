//! Pure SLA logic: evaluation, transition emission, reminder sweep.
//!
//! Nothing in here touches a clock, a store, or a timer; callers pass `now`
//! and persist what comes back.

pub mod display;
pub mod emitter;
pub mod evaluator;
pub mod reminders;

pub use self::display::{TrafficLight, legacy_stage_label, traffic_light};
pub use self::emitter::{Emission, on_tick};
pub use self::evaluator::{ActiveWindow, active_window, evaluate, overrun_stages};
pub use self::reminders::{SweepOutcome, sweep};
