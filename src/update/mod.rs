// src/update/mod.rs

pub mod orchestrator;
pub mod schedule;

pub use orchestrator::UpdateOrchestrator;
pub use schedule::{spawn_schedule, CheckSchedule};
