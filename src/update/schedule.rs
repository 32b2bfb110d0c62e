// src/update/schedule.rs

//! Mapping of the configured check interval onto supervisor behaviour.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::info;

use crate::update::UpdateOrchestrator;

/// What the `[update].check_interval_minutes` value means at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckSchedule {
    /// Negative interval: no polling, no automatic start.
    Disabled,
    /// Zero interval: no polling; start the existing artifact once at boot.
    FirstStartOnly,
    /// Positive interval: recurring checks, the first one immediately.
    Every(Duration),
}

impl CheckSchedule {
    pub fn from_minutes(minutes: i64) -> Self {
        match minutes {
            m if m > 0 => Self::Every(Duration::from_secs(m as u64 * 60)),
            0 => Self::FirstStartOnly,
            _ => Self::Disabled,
        }
    }
}

/// Apply the schedule. Returns the polling task handle when one was
/// spawned.
pub async fn spawn_schedule(
    schedule: CheckSchedule,
    orchestrator: UpdateOrchestrator,
) -> Option<JoinHandle<()>> {
    match schedule {
        CheckSchedule::Disabled => {
            info!("update checking disabled");
            None
        }
        CheckSchedule::FirstStartOnly => {
            info!("update checking off; starting existing artifact if present");
            orchestrator.supervisor().try_first_start().await;
            None
        }
        CheckSchedule::Every(period) => {
            info!(period_secs = period.as_secs(), "scheduling release checks");
            Some(tokio::spawn(async move {
                let mut interval = tokio::time::interval(period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    interval.tick().await;
                    orchestrator.run_check_cycle().await;
                }
            }))
        }
    }
}
