use chrono::TimeDelta;

use crate::{
    core::{error::PlanError, tariff::Tariff},
    quantity::energy::KilowattHours,
};

/// Engine parameters shared by every component of a single planning call.
#[derive(Copy, Clone, Debug, bon::Builder)]
pub struct EngineConfig {
    #[builder(default = KilowattHours::from(50.0))]
    pub battery_capacity: KilowattHours,

    #[builder(default)]
    pub tariff: Tariff,

    /// Width of a start-time candidate slot.
    #[builder(default = TimeDelta::minutes(15))]
    pub slot_interval: TimeDelta,

    /// Integration step.
    #[builder(default = TimeDelta::minutes(5))]
    pub sub_interval: TimeDelta,

    /// The slot grid never extends further than this from «now».
    #[builder(default = TimeDelta::hours(48))]
    pub max_scan_span: TimeDelta,

    /// Hard limit on integration steps within a single simulation.
    #[builder(default = 2000)]
    pub max_steps: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), PlanError> {
        if !self.battery_capacity.is_positive() {
            return Err(PlanError::InvalidConfiguration(format!(
                "battery capacity must be positive, got {}",
                self.battery_capacity,
            )));
        }
        if self.sub_interval.num_milliseconds() <= 0 || self.slot_interval.num_milliseconds() <= 0 {
            return Err(PlanError::InvalidConfiguration(
                "slot and integration intervals must be at least a millisecond".to_string(),
            ));
        }
        if self.max_scan_span < self.slot_interval {
            return Err(PlanError::InvalidConfiguration(
                "the scan span must cover at least one slot".to_string(),
            ));
        }
        if self.max_steps == 0 {
            return Err(PlanError::InvalidConfiguration(
                "the step limit must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Upper bound on the number of slots in a grid.
    #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn max_slots(&self) -> usize {
        (self.max_scan_span.num_milliseconds() / self.slot_interval.num_milliseconds().max(1))
            .max(0) as usize
    }
}
