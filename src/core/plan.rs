use chrono::{DateTime, Local, TimeDelta};

use crate::quantity::{cost::Cost, energy::KilowattHours, percent::Percent};

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TimelinePoint {
    /// Time since the plan start.
    pub elapsed: TimeDelta,

    pub instant: DateTime<Local>,
    pub soc: Percent,
}

impl TimelinePoint {
    pub fn elapsed_hours(&self) -> f64 {
        self.elapsed.as_seconds_f64() / 3600.0
    }
}

/// Why the integration stopped.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Termination {
    /// The required energy has been delivered.
    Satisfied,

    /// The next step would have crossed the cutoff instant.
    DeadlineExceeded,

    /// The battery is full before the requirement is met.
    BatteryFull,

    /// Ran out of priced time: the slot grid has no slot for the next step.
    GridExhausted,

    /// Hit the step limit.
    StepLimit,
}

/// Outcome of a single simulation pass, never changed after it is built.
#[derive(Clone, Debug)]
pub struct ChargePlan {
    pub start: DateTime<Local>,
    pub timeline: Vec<TimelinePoint>,
    pub duration: TimeDelta,
    pub final_soc: Percent,
    pub delivered: KilowattHours,
    pub cost: Cost,
    pub termination: Termination,
}

impl ChargePlan {
    /// Whether the required energy was delivered before any cutoff.
    pub fn completed(&self) -> bool {
        self.termination == Termination::Satisfied
    }

    pub fn end(&self) -> DateTime<Local> {
        self.start + self.duration
    }

    pub fn total_hours(&self) -> f64 {
        self.duration.as_seconds_f64() / 3600.0
    }
}
