use std::iter;

use chrono::{DateTime, Local, TimeDelta};
use serde::Serialize;

use crate::{
    core::{
        config::EngineConfig,
        deadline::next_after,
        simulator::{PriceSource, StepWindow},
        tariff::PriceTier,
    },
    quantity::rate::KilowattHourRate,
};

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct TimeSlot {
    pub start: DateTime<Local>,
    pub tier: PriceTier,
    pub rate: KilowattHourRate,
}

/// Evenly spaced, price-tagged start-time candidates from «now» towards the departure.
#[derive(Clone, Debug)]
pub struct SlotGrid {
    slots: Vec<TimeSlot>,
    interval: TimeDelta,
}

impl SlotGrid {
    /// Build the grid up to the departure, capped by the maximum scan span.
    ///
    /// A departure that is not after `now` is taken for the same time tomorrow. The grid is
    /// empty when the window is shorter than a single slot.
    pub fn build(now: DateTime<Local>, departure: DateTime<Local>, config: &EngineConfig) -> Self {
        let departure = next_after(now, departure);
        let slots = if departure - now < config.slot_interval {
            Vec::new()
        } else {
            iter::successors(Some(now), |start| Some(*start + config.slot_interval))
                .take(config.max_slots())
                .take_while(|start| *start < departure)
                .map(|start| {
                    let tier = config.tariff.tier(start);
                    TimeSlot { start, tier, rate: config.tariff.rate(tier) }
                })
                .collect()
        };
        Self { slots, interval: config.slot_interval }
    }

    pub fn slots(&self) -> &[TimeSlot] {
        &self.slots
    }

    pub const fn interval(&self) -> TimeDelta {
        self.interval
    }

    pub const fn len(&self) -> usize {
        self.slots.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Slot containing the instant, treating each slot as half-open.
    fn position(&self, instant: DateTime<Local>) -> Option<usize> {
        let first = self.slots.first()?;
        if instant < first.start {
            return None;
        }
        let offset = (instant - first.start).num_milliseconds();
        let index = usize::try_from(offset / self.interval.num_milliseconds()).ok()?;
        (index < self.slots.len()).then_some(index)
    }
}

/// Slot-anchored pricing: a step never crosses a slot boundary, and the slot's rate applies
/// to all energy delivered within it.
impl PriceSource for SlotGrid {
    fn window(&self, from: DateTime<Local>) -> StepWindow {
        match self.position(from) {
            Some(index) => StepWindow::Until(self.slots[index].start + self.interval),
            None => StepWindow::Exhausted,
        }
    }

    fn rate(&self, from: DateTime<Local>, _to: DateTime<Local>) -> KilowattHourRate {
        self.position(from).map_or(KilowattHourRate::ZERO, |index| self.slots[index].rate)
    }
}
