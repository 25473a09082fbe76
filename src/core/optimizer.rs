use std::cmp::Reverse;

use bon::Builder;
use chrono::{DateTime, Local};
use ordered_float::OrderedFloat;

use crate::{
    core::{config::EngineConfig, plan::ChargePlan, simulator::Integrator, slot::SlotGrid},
    prelude::*,
    quantity::{energy::KilowattHours, percent::Percent, power::Kilowatts},
};

/// Plan for starting the charge at a particular slot.
#[derive(Clone, Debug)]
pub struct Candidate {
    pub index: usize,
    pub plan: ChargePlan,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Verdict {
    /// The cheapest plan among those finishing before the departure.
    Feasible,

    /// Nothing finishes in time, this one charges the most.
    BestEffort,
}

#[derive(Clone, Debug)]
pub struct Selection {
    pub candidate: Candidate,
    pub verdict: Verdict,
}

/// Brute-force search over the start slots.
#[derive(Builder)]
pub struct ScheduleOptimizer<'a> {
    config: &'a EngineConfig,
    grid: &'a SlotGrid,
    charger_power: Kilowatts,
    current_soc: Percent,
    required_energy: KilowattHours,
    departure: DateTime<Local>,
}

impl ScheduleOptimizer<'_> {
    /// Select the best start slot, or `None` for an empty grid.
    #[instrument(
        name = "Optimizing…",
        skip_all,
        fields(n_slots = self.grid.len(), required_energy = %self.required_energy),
    )]
    pub fn run(&self) -> Option<Selection> {
        let candidates: Vec<Candidate> = (0..self.grid.len())
            .map(|index| {
                let candidate = Candidate { index, plan: self.evaluate_candidate(index) };
                trace!(
                    index,
                    start = %candidate.plan.start.format("%H:%M"),
                    completed = candidate.plan.completed(),
                    final_soc = %candidate.plan.final_soc,
                    cost = %candidate.plan.cost,
                    "evaluated",
                );
                candidate
            })
            .collect();

        if let Some(candidate) = Self::cheapest_feasible(&candidates) {
            debug!(index = candidate.index, cost = %candidate.plan.cost, "found a feasible plan");
            return Some(Selection { candidate: candidate.clone(), verdict: Verdict::Feasible });
        }
        let candidate = Self::best_effort(&candidates)?;
        warn!(
            index = candidate.index,
            final_soc = %candidate.plan.final_soc,
            "the departure is unreachable, falling back to the best effort",
        );
        Some(Selection { candidate: candidate.clone(), verdict: Verdict::BestEffort })
    }

    /// Charge from the slot onwards, at most until the departure.
    ///
    /// # Panics
    ///
    /// Panics when the index is outside the grid.
    pub fn evaluate_candidate(&self, start_index: usize) -> ChargePlan {
        Integrator::builder()
            .config(self.config)
            .prices(self.grid)
            .charger_power(self.charger_power)
            .initial_soc(self.current_soc)
            .required_energy(self.required_energy)
            .start(self.grid.slots()[start_index].start)
            .cutoff(self.departure)
            .run()
    }

    /// Lowest cost wins, ties go to the earliest start.
    fn cheapest_feasible(candidates: &[Candidate]) -> Option<&Candidate> {
        candidates
            .iter()
            .filter(|candidate| candidate.plan.completed())
            .min_by_key(|candidate| {
                (OrderedFloat(candidate.plan.cost.round_to_mills().0), candidate.index)
            })
    }

    /// Highest state-of-charge wins, then the lowest cost, then the earliest start.
    fn best_effort(candidates: &[Candidate]) -> Option<&Candidate> {
        candidates.iter().min_by_key(|candidate| {
            (
                Reverse(OrderedFloat(candidate.plan.final_soc.round_to_hundredths().0)),
                OrderedFloat(candidate.plan.cost.round_to_mills().0),
                candidate.index,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::{TimeDelta, TimeZone};

    use super::*;
    use crate::core::plan::Termination;

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 6, day, hour, minute, 0).unwrap()
    }

    fn optimizer<'a>(
        config: &'a EngineConfig,
        grid: &'a SlotGrid,
        current_soc: f64,
        required_energy: f64,
        departure: DateTime<Local>,
    ) -> ScheduleOptimizer<'a> {
        ScheduleOptimizer::builder()
            .config(config)
            .grid(grid)
            .charger_power(Kilowatts::from(7.0))
            .current_soc(Percent(current_soc))
            .required_energy(KilowattHours::from(required_energy))
            .departure(departure)
            .build()
    }

    #[test]
    fn test_starts_at_the_low_tariff() {
        let config = EngineConfig::default();
        let (now, departure) = (at(3, 20, 0), at(4, 6, 0));
        let grid = SlotGrid::build(now, departure, &config);
        let selection = optimizer(&config, &grid, 50.0, 15.0, departure).run().unwrap();
        assert_eq!(selection.verdict, Verdict::Feasible);
        assert_eq!(selection.candidate.index, 8);
        assert_eq!(selection.candidate.plan.start, at(3, 22, 0));
        assert!(selection.candidate.plan.completed());
        assert_abs_diff_eq!(selection.candidate.plan.cost.0, 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_cheapest_among_all_feasible() {
        let config = EngineConfig::default();
        let (now, departure) = (at(3, 19, 10), at(4, 1, 0));
        let grid = SlotGrid::build(now, departure, &config);
        let optimizer = optimizer(&config, &grid, 20.0, 30.0, departure);
        let selection = optimizer.run().unwrap();
        assert_eq!(selection.verdict, Verdict::Feasible);
        let chosen_cost = selection.candidate.plan.cost.round_to_mills();
        for index in 0..grid.len() {
            let plan = optimizer.evaluate_candidate(index);
            if plan.completed() {
                let cost = plan.cost.round_to_mills();
                assert!(chosen_cost <= cost, "{index}: {cost:?} < {chosen_cost:?}");
                if cost == chosen_cost {
                    assert!(selection.candidate.index <= index);
                }
            }
        }
    }

    #[test]
    fn test_best_effort_charges_the_most() {
        let config = EngineConfig::default();
        let (now, departure) = (at(3, 12, 0), at(3, 13, 0));
        let grid = SlotGrid::build(now, departure, &config);
        let optimizer = optimizer(&config, &grid, 10.0, 45.0, departure);
        let selection = optimizer.run().unwrap();
        assert_eq!(selection.verdict, Verdict::BestEffort);
        assert_eq!(selection.candidate.index, 0);

        let plan = &selection.candidate.plan;
        assert!(!plan.completed());
        assert_eq!(plan.termination, Termination::DeadlineExceeded);
        assert_eq!(plan.end(), departure);
        assert_abs_diff_eq!(plan.final_soc.0, 24.0, epsilon = 1e-6);

        for index in 0..grid.len() {
            assert!(optimizer.evaluate_candidate(index).final_soc <= plan.final_soc);
        }
    }

    #[test]
    fn test_best_effort_prefers_cheaper_on_equal_soc() {
        // Small requirement, but the battery is nearly full and the departure is close:
        // every candidate fills the battery, the cheaper low-tariff ones win.
        let config = EngineConfig::default();
        let (now, departure) = (at(3, 21, 30), at(3, 23, 0));
        let grid = SlotGrid::build(now, departure, &config);
        let optimizer = optimizer(&config, &grid, 99.5, 5.0, departure);
        let selection = optimizer.run().unwrap();
        assert_eq!(selection.verdict, Verdict::BestEffort);
        assert_eq!(selection.candidate.plan.final_soc, Percent::FULL);
        assert_eq!(selection.candidate.plan.start, at(3, 22, 0));
    }

    #[test]
    fn test_does_not_roll_over_the_departure() {
        let config = EngineConfig::default();
        let (now, departure) = (at(3, 12, 0), at(3, 12, 20));
        let grid = SlotGrid::build(now, departure, &config);
        let plan = optimizer(&config, &grid, 10.0, 45.0, departure).evaluate_candidate(1);
        assert_eq!(plan.start, at(3, 12, 15));
        assert!(!plan.completed());
        assert_eq!(plan.duration, TimeDelta::minutes(5));
    }

    #[test]
    fn test_empty_grid() {
        let config = EngineConfig::default();
        let (now, departure) = (at(3, 12, 0), at(3, 12, 10));
        let grid = SlotGrid::build(now, departure, &config);
        assert!(optimizer(&config, &grid, 10.0, 45.0, departure).run().is_none());
    }
}
