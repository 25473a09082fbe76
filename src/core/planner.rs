use chrono::{DateTime, Local};
use serde::Serialize;

use crate::{
    core::{
        config::EngineConfig,
        deadline::next_after,
        error::PlanError,
        optimizer::{ScheduleOptimizer, Verdict},
        plan::ChargePlan,
        simulator::simulate,
        slot::SlotGrid,
    },
    prelude::*,
    quantity::{cost::Cost, energy::KilowattHours, percent::Percent, power::Kilowatts},
};

/// Already parsed planning parameters.
#[derive(Copy, Clone, Debug, bon::Builder)]
pub struct ChargeRequest {
    pub current_soc: Percent,

    #[builder(default = Percent(80.0))]
    pub target_soc: Percent,

    pub charger_power: Kilowatts,
    pub departure: DateTime<Local>,

    #[builder(default)]
    pub cost_optimize: bool,
}

impl ChargeRequest {
    /// Current state-of-charge clamped to `[0, 100]`, target clamped to `[current, 100]`.
    #[must_use]
    pub fn normalized(self) -> Self {
        let current_soc = self.current_soc.clamp_valid();
        Self { current_soc, target_soc: self.target_soc.clamp_from(current_soc), ..self }
    }

    pub fn required_energy(&self, capacity: KilowattHours) -> KilowattHours {
        (capacity * (self.target_soc.0 - self.current_soc.0) / 100.0).max(KilowattHours::ZERO)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum Note {
    #[display("already at or above the target state-of-charge")]
    AlreadyAtTarget,

    #[display("very short window, simulated immediate charging with cutoff")]
    ShortWindow,

    #[display("immediate charging, no cost optimization")]
    Immediate,

    #[display("cannot reach the target before the departure, returning the best-effort fill")]
    BestEffort,

    #[display("charging right away is the cheapest option")]
    ImmediateCheaper,
}

#[derive(Clone, Debug, Serialize)]
pub struct ReportPoint {
    pub elapsed_hours: f64,
    pub time: DateTime<Local>,
    pub soc: Percent,
}

/// Everything the caller needs to present the plan.
#[derive(Clone, Debug, Serialize)]
pub struct PlanReport {
    pub hours: f64,
    pub final_soc: Percent,
    pub timeline: Vec<ReportPoint>,
    pub start: DateTime<Local>,
    pub end: DateTime<Local>,
    pub departure: DateTime<Local>,
    pub baseline_cost: Cost,
    pub optimized_cost: Cost,
    pub savings: Cost,
    pub meets_departure: bool,
    pub low_price_used: bool,
    pub note: Option<Note>,
}

impl PlanReport {
    fn from_plan(
        config: &EngineConfig,
        plan: &ChargePlan,
        departure: DateTime<Local>,
        baseline_cost: Cost,
        note: Option<Note>,
    ) -> Self {
        let optimized_cost = plan.cost.round_to_cents();
        let baseline_cost = baseline_cost.round_to_cents();
        Self {
            hours: (plan.total_hours() * 100.0).round() / 100.0,
            final_soc: plan.final_soc.round_to_tenths(),
            timeline: plan
                .timeline
                .iter()
                .map(|point| ReportPoint {
                    elapsed_hours: point.elapsed_hours(),
                    time: point.instant,
                    soc: point.soc.round_to_tenths(),
                })
                .collect(),
            start: plan.start,
            end: plan.end(),
            departure,
            baseline_cost,
            optimized_cost,
            savings: (baseline_cost - optimized_cost).max(Cost::ZERO).round_to_cents(),
            meets_departure: plan.completed(),
            low_price_used: plan
                .timeline
                .iter()
                .any(|point| config.tariff.is_low_price(point.instant)),
            note,
        }
    }

    fn already_at_target(
        config: &EngineConfig,
        now: DateTime<Local>,
        soc: Percent,
        departure: DateTime<Local>,
    ) -> Self {
        Self {
            hours: 0.0,
            final_soc: soc.round_to_tenths(),
            timeline: vec![ReportPoint {
                elapsed_hours: 0.0,
                time: now,
                soc: soc.round_to_tenths(),
            }],
            start: now,
            end: departure,
            departure,
            baseline_cost: Cost::ZERO,
            optimized_cost: Cost::ZERO,
            savings: Cost::ZERO,
            meets_departure: true,
            low_price_used: config.tariff.is_low_price(now),
            note: Some(Note::AlreadyAtTarget),
        }
    }
}

/// Plan the charge for the request as of `now`.
#[instrument(
    skip_all,
    fields(
        current_soc = %request.current_soc,
        target_soc = %request.target_soc,
        charger_power = %request.charger_power,
        cost_optimize = request.cost_optimize,
    ),
)]
pub fn plan(
    config: &EngineConfig,
    request: ChargeRequest,
    now: DateTime<Local>,
) -> Result<PlanReport, PlanError> {
    config.validate()?;
    if !request.charger_power.is_positive() {
        return Err(PlanError::InvalidConfiguration(format!(
            "charger power must be positive, got {}",
            request.charger_power,
        )));
    }

    let request = request.normalized();
    let departure = next_after(now, request.departure);
    let required_energy = request.required_energy(config.battery_capacity);
    debug!(%departure, %required_energy, "planning");

    if required_energy <= KilowattHours::ZERO {
        info!("already at the target");
        return Ok(PlanReport::already_at_target(config, now, request.current_soc, departure));
    }

    let simulate_now = |cutoff| {
        simulate(
            config,
            request.charger_power,
            request.current_soc,
            required_energy,
            now,
            cutoff,
        )
    };

    let grid = SlotGrid::build(now, departure, config);
    if grid.is_empty() {
        let plan = simulate_now(Some(departure));
        info!(
            completed = plan.completed(),
            delivered = %plan.delivered,
            "short window, charging right away",
        );
        let note = Some(Note::ShortWindow);
        return Ok(PlanReport::from_plan(config, &plan, departure, plan.cost, note));
    }

    if !request.cost_optimize {
        let plan = simulate_now(Some(departure));
        info!(
            completed = plan.completed(),
            delivered = %plan.delivered,
            cost = %plan.cost,
            "charging right away",
        );
        let note = Some(Note::Immediate);
        return Ok(PlanReport::from_plan(config, &plan, departure, plan.cost, note));
    }

    let selection = ScheduleOptimizer::builder()
        .config(config)
        .grid(&grid)
        .charger_power(request.charger_power)
        .current_soc(request.current_soc)
        .required_energy(required_energy)
        .departure(departure)
        .build()
        .run();
    let Some(selection) = selection else {
        // The optimizer only gives up on an empty grid, handled above.
        let plan = simulate_now(Some(departure));
        let note = Some(Note::Immediate);
        return Ok(PlanReport::from_plan(config, &plan, departure, plan.cost, note));
    };

    // Full cost of charging right away, regardless of the departure:
    let baseline = simulate_now(None);
    let (plan, note) = match selection.verdict {
        Verdict::Feasible
            if baseline.completed()
                && baseline.end() <= departure
                && baseline.cost.round_to_mills()
                    < selection.candidate.plan.cost.round_to_mills() =>
        {
            (&baseline, Some(Note::ImmediateCheaper))
        }
        Verdict::Feasible => (&selection.candidate.plan, None),
        Verdict::BestEffort => (&selection.candidate.plan, Some(Note::BestEffort)),
    };
    info!(
        start = %plan.start.format("%H:%M"),
        completed = plan.completed(),
        delivered = %plan.delivered,
        cost = %plan.cost,
        baseline_cost = %baseline.cost,
        "optimized",
    );
    Ok(PlanReport::from_plan(config, plan, departure, baseline.cost, note))
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::TimeZone;

    use super::*;

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 6, day, hour, minute, 0).unwrap()
    }

    fn request(current_soc: f64, target_soc: f64, departure: DateTime<Local>) -> ChargeRequest {
        ChargeRequest::builder()
            .current_soc(Percent(current_soc))
            .target_soc(Percent(target_soc))
            .charger_power(Kilowatts::from(7.0))
            .departure(departure)
            .build()
    }

    #[test]
    fn test_required_energy() {
        let capacity = KilowattHours::from(50.0);
        assert_abs_diff_eq!(request(50.0, 80.0, at(3, 20, 0)).required_energy(capacity).0, 15.0);
        let request = request(90.0, 80.0, at(3, 20, 0));
        assert_eq!(request.required_energy(capacity), KilowattHours::ZERO);
    }

    #[test]
    fn test_normalized() {
        let request = request(120.0, 50.0, at(3, 20, 0)).normalized();
        assert_eq!(request.current_soc, Percent::FULL);
        assert_eq!(request.target_soc, Percent::FULL);

        let request = ChargeRequest { current_soc: Percent(-3.0), ..request }.normalized();
        assert_eq!(request.current_soc, Percent::EMPTY);
        assert_eq!(request.target_soc, Percent::FULL);
    }

    #[test]
    fn test_immediate_charge() {
        let report = plan(&EngineConfig::default(), request(50.0, 80.0, at(3, 20, 0)), at(3, 12, 0))
            .unwrap();
        assert_abs_diff_eq!(report.hours, 2.14);
        assert!(report.meets_departure);
        assert_eq!(report.final_soc, Percent(80.0));
        assert_eq!(report.start, at(3, 12, 0));
        assert_eq!(report.note, Some(Note::Immediate));
        assert_abs_diff_eq!(report.baseline_cost.0, 6.0);
        assert_abs_diff_eq!(report.optimized_cost.0, 6.0);
        assert_eq!(report.savings, Cost::ZERO);
        assert!(!report.low_price_used);
        assert_eq!(report.timeline.len(), 26);
    }

    #[test]
    fn test_already_at_target() {
        let report = plan(&EngineConfig::default(), request(80.0, 80.0, at(3, 20, 0)), at(3, 12, 0))
            .unwrap();
        assert_abs_diff_eq!(report.hours, 0.0);
        assert!(report.meets_departure);
        assert_eq!(report.savings, Cost::ZERO);
        assert_eq!(report.note, Some(Note::AlreadyAtTarget));
        assert_eq!(report.timeline.len(), 1);
        assert_eq!(report.timeline[0].soc, Percent(80.0));
        assert_eq!(report.end, at(3, 20, 0));
    }

    #[test]
    fn test_short_window() {
        let request = ChargeRequest { cost_optimize: true, ..request(10.0, 100.0, at(3, 12, 10)) };
        let report = plan(&EngineConfig::default(), request, at(3, 12, 0)).unwrap();
        assert!(!report.meets_departure);
        assert_eq!(report.note, Some(Note::ShortWindow));
        assert!(report.final_soc < Percent(100.0));
        assert_eq!(report.final_soc, Percent(12.3));
        assert_eq!(report.end, at(3, 12, 10));
    }

    #[test]
    fn test_optimized_waits_for_the_night() {
        let request = ChargeRequest { cost_optimize: true, ..request(50.0, 80.0, at(4, 6, 0)) };
        let report = plan(&EngineConfig::default(), request, at(3, 20, 0)).unwrap();
        assert!(report.meets_departure);
        assert_eq!(report.note, None);
        assert_eq!(report.start, at(3, 22, 0));
        assert!(report.low_price_used);
        assert_abs_diff_eq!(report.optimized_cost.0, 3.0);
        assert_abs_diff_eq!(report.baseline_cost.0, 5.68);
        assert_abs_diff_eq!(report.savings.0, 2.68, epsilon = 1e-9);
        assert!(report.optimized_cost <= report.baseline_cost);
    }

    #[test]
    fn test_best_effort() {
        let request = ChargeRequest { cost_optimize: true, ..request(10.0, 100.0, at(3, 13, 0)) };
        let report = plan(&EngineConfig::default(), request, at(3, 12, 0)).unwrap();
        assert!(!report.meets_departure);
        assert_eq!(report.note, Some(Note::BestEffort));
        assert_eq!(report.start, at(3, 12, 0));
        assert_eq!(report.final_soc, Percent(24.0));
    }

    #[test]
    fn test_immediate_cheaper_around_the_boundary() {
        // The first slot is billed high as a whole, while charging right away gets the low
        // rate as soon as 22:00 is reached:
        let request = ChargeRequest { cost_optimize: true, ..request(50.0, 57.0, at(3, 22, 20)) };
        let report = plan(&EngineConfig::default(), request, at(3, 21, 50)).unwrap();
        assert!(report.meets_departure);
        assert_eq!(report.note, Some(Note::ImmediateCheaper));
        assert_abs_diff_eq!(report.optimized_cost.0, 0.82);
        assert_eq!(report.optimized_cost, report.baseline_cost);
        assert_eq!(report.savings, Cost::ZERO);
    }

    #[test]
    fn test_past_departure_means_tomorrow() {
        let report = plan(&EngineConfig::default(), request(50.0, 80.0, at(3, 11, 0)), at(3, 12, 0))
            .unwrap();
        assert_eq!(report.departure, at(4, 11, 0));
        assert!(report.meets_departure);
    }

    #[test]
    fn test_rejects_stalled_charger() {
        let request = ChargeRequest {
            charger_power: Kilowatts::ZERO,
            ..request(50.0, 80.0, at(3, 20, 0))
        };
        let result = plan(&EngineConfig::default(), request, at(3, 12, 0));
        assert!(matches!(result, Err(PlanError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let config = EngineConfig::builder().battery_capacity(KilowattHours::ZERO).build();
        let result = plan(&config, request(50.0, 80.0, at(3, 20, 0)), at(3, 12, 0));
        assert!(matches!(result, Err(PlanError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_serializes_to_json() {
        let report = plan(&EngineConfig::default(), request(50.0, 80.0, at(3, 20, 0)), at(3, 12, 0))
            .unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["note"], "immediate");
        assert_eq!(json["meets_departure"], true);
        assert_eq!(json["final_soc"], 80.0);
    }
}
