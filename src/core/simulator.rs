use chrono::{DateTime, Local, TimeDelta};

use crate::{
    core::{
        config::EngineConfig,
        plan::{ChargePlan, Termination, TimelinePoint},
        taper::taper_factor,
        tariff::Tariff,
    },
    quantity::{
        Quantity,
        cost::Cost,
        energy::KilowattHours,
        percent::Percent,
        power::Kilowatts,
        rate::KilowattHourRate,
    },
};

/// Energy below this is considered delivered.
const ENERGY_TOLERANCE: KilowattHours = Quantity(1e-9);

/// How far a step starting at some instant is allowed to go.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StepWindow {
    /// Only the integration step limits it.
    Open,

    /// The price holds up to this instant (exclusive).
    Until(DateTime<Local>),

    /// No price is known for the instant.
    Exhausted,
}

/// Where the integrator takes the energy price from.
pub trait PriceSource {
    fn window(&self, from: DateTime<Local>) -> StepWindow;

    /// Rate for the energy delivered between the instants.
    fn rate(&self, from: DateTime<Local>, to: DateTime<Local>) -> KilowattHourRate;
}

/// Continuous tariff lookup: each step is priced at the instant it completes.
impl PriceSource for Tariff {
    fn window(&self, _from: DateTime<Local>) -> StepWindow {
        StepWindow::Open
    }

    fn rate(&self, _from: DateTime<Local>, to: DateTime<Local>) -> KilowattHourRate {
        self.rate_at(to)
    }
}

/// Stepwise charge integration shared by immediate simulation and slot-anchored candidates.
#[derive(bon::Builder)]
#[builder(finish_fn(vis = ""))]
pub struct Integrator<'a, P> {
    config: &'a EngineConfig,
    prices: &'a P,
    charger_power: Kilowatts,
    initial_soc: Percent,
    required_energy: KilowattHours,
    start: DateTime<Local>,
    cutoff: Option<DateTime<Local>>,
}

impl<'a, P: PriceSource, S: integrator_builder::IsComplete> IntegratorBuilder<'a, P, S> {
    pub fn run(self) -> ChargePlan {
        self.build().run()
    }
}

impl<P: PriceSource> Integrator<'_, P> {
    fn run(self) -> ChargePlan {
        let mut soc = self.initial_soc;
        let mut delivered = KilowattHours::ZERO;
        let mut elapsed = TimeDelta::zero();
        let mut cost = Cost::ZERO;
        let mut timeline = Vec::new();

        let termination = loop {
            let remaining = self.required_energy - delivered;
            if remaining <= ENERGY_TOLERANCE {
                break Termination::Satisfied;
            }
            if soc >= Percent::FULL {
                break Termination::BatteryFull;
            }
            if timeline.len() >= self.config.max_steps {
                break Termination::StepLimit;
            }

            let step_start = self.start + elapsed;
            let window = match self.prices.window(step_start) {
                StepWindow::Open => self.config.sub_interval,
                StepWindow::Until(end) => (end - step_start).min(self.config.sub_interval),
                StepWindow::Exhausted if self.cutoff.is_some_and(|cutoff| step_start >= cutoff) => {
                    break Termination::DeadlineExceeded;
                }
                StepWindow::Exhausted => break Termination::GridExhausted,
            };
            let effective_power = self.charger_power * taper_factor(soc);
            let (energy, duration) = {
                let deliverable = effective_power * window;
                if deliverable > remaining && effective_power.is_positive() {
                    // Last partial step, it only takes as long as the remainder needs:
                    (remaining, remaining / effective_power)
                } else {
                    (deliverable.min(remaining), window)
                }
            };

            let step_end = step_start + duration;
            if self.cutoff.is_some_and(|cutoff| step_end > cutoff) {
                break Termination::DeadlineExceeded;
            }

            delivered += energy;
            elapsed += duration;
            cost += energy * self.prices.rate(step_start, step_end);
            soc = (soc + Percent::from_proportion(energy / self.config.battery_capacity))
                .clamp_valid();
            timeline.push(TimelinePoint { elapsed, instant: step_end, soc });
        };

        ChargePlan {
            start: self.start,
            timeline,
            duration: elapsed,
            final_soc: soc,
            delivered,
            cost,
            termination,
        }
    }
}

/// Charge continuously from `start`, pricing with the tariff, until the requirement is met
/// or the next step would cross `cutoff`.
pub fn simulate(
    config: &EngineConfig,
    charger_power: Kilowatts,
    current_soc: Percent,
    required_energy: KilowattHours,
    start: DateTime<Local>,
    cutoff: Option<DateTime<Local>>,
) -> ChargePlan {
    Integrator::builder()
        .config(config)
        .prices(&config.tariff)
        .charger_power(charger_power)
        .initial_soc(current_soc)
        .required_energy(required_energy)
        .start(start)
        .maybe_cutoff(cutoff)
        .run()
}
