use chrono::{DateTime, Local, NaiveTime, TimeDelta};
use clap::{Parser, Subcommand};

use crate::{
    core::{
        config::EngineConfig,
        deadline::{parse_time_of_day, resolve_deadline},
        planner::ChargeRequest,
        tariff::Tariff,
    },
    quantity::{
        energy::KilowattHours,
        percent::Percent,
        power::Kilowatts,
        rate::KilowattHourRate,
    },
};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
pub struct Args {
    /// Print machine-readable JSON instead of tables.
    #[clap(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Main command: plan the charge until the departure.
    #[clap(name = "plan")]
    Plan(Box<PlanArgs>),

    /// Show the price-tagged start slots until the departure.
    #[clap(name = "slots")]
    Slots(Box<SlotsArgs>),
}

#[derive(Parser)]
pub struct PlanArgs {
    /// Current battery state-of-charge in percent.
    #[clap(long = "current-soc", env = "CURRENT_SOC")]
    pub current_soc: Percent,

    /// Desired state-of-charge at the departure, in percent.
    #[clap(long = "target-soc", default_value = "80", env = "TARGET_SOC")]
    pub target_soc: Percent,

    #[clap(long = "charger-power-kilowatts", env = "CHARGER_POWER_KILOWATTS")]
    pub charger_power: Kilowatts,

    /// Search for the cheapest start time instead of charging right away.
    #[clap(long = "optimize", env = "COST_OPTIMIZE")]
    pub cost_optimize: bool,

    #[clap(flatten)]
    pub departure: DepartureArgs,

    #[clap(flatten)]
    pub engine: EngineArgs,
}

impl PlanArgs {
    pub fn request(&self, now: DateTime<Local>) -> ChargeRequest {
        ChargeRequest::builder()
            .current_soc(self.current_soc)
            .target_soc(self.target_soc)
            .charger_power(self.charger_power)
            .departure(self.departure.resolve(now))
            .cost_optimize(self.cost_optimize)
            .build()
    }
}

#[derive(Parser)]
pub struct SlotsArgs {
    #[clap(flatten)]
    pub departure: DepartureArgs,

    #[clap(flatten)]
    pub engine: EngineArgs,
}

#[derive(Copy, Clone, Parser)]
pub struct DepartureArgs {
    /// Departure time of day, `HH:MM`, the next occurrence of which is the deadline.
    #[clap(long, value_parser = parse_time_of_day, env = "DEPARTURE")]
    pub departure: NaiveTime,

    /// Plan as of this instant instead of the current time, RFC 3339.
    #[clap(long = "now", env = "NOW")]
    pub now: Option<DateTime<Local>>,
}

impl DepartureArgs {
    pub fn now(&self) -> DateTime<Local> {
        self.now.unwrap_or_else(Local::now)
    }

    pub fn resolve(&self, now: DateTime<Local>) -> DateTime<Local> {
        resolve_deadline(now, self.departure)
    }
}

#[derive(Copy, Clone, Parser)]
pub struct EngineArgs {
    #[clap(long = "battery-capacity-kwh", default_value = "50", env = "BATTERY_CAPACITY_KWH")]
    pub battery_capacity: KilowattHours,

    /// Low tariff per kilowatt-hour.
    #[clap(long = "low-rate", default_value = "0.20", env = "LOW_RATE")]
    pub low_rate: KilowattHourRate,

    /// High tariff per kilowatt-hour.
    #[clap(long = "high-rate", default_value = "0.40", env = "HIGH_RATE")]
    pub high_rate: KilowattHourRate,

    /// Start of the daily low-tariff window, `HH:MM`.
    #[clap(
        long = "low-window-start",
        default_value = "22:00",
        value_parser = parse_time_of_day,
        env = "LOW_WINDOW_START"
    )]
    pub low_window_start: NaiveTime,

    /// End of the daily low-tariff window (exclusive), `HH:MM`.
    #[clap(
        long = "low-window-end",
        default_value = "02:00",
        value_parser = parse_time_of_day,
        env = "LOW_WINDOW_END"
    )]
    pub low_window_end: NaiveTime,

    /// Bill weekends at the high rate outside the low-tariff window.
    #[clap(long = "no-weekend-discount", env = "NO_WEEKEND_DISCOUNT")]
    pub no_weekend_discount: bool,

    /// Start-time slot width in minutes.
    #[clap(
        long = "slot-minutes",
        default_value = "15",
        value_parser = clap::value_parser!(i64).range(1..=1440),
        env = "SLOT_MINUTES"
    )]
    pub slot_minutes: i64,
}

impl From<EngineArgs> for EngineConfig {
    fn from(args: EngineArgs) -> Self {
        let tariff = Tariff::builder()
            .low_rate(args.low_rate)
            .high_rate(args.high_rate)
            .low_window_start(args.low_window_start)
            .low_window_end(args.low_window_end)
            .weekends_low(!args.no_weekend_discount)
            .build();
        Self::builder()
            .battery_capacity(args.battery_capacity)
            .tariff(tariff)
            .slot_interval(TimeDelta::minutes(args.slot_minutes))
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plan() {
        let args = Args::try_parse_from([
            "chargeplan",
            "--json",
            "plan",
            "--current-soc",
            "50",
            "--charger-power-kilowatts",
            "7",
            "--departure",
            "07:30",
            "--now",
            "2024-06-03T20:00:00+00:00",
            "--optimize",
        ])
        .unwrap();
        assert!(args.json);
        let Command::Plan(args) = args.command else { panic!("expected `plan`") };
        assert!(args.cost_optimize);
        assert_eq!(args.target_soc, Percent(80.0));
        assert_eq!(args.departure.departure, NaiveTime::from_hms_opt(7, 30, 0).unwrap());

        let config = EngineConfig::from(args.engine);
        config.validate().unwrap();
        assert_eq!(config.slot_interval, TimeDelta::minutes(15));
        assert_eq!(config.tariff.low_rate, KilowattHourRate::from(0.2));
        assert!(config.tariff.weekends_low);

        let now = args.departure.now();
        assert_eq!(now, DateTime::parse_from_rfc3339("2024-06-03T20:00:00Z").unwrap());
        let request = args.request(now);
        assert!(request.departure > now);
        assert!(request.departure - now <= TimeDelta::days(1));
    }

    #[test]
    fn test_slot_minutes_range() {
        for slot_minutes in ["0", "-15", "1441", "1000000000000000"] {
            let result = Args::try_parse_from([
                "chargeplan",
                "slots",
                "--departure",
                "07:30",
                "--slot-minutes",
                slot_minutes,
            ]);
            assert!(result.is_err(), "{slot_minutes}");
        }

        let args = Args::try_parse_from([
            "chargeplan",
            "slots",
            "--departure",
            "07:30",
            "--slot-minutes",
            "30",
        ])
        .unwrap();
        let Command::Slots(args) = args.command else { panic!("expected `slots`") };
        let config = EngineConfig::from(args.engine);
        config.validate().unwrap();
        assert_eq!(config.slot_interval, TimeDelta::minutes(30));
    }

    #[test]
    fn test_rejects_invalid_departure() {
        let result = Args::try_parse_from([
            "chargeplan",
            "slots",
            "--departure",
            "25:00",
        ]);
        assert!(result.is_err());
    }
}
