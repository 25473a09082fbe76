use chrono::{DateTime, Datelike, Local, NaiveTime, TimeDelta, Weekday};
use serde::Serialize;

use crate::quantity::rate::KilowattHourRate;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum PriceTier {
    #[display("low")]
    Low,

    #[display("high")]
    High,
}

/// Two-tier time-of-use tariff.
#[derive(Copy, Clone, Debug, bon::Builder)]
pub struct Tariff {
    #[builder(default = KilowattHourRate::from(0.20))]
    pub low_rate: KilowattHourRate,

    #[builder(default = KilowattHourRate::from(0.40))]
    pub high_rate: KilowattHourRate,

    /// Inclusive.
    #[builder(default = NaiveTime::MIN + TimeDelta::hours(22))]
    pub low_window_start: NaiveTime,

    /// Exclusive. The window wraps past midnight when it ends before it starts.
    #[builder(default = NaiveTime::MIN + TimeDelta::hours(2))]
    pub low_window_end: NaiveTime,

    /// Whether Saturdays and Sundays are billed at the low rate all day long.
    #[builder(default = true)]
    pub weekends_low: bool,
}

impl Default for Tariff {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Tariff {
    pub fn tier(&self, instant: DateTime<Local>) -> PriceTier {
        if self.is_low_price(instant) { PriceTier::Low } else { PriceTier::High }
    }

    pub fn is_low_price(&self, instant: DateTime<Local>) -> bool {
        (self.weekends_low && matches!(instant.weekday(), Weekday::Sat | Weekday::Sun))
            || self.in_low_window(instant.time())
    }

    pub const fn rate(&self, tier: PriceTier) -> KilowattHourRate {
        match tier {
            PriceTier::Low => self.low_rate,
            PriceTier::High => self.high_rate,
        }
    }

    pub fn rate_at(&self, instant: DateTime<Local>) -> KilowattHourRate {
        self.rate(self.tier(instant))
    }

    fn in_low_window(&self, time: NaiveTime) -> bool {
        let (start, end) = (self.low_window_start, self.low_window_end);
        if start <= end {
            // Same-day window, empty when both ends coincide:
            (start <= time) && (time < end)
        } else {
            (time >= start) || (time < end)
        }
    }
}
