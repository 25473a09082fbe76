use std::{
    fmt::{Debug, Display, Formatter},
    ops::{Div, Mul},
};

use chrono::TimeDelta;

use crate::quantity::{Quantity, cost::Cost, power::Kilowatts, rate::KilowattHourRate};

pub type KilowattHours = Quantity<f64, 1, 1, 0>;

impl Default for KilowattHours {
    fn default() -> Self {
        Self(0.0)
    }
}

impl Display for KilowattHours {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2} kWh", self.0)
    }
}

impl Debug for KilowattHours {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.0}Wh", self.0 * 1000.0)
    }
}

impl Mul<KilowattHourRate> for KilowattHours {
    type Output = Cost;

    fn mul(self, rhs: KilowattHourRate) -> Self::Output {
        Cost::from(self.0 * rhs.0)
    }
}

/// Time needed to deliver the energy at the given power, with millisecond precision.
///
/// Any positive energy takes at least a millisecond.
impl Div<Kilowatts> for KilowattHours {
    type Output = TimeDelta;

    fn div(self, rhs: Kilowatts) -> Self::Output {
        let millis = (self.0 / rhs.0 * 3_600_000.0).round();
        let millis = if self.0 > 0.0 { millis.max(1.0) } else { millis };

        #[allow(clippy::cast_possible_truncation)]
        TimeDelta::milliseconds(millis as i64)
    }
}

/// Fraction of the other energy, for example of the battery capacity.
impl Div<Self> for KilowattHours {
    type Output = f64;

    fn div(self, rhs: Self) -> Self::Output {
        self.0 / rhs.0
    }
}
