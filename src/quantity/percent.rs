use std::fmt::{Debug, Display, Formatter};

use serde::{Deserialize, Serialize};

/// Battery state-of-charge in percent of its capacity.
#[derive(
    Copy,
    Clone,
    PartialEq,
    PartialOrd,
    Serialize,
    Deserialize,
    derive_more::Add,
    derive_more::From,
    derive_more::FromStr,
    derive_more::Sub,
)]
pub struct Percent(pub f64);

impl Percent {
    pub const EMPTY: Self = Self(0.0);
    pub const FULL: Self = Self(100.0);

    /// Clamp into `[min, 100]`. Non-numbers become `min`.
    pub fn clamp_from(self, min: Self) -> Self {
        if self.0.is_nan() {
            return min;
        }
        Self(self.0.max(min.0).min(Self::FULL.0))
    }

    pub fn clamp_valid(self) -> Self {
        self.clamp_from(Self::EMPTY)
    }

    pub const fn from_proportion(proportion: f64) -> Self {
        Self(proportion * 100.0)
    }

    pub fn round_to_tenths(self) -> Self {
        Self((self.0 * 10.0).round() / 10.0)
    }

    pub fn round_to_hundredths(self) -> Self {
        Self((self.0 * 100.0).round() / 100.0)
    }
}

impl Display for Percent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1}%", self.0)
    }
}

impl Debug for Percent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}%", self.0)
    }
}
