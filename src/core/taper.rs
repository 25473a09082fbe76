use crate::quantity::percent::Percent;

/// Charge rate multiplier for the state-of-charge: chargers derate close to full capacity.
pub fn taper_factor(soc: Percent) -> f64 {
    if soc.0 < 80.0 {
        1.0
    } else if soc.0 < 90.0 {
        0.5
    } else {
        0.2
    }
}
