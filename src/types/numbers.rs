// Copyright (c) 2024 Mike Tsao

//! Numeric types used throughout the system.

use core::fmt::{self, Display};
use serde::{Deserialize, Serialize};

/// A gain expressed in decibels relative to unity. Zero is unity gain;
/// negative values attenuate. [Decibels::SILENT] is negative infinity.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Decibels(pub f64);
impl Decibels {
    /// Unity gain.
    pub const UNITY: Decibels = Decibels(0.0);
    /// No signal at all.
    pub const SILENT: Decibels = Decibels(f64::NEG_INFINITY);

    /// Converts to a linear amplitude factor.
    pub fn to_amplitude(&self) -> f64 {
        if self.0 == f64::NEG_INFINITY {
            0.0
        } else {
            10.0f64.powf(self.0 / 20.0)
        }
    }
}
impl From<f64> for Decibels {
    fn from(value: f64) -> Self {
        Self(value)
    }
}
impl From<Decibels> for f64 {
    fn from(value: Decibels) -> Self {
        value.0
    }
}
impl Display for Decibels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0.1} dB", self.0)
    }
}

/// Cycles per second.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct FrequencyHz(pub f64);
impl From<f64> for FrequencyHz {
    fn from(value: f64) -> Self {
        Self(value)
    }
}
impl Display for FrequencyHz {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0.2} Hz", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    #[test]
    fn decibels_to_amplitude() {
        assert_eq!(Decibels::UNITY.to_amplitude(), 1.0);
        assert_eq!(Decibels::SILENT.to_amplitude(), 0.0);
        assert!(approx_eq!(
            f64,
            Decibels(-20.0).to_amplitude(),
            0.1,
            epsilon = 0.000001
        ));
    }
}
