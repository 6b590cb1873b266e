//! Typed view of one SHPB experiment and of the quantities derived from it.

pub mod record;
pub mod writer;

pub use record::{BarRecord, ExperimentRecord, PropertySet, RawSignal};
pub use writer::{BarSpec, ExperimentWriter, GaugeSpec};

use crate::prelude::AnalysisResult;
use crate::vocab::{key, PulsePropertyKind, SeriesKind, SignalRole};

/// Strain-gauge bridge constants. Resistances in Ω, voltage in V.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaugeCalibration {
    pub resistance: f64,
    pub gauge_factor: f64,
    pub calibration_voltage: f64,
    pub calibration_resistance: f64,
}

impl GaugeCalibration {
    pub fn from_properties(properties: &PropertySet) -> AnalysisResult<Self> {
        Ok(Self {
            resistance: properties.require(key::GAUGE_RESISTANCE)?,
            gauge_factor: properties.require(key::GAUGE_FACTOR)?,
            calibration_voltage: properties.require(key::CALIBRATION_VOLTAGE)?,
            calibration_resistance: properties.require(key::CALIBRATION_RESISTANCE)?,
        })
    }

    /// Volts-to-strain factor `R_g / (V_cal · GF · (R_g + R_cal))`.
    pub fn strain_factor(&self) -> f64 {
        self.resistance
            / (self.calibration_voltage
                * self.gauge_factor
                * (self.resistance + self.calibration_resistance))
    }
}

/// One pulse window, or the matching time axis, ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedSignal {
    pub role: SignalRole,
    pub samples: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PulseProperty {
    pub kind: PulsePropertyKind,
    /// Value in the unit `kind.unit()` names.
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesEntity {
    pub kind: SeriesKind,
    pub samples: Vec<f64>,
}

pub(crate) fn to_f32(samples: &[f64]) -> Vec<f32> {
    samples.iter().map(|&v| v as f32).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strain_factor_matches_bridge_formula() {
        let gauge = GaugeCalibration {
            resistance: 120.0,
            gauge_factor: 2.0,
            calibration_voltage: 2.0,
            calibration_resistance: 120.0,
        };
        // 120 / (2 * 2 * 240)
        assert!((gauge.strain_factor() - 0.125).abs() < 1e-12);
    }
}
