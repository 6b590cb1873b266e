//! Pulse-window heuristics shared by the extraction stage.

use crate::math::{InterpHelper, StatsHelper};
use crate::model::GaugeCalibration;
use crate::prelude::{AnalysisConfig, AnalysisError, AnalysisResult, Deadline, SignPolarity};

/// Fraction of the peak that marks the rising edge of a pulse.
pub const RISE_FRACTION: f64 = 0.9;
/// Fraction of the peak under which a sample still counts as the pulse foot.
pub const FOOT_FRACTION: f64 = 0.1;

pub fn voltage_to_strain(volts: &[f64], gauge: &GaugeCalibration) -> Vec<f64> {
    let factor = gauge.strain_factor();
    volts.iter().map(|v| v * factor).collect()
}

/// Parameters of one window search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowSpec {
    pub pulse_points: usize,
    pub interpolation: usize,
    pub polarity: SignPolarity,
    pub cutoff: f64,
    pub offset: usize,
}

impl WindowSpec {
    pub fn from_config(config: &AnalysisConfig, pulse_points: usize, polarity: SignPolarity) -> Self {
        Self {
            pulse_points,
            interpolation: config.interpolation,
            polarity,
            cutoff: config.zero_cutoff,
            offset: config.window_offset,
        }
    }
}

/// A located pulse: its anchors in the source signal and the cut samples.
#[derive(Debug, Clone, PartialEq)]
pub struct PulseWindow {
    pub peak_index: usize,
    pub peak: f64,
    pub rise_index: usize,
    pub anchor: usize,
    pub samples: Vec<f64>,
}

fn reaches(sample: f64, level: f64, polarity: SignPolarity) -> bool {
    match polarity {
        SignPolarity::Negative => sample <= level,
        SignPolarity::Positive => sample >= level,
    }
}

/// Global extremum and the first sample reaching 90% of it.
fn rise_crossing(
    signal: &[f64],
    polarity: SignPolarity,
    deadline: &Deadline,
) -> AnalysisResult<(usize, f64, usize)> {
    let (peak_index, peak) = StatsHelper::extremum(signal, polarity.is_min_search())
        .ok_or_else(|| AnalysisError::ThresholdNotFound("signal is empty".into()))?;
    if peak == 0.0 || !peak.is_finite() {
        return Err(AnalysisError::ThresholdNotFound(format!(
            "signal peak {peak} has no usable magnitude"
        )));
    }

    let level = RISE_FRACTION * peak;
    for (index, &sample) in signal.iter().enumerate() {
        deadline.tick(index, "rise search")?;
        if reaches(sample, level, polarity) {
            return Ok((peak_index, peak, index));
        }
    }
    Err(AnalysisError::ThresholdNotFound(format!(
        "no sample reaches {level:.4e}"
    )))
}

/// Finds the pulse in `signal` and cuts `spec.pulse_points` samples from its foot.
pub fn locate_window(
    signal: &[f64],
    spec: &WindowSpec,
    deadline: &Deadline,
) -> AnalysisResult<PulseWindow> {
    if spec.pulse_points == 0 {
        return Err(AnalysisError::InvalidInput(
            "pulse window of zero samples".into(),
        ));
    }
    let polarity = spec.polarity;
    let (peak_index, peak, crossing) = rise_crossing(signal, polarity, deadline)?;

    // Walk back from the 90% crossing to the foot, then to the last near-zero sample.
    let foot_level = FOOT_FRACTION * peak;
    let mut rise_index = None;
    for index in (0..=crossing).rev() {
        deadline.tick(index, "foot search")?;
        let sample = signal[index];
        let below = match polarity {
            SignPolarity::Negative => sample >= foot_level,
            SignPolarity::Positive => sample <= foot_level,
        };
        if below {
            rise_index = Some(index);
            break;
        }
    }
    let rise_index = rise_index.ok_or_else(|| {
        AnalysisError::ThresholdNotFound(format!("no sample before index {crossing} is under 10% of the peak"))
    })?;

    let mut anchor = None;
    for index in (0..=rise_index).rev() {
        deadline.tick(index, "zero search")?;
        let sample = signal[index];
        let near_zero = match polarity {
            SignPolarity::Negative => sample >= -spec.cutoff,
            SignPolarity::Positive => sample <= spec.cutoff,
        };
        if near_zero {
            anchor = Some(index);
            break;
        }
    }
    let anchor = anchor.ok_or_else(|| {
        AnalysisError::ThresholdNotFound(format!(
            "no sample within {:e} of zero before index {rise_index}",
            spec.cutoff
        ))
    })?;

    let start = anchor as i64 - spec.offset as i64;
    let end = start + spec.pulse_points as i64;
    if start < 0 || end > signal.len() as i64 {
        return Err(AnalysisError::WindowOutOfBounds {
            start,
            end,
            len: signal.len(),
        });
    }
    let cut = &signal[start as usize..end as usize];
    let samples = if spec.interpolation >= 1 {
        InterpHelper::resample(cut, spec.interpolation)
    } else {
        cut.to_vec()
    };

    Ok(PulseWindow {
        peak_index,
        peak,
        rise_index,
        anchor,
        samples,
    })
}

pub fn extract_pulse_data(
    signal: &[f64],
    spec: &WindowSpec,
    deadline: &Deadline,
) -> AnalysisResult<Vec<f64>> {
    Ok(locate_window(signal, spec, deadline)?.samples)
}

/// Two gauges, one wave: `distance / Δt` between their 90% crossings.
///
/// `distance` in mm over a time axis in ms gives m/s.
pub fn time_of_flight(
    time: &[f64],
    incident: (&[f64], SignPolarity),
    transmitted: (&[f64], SignPolarity),
    distance: f64,
    deadline: &Deadline,
) -> AnalysisResult<f64> {
    let (_, _, first) = rise_crossing(incident.0, incident.1, deadline)?;
    let (_, _, second) = rise_crossing(transmitted.0, transmitted.1, deadline)?;
    let (Some(&t0), Some(&t1)) = (time.get(first), time.get(second)) else {
        return Err(AnalysisError::WindowOutOfBounds {
            start: first.min(second) as i64,
            end: first.max(second) as i64 + 1,
            len: time.len(),
        });
    };

    let delta = t1 - t0;
    let speed = distance / delta;
    if delta <= 0.0 || !speed.is_finite() {
        return Err(AnalysisError::ThresholdNotFound(format!(
            "transit time {delta:.4e} ms between indices {first} and {second} gives no wave speed"
        )));
    }
    Ok(speed)
}

/// Loading pulse implied by the striker impact.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PulseTiming {
    /// ms
    pub duration: f64,
    /// mm
    pub length: f64,
    /// `½ρCV` in GPa (kg/mm³ · m/s · m/s).
    pub stress_amplitude: f64,
    pub strain_amplitude: f64,
}

impl PulseTiming {
    pub fn from_striker(length: f64, density: f64, velocity: f64, wave_speed: f64) -> Self {
        Self {
            duration: 2.0 * length / wave_speed,
            length: 2.0 * length,
            stress_amplitude: 0.5 * density * wave_speed * velocity,
            strain_amplitude: 0.5 * velocity / wave_speed,
        }
    }

    /// Window length in samples on a time axis of mean step `mean Δt`.
    pub fn pulse_points(&self, time: &[f64]) -> AnalysisResult<usize> {
        let step = StatsHelper::mean_step(time)
            .ok_or_else(|| AnalysisError::InvalidInput("time axis needs two samples".into()))?;
        if step <= 0.0 || !step.is_finite() {
            return Err(AnalysisError::InvalidInput(format!(
                "time axis is not increasing (mean step {step:.4e})"
            )));
        }
        let points = (self.duration / step).floor();
        if !points.is_finite() || points < 1.0 {
            return Err(AnalysisError::InvalidInput(format!(
                "pulse of {:.4e} ms spans no samples at {step:.4e} ms",
                self.duration
            )));
        }
        Ok(points as usize)
    }
}
