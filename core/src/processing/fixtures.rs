//! Synthetic experiments shared by the processing tests.

use crate::model::{BarSpec, ExperimentWriter, GaugeCalibration, GaugeSpec};
use crate::store::Graph;
use crate::units::Unit;
use crate::vocab::{BarRole, SignalRole, TestType};

pub const SAMPLES: usize = 200;
/// ms
pub const STEP: f64 = 0.001;
pub const WAVE_SPEED: f64 = 5000.0;
pub const INCIDENT_START: usize = 20;
pub const TRANSMITTED_START: usize = 60;
pub const REFLECTED_START: usize = 100;
/// 2·51.25 / 5000 = 0.0205 ms, i.e. 20 whole samples.
pub const STRIKER_LENGTH: f64 = 51.25;
pub const PULSE_POINTS: usize = 20;
pub const GAUGE_DISTANCE: f64 = 100.0;

/// V to strain factor 0.125.
pub const CALIBRATION: GaugeCalibration = GaugeCalibration {
    resistance: 120.0,
    gauge_factor: 2.0,
    calibration_voltage: 2.0,
    calibration_resistance: 120.0,
};

/// Trapezoid of `PULSE_POINTS` samples starting and ending at zero.
pub fn add_pulse(signal: &mut [f64], start: usize, amplitude: f64) {
    let shape = |i: usize| match i {
        0 | 19 => 0.0,
        1 | 18 => 0.33,
        2 | 17 => 0.66,
        _ => 1.0,
    };
    for i in 0..PULSE_POINTS {
        signal[start + i] += amplitude * shape(i);
    }
}

pub fn strain_traces() -> (Vec<f64>, Vec<f64>) {
    let mut incident = vec![0.0; SAMPLES];
    add_pulse(&mut incident, INCIDENT_START, -0.001);
    add_pulse(&mut incident, REFLECTED_START, 0.0004);
    let mut transmitted = vec![0.0; SAMPLES];
    add_pulse(&mut transmitted, TRANSMITTED_START, -0.0006);
    (incident, transmitted)
}

fn steel() -> BarSpec {
    BarSpec {
        length: 1828.8,
        cross_section: 126.677,
        density: 8.0e-6,
        elastic_modulus: 200_000.0,
        wave_speed: Some(WAVE_SPEED),
        velocity: None,
    }
}

fn to_volts(strain: &[f64]) -> Vec<f32> {
    let factor = CALIBRATION.strain_factor();
    strain.iter().map(|s| (s / factor) as f32).collect()
}

/// Complete primary-data graph with signals recorded in volts.
pub fn experiment(name: &str, test_type: TestType) -> Graph {
    let gauge = GaugeSpec {
        calibration: CALIBRATION,
        distance: GAUGE_DISTANCE,
    };
    let mut writer = ExperimentWriter::new(name, test_type);
    let incident = writer.bar(BarRole::Incident, &steel());
    let transmitted = writer.bar(BarRole::Transmitted, &steel());
    writer.bar(
        BarRole::Striker,
        &BarSpec {
            length: STRIKER_LENGTH,
            velocity: Some(10.0),
            ..steel()
        },
    );
    let incident_gauge = writer.gauge(&incident, &gauge);
    let transmitted_gauge = writer.gauge(&transmitted, &gauge);
    if test_type == TestType::SpecimenTest {
        writer.specimen(10.0, 50.0);
    }

    let (incident_strain, transmitted_strain) = strain_traces();
    let time: Vec<f32> = (0..SAMPLES).map(|i| (i as f64 * STEP) as f32).collect();
    writer.sensor_signal(
        SignalRole::Incident,
        0,
        &to_volts(&incident_strain),
        Unit::Volts,
        Some(&incident_gauge),
    );
    writer.sensor_signal(
        SignalRole::Transmitted,
        0,
        &to_volts(&transmitted_strain),
        Unit::Volts,
        Some(&transmitted_gauge),
    );
    writer.sensor_signal(SignalRole::Time, 0, &time, Unit::Millisecond, None);
    writer.finish()
}
