use crate::generator::template::{superpose, trapezoid};
use anyhow::Context;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use shpbcore::model::{BarSpec, ExperimentWriter, GaugeCalibration, GaugeSpec};
use shpbcore::units::Unit;
use shpbcore::vocab::{BarRole, SignalRole, TestType};
use shpbcore::Graph;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration for generating synthetic SHPB experiments.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub name_prefix: String,
    pub samples: usize,
    /// Sampling interval in ms.
    pub step: f64,
    /// Bar wave speed in m/s.
    pub wave_speed: f64,
    pub bar_length: f64,
    /// Gauge distance from the specimen face, mm.
    pub gauge_distance: f64,
    pub striker_length: (f64, f64),
    pub striker_velocity: (f64, f64),
    pub specimen_length: (f64, f64),
    pub specimen_area: f64,
    /// Share of the incident amplitude that reaches the transmitted bar.
    pub transmission: (f64, f64),
    /// Chance that an experiment is a bar-only pulse test.
    pub pulse_test_ratio: f64,
    /// Peak gauge noise, in strain.
    pub noise: f64,
    pub seed: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            name_prefix: "SYN".to_string(),
            samples: 1200,
            step: 0.001,
            wave_speed: 5000.0,
            bar_length: 1828.8,
            gauge_distance: 900.0,
            striker_length: (100.0, 200.0),
            striker_velocity: (8.0, 15.0),
            specimen_length: (5.0, 12.0),
            specimen_area: 50.0,
            transmission: (0.3, 0.6),
            pulse_test_ratio: 0.2,
            noise: 1e-6,
            seed: 0,
        }
    }
}

const CALIBRATION: GaugeCalibration = GaugeCalibration {
    resistance: 350.0,
    gauge_factor: 2.1,
    calibration_voltage: 4.0,
    calibration_resistance: 350.0,
};

fn sample_range(rng: &mut StdRng, (low, high): (f64, f64)) -> f64 {
    if high > low {
        rng.gen_range(low..high)
    } else {
        low
    }
}

/// Samples needed for a wave to travel `distance` mm.
fn transit_samples(config: &GeneratorConfig, distance: f64) -> usize {
    (distance / config.wave_speed / config.step).round() as usize
}

fn add_noise(rng: &mut StdRng, signal: &mut [f64], noise: f64) {
    if noise > 0.0 {
        for sample in signal.iter_mut() {
            *sample += rng.gen_range(-noise..noise);
        }
    }
}

fn to_volts(strain: &[f64]) -> Vec<f32> {
    let factor = CALIBRATION.strain_factor();
    strain.iter().map(|s| (s / factor) as f32).collect()
}

/// One complete primary-data graph. Returns the test name with it.
pub fn build_experiment(
    config: &GeneratorConfig,
    index: usize,
    rng: &mut StdRng,
) -> anyhow::Result<(String, Graph)> {
    let name = format!("{}_{:03}", config.name_prefix, index);
    let test_type = if rng.gen_bool(config.pulse_test_ratio.clamp(0.0, 1.0)) {
        TestType::PulseTest
    } else {
        TestType::SpecimenTest
    };

    let striker_length = sample_range(rng, config.striker_length);
    let velocity = sample_range(rng, config.striker_velocity);
    let specimen_length = match test_type {
        TestType::SpecimenTest => sample_range(rng, config.specimen_length),
        TestType::PulseTest => 0.0,
    };
    let transmission = match test_type {
        TestType::SpecimenTest => sample_range(rng, config.transmission),
        TestType::PulseTest => 0.95,
    };

    // ½·V/C, compressive
    let amplitude = -0.5 * velocity / config.wave_speed;
    let pulse_points = transit_samples(config, 2.0 * striker_length);
    let shape = trapezoid(pulse_points, (pulse_points / 8).max(2));

    let incident_start = config.samples / 10;
    let reflected_start = incident_start + transit_samples(config, 2.0 * config.gauge_distance);
    let transmitted_start = incident_start
        + transit_samples(config, 2.0 * config.gauge_distance + specimen_length);
    let needed = reflected_start.max(transmitted_start) + pulse_points;
    anyhow::ensure!(
        needed < config.samples,
        "{name}: {} samples cannot hold pulses ending at sample {needed}",
        config.samples
    );

    let mut incident = vec![0.0; config.samples];
    superpose(&mut incident, incident_start, amplitude, &shape);
    superpose(
        &mut incident,
        reflected_start,
        -amplitude * (1.0 - transmission),
        &shape,
    );
    let mut transmitted = vec![0.0; config.samples];
    superpose(&mut transmitted, transmitted_start, amplitude * transmission, &shape);
    add_noise(rng, &mut incident, config.noise);
    add_noise(rng, &mut transmitted, config.noise);

    let bar = BarSpec {
        length: config.bar_length,
        cross_section: 126.677,
        density: 7.85e-6,
        elastic_modulus: 200_000.0,
        wave_speed: Some(config.wave_speed),
        velocity: None,
    };
    let gauge = GaugeSpec {
        calibration: CALIBRATION,
        distance: config.gauge_distance,
    };

    let mut writer = ExperimentWriter::new(&name, test_type);
    let incident_bar = writer.bar(BarRole::Incident, &bar);
    let transmitted_bar = writer.bar(BarRole::Transmitted, &bar);
    writer.bar(
        BarRole::Striker,
        &BarSpec {
            length: striker_length,
            velocity: Some(velocity),
            ..bar
        },
    );
    let incident_gauge = writer.gauge(&incident_bar, &gauge);
    let transmitted_gauge = writer.gauge(&transmitted_bar, &gauge);
    if test_type == TestType::SpecimenTest {
        writer.specimen(specimen_length, config.specimen_area);
    }

    let time: Vec<f32> = (0..config.samples)
        .map(|i| (i as f64 * config.step) as f32)
        .collect();
    writer.sensor_signal(
        SignalRole::Incident,
        0,
        &to_volts(&incident),
        Unit::Volts,
        Some(&incident_gauge),
    );
    writer.sensor_signal(
        SignalRole::Transmitted,
        0,
        &to_volts(&transmitted),
        Unit::Volts,
        Some(&transmitted_gauge),
    );
    writer.sensor_signal(SignalRole::Time, 0, &time, Unit::Millisecond, None);

    Ok((name, writer.finish()))
}

/// Writes `count` experiments as `<dir>/<test name>.ttl`.
pub fn write_experiments(
    dir: &Path,
    count: usize,
    config: &GeneratorConfig,
) -> anyhow::Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut written = Vec::with_capacity(count);
    for index in 0..count {
        let (name, graph) = build_experiment(config, index, &mut rng)?;
        let path = dir.join(format!("{name}.ttl"));
        graph
            .save_atomic(&path)
            .with_context(|| format!("writing {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shpbcore::model::ExperimentRecord;
    use shpbcore::{AnalysisConfig, AnalysisPipeline};

    #[test]
    fn generated_specimen_test_analyzes() {
        let config = GeneratorConfig {
            pulse_test_ratio: 0.0,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(7);
        let (name, mut graph) = build_experiment(&config, 1, &mut rng).unwrap();
        assert_eq!(name, "SYN_001");

        let summary = AnalysisPipeline::new(AnalysisConfig::default())
            .run(&mut graph)
            .unwrap();
        assert_eq!(summary.test_type, "SpecimenTest");
        assert_eq!(summary.extracted_signals, 4);
        assert!((summary.wave_speed - config.wave_speed).abs() < 1e-2);
    }

    #[test]
    fn generated_pulse_test_has_no_specimen() {
        let config = GeneratorConfig {
            pulse_test_ratio: 1.0,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(3);
        let (_, graph) = build_experiment(&config, 0, &mut rng).unwrap();
        let record = ExperimentRecord::load(&graph).unwrap();
        assert_eq!(record.test_type, TestType::PulseTest);
        assert!(record.specimen.is_none());
    }

    #[test]
    fn same_seed_same_files() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        let config = GeneratorConfig {
            seed: 11,
            ..Default::default()
        };
        let a = write_experiments(first.path(), 2, &config).unwrap();
        let b = write_experiments(second.path(), 2, &config).unwrap();
        assert_eq!(a.len(), 2);
        for (a, b) in a.iter().zip(&b) {
            assert_eq!(fs::read_to_string(a).unwrap(), fs::read_to_string(b).unwrap());
        }
    }

    #[test]
    fn short_record_is_rejected() {
        let config = GeneratorConfig {
            samples: 300,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(0);
        assert!(build_experiment(&config, 0, &mut rng).is_err());
    }
}
