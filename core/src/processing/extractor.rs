use crate::math::{InterpHelper, StatsHelper};
use crate::model::{
    ExperimentRecord, ExtractedSignal, GaugeCalibration, PulseProperty, RawSignal, SeriesEntity,
};
use crate::prelude::{
    AnalysisConfig, AnalysisError, AnalysisResult, Deadline, ProcessingStage, SignPolarity,
};
use crate::processing::pulse::{self, PulseTiming, WindowSpec};
use crate::telemetry::LogManager;
use crate::units::Unit;
use crate::vocab::{class, key, pred, BarRole, PulsePropertyKind, SeriesKind, SignalRole, TestType};

/// New recorded wave speed for one bar, written after a pulse test.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveSpeedUpdate {
    pub bar: String,
    /// Existing WaveSpeed property node, if the bar has one.
    pub node: Option<String>,
    pub value: f64,
}

/// Everything the extraction stage derives for one experiment, not yet written.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionOutput {
    pub test_type: TestType,
    /// m/s, used for every derived quantity.
    pub wave_speed: f64,
    /// m/s, time-of-flight estimate across the gauges.
    pub pulse_speed: f64,
    pub timing: PulseTiming,
    pub pulse_points: usize,
    /// Mean sampling step of the raw time axis, ms.
    pub time_step: f64,
    pub properties: Vec<PulseProperty>,
    pub signals: Vec<ExtractedSignal>,
    pub particle_velocities: Vec<SeriesEntity>,
    pub wave_speed_updates: Vec<WaveSpeedUpdate>,
}

impl ExtractionOutput {
    pub fn signal(&self, role: SignalRole) -> Option<&[f64]> {
        self.signals
            .iter()
            .find(|signal| signal.role == role)
            .map(|signal| signal.samples.as_slice())
    }

    pub fn property(&self, kind: PulsePropertyKind) -> Option<f64> {
        self.properties
            .iter()
            .find(|property| property.kind == kind)
            .map(|property| property.value)
    }
}

/// Locates the incident, reflected and transmitted pulses of one experiment.
pub struct SignalExtractor {
    config: Option<AnalysisConfig>,
    logger: LogManager,
}

impl SignalExtractor {
    pub fn new() -> Self {
        Self {
            config: None,
            logger: LogManager::new(),
        }
    }

    fn single<'r>(record: &'r ExperimentRecord, role: SignalRole) -> AnalysisResult<&'r RawSignal> {
        let signals = record.signals_of(role);
        match signals.as_slice() {
            [signal] => Ok(*signal),
            [] => Err(AnalysisError::missing(
                "experiment",
                role.sensor_class().unwrap_or_else(|| class::SENSOR_SIGNAL.to_string()),
            )),
            many => Err(AnalysisError::Unimplemented(format!(
                "{} {:?} sensor signals, only one is supported",
                many.len(),
                role
            ))),
        }
    }

    fn require_unit(signal: &RawSignal, unit: Unit) -> AnalysisResult<()> {
        if signal.has_unit(&unit.iri()) {
            return Ok(());
        }
        Err(AnalysisError::UnsupportedUnit {
            instance: signal.instance.clone(),
            unit: signal.unit.clone(),
            dimension: format!("{:?} signal (expected {})", signal.role, unit.label()),
        })
    }

    /// Gauge voltages become strain; anything else is taken as strain already.
    fn strain_of(&self, record: &ExperimentRecord, signal: &RawSignal, bar: BarRole) -> AnalysisResult<Vec<f64>> {
        if !signal.has_unit(&Unit::Volts.iri()) {
            return Ok(signal.samples.clone());
        }
        let gauge = signal
            .gauge
            .as_deref()
            .or_else(|| record.bar(bar).gauges.first().map(String::as_str))
            .ok_or_else(|| AnalysisError::missing(signal.instance.as_str(), pred::HAS_STRAIN_GAUGE))?;
        let calibration = GaugeCalibration::from_properties(record.gauge_properties(gauge)?)?;
        self.logger.detail(&format!(
            "{} converted from volts with factor {:.4e}",
            signal.instance,
            calibration.strain_factor()
        ));
        Ok(pulse::voltage_to_strain(&signal.samples, &calibration))
    }

    fn wave_speeds(
        &self,
        record: &ExperimentRecord,
        config: &AnalysisConfig,
        traces: (&[f64], &[f64], &[f64]),
        deadline: &Deadline,
    ) -> AnalysisResult<(f64, f64)> {
        let (time, incident, transmitted) = traces;
        let gauges = record.gauge_distance(&record.incident_bar)?
            + record.gauge_distance(&record.transmitted_bar)?;
        let flight = |distance: f64| {
            pulse::time_of_flight(
                time,
                (incident, config.incident_polarity),
                (transmitted, config.transmitted_polarity),
                distance,
                deadline,
            )
        };

        match record.test_type {
            TestType::SpecimenTest => {
                let recorded = [
                    record.incident_bar.require(key::WAVE_SPEED)?,
                    record.transmitted_bar.require(key::WAVE_SPEED)?,
                ];
                let wave_speed = StatsHelper::mean(&recorded).unwrap_or(recorded[0]);
                let specimen_length = record
                    .specimen
                    .as_ref()
                    .ok_or_else(|| AnalysisError::missing("experiment", class::SPECIMEN))?
                    .require(key::ORIGINAL_LENGTH)?;
                let pulse_speed = flight(gauges + specimen_length)?;
                self.logger.record(&format!(
                    "bar wave speed {wave_speed:.3e} m/s, test wave speed {pulse_speed:.3e} m/s"
                ));
                Ok((wave_speed, pulse_speed))
            }
            TestType::PulseTest => {
                let wave_speed = flight(gauges)?;
                self.logger.record(&format!(
                    "bar wave speed from time of flight {wave_speed:.3e} m/s"
                ));
                Ok((wave_speed, wave_speed))
            }
        }
    }

    fn wave_speed_updates(
        &self,
        record: &ExperimentRecord,
        config: &AnalysisConfig,
        wave_speed: f64,
    ) -> Vec<WaveSpeedUpdate> {
        if record.test_type != TestType::PulseTest {
            return Vec::new();
        }
        if !config.persist_calibrated_wave_speed {
            self.logger
                .detail("calibrated wave speed not persisted (disabled in config)");
            return Vec::new();
        }
        if !wave_speed.is_finite() || wave_speed <= 0.0 {
            self.logger.warn(&format!(
                "refusing to store wave speed {wave_speed} on the bars"
            ));
            return Vec::new();
        }
        BarRole::ALL
            .iter()
            .map(|&role| {
                let bar = record.bar(role);
                WaveSpeedUpdate {
                    bar: bar.instance.clone(),
                    node: bar.properties.node(key::WAVE_SPEED).map(str::to_string),
                    value: wave_speed,
                }
            })
            .collect()
    }
}

impl Default for SignalExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessingStage for SignalExtractor {
    type Input = ExperimentRecord;
    type Output = ExtractionOutput;

    fn initialize(&mut self, config: &AnalysisConfig) -> AnalysisResult<()> {
        if config.zero_cutoff < 0.0 || !config.zero_cutoff.is_finite() {
            return Err(AnalysisError::InvalidInput(format!(
                "zero cutoff {} must be a finite non-negative number",
                config.zero_cutoff
            )));
        }
        self.config = Some(config.clone());
        Ok(())
    }

    fn execute(&mut self, record: &ExperimentRecord) -> AnalysisResult<ExtractionOutput> {
        let config = self
            .config
            .clone()
            .ok_or_else(|| AnalysisError::InvalidInput("signal extractor not configured".into()))?;
        let deadline = Deadline::from_config(&config);
        self.logger = LogManager::for_experiment(record.label());

        let incident_raw = Self::single(record, SignalRole::Incident)?;
        let transmitted_raw = Self::single(record, SignalRole::Transmitted)?;
        let time_raw = Self::single(record, SignalRole::Time)?;
        Self::require_unit(time_raw, Unit::Millisecond)?;
        match record.signals_of(SignalRole::Temperature).as_slice() {
            [] => self.logger.detail("no temperature signal recorded"),
            [temperature] => Self::require_unit(temperature, Unit::DegreesCelsius)?,
            many => {
                return Err(AnalysisError::Unimplemented(format!(
                    "{} temperature sensor signals, at most one is supported",
                    many.len()
                )))
            }
        }

        let incident = self.strain_of(record, incident_raw, BarRole::Incident)?;
        let transmitted = self.strain_of(record, transmitted_raw, BarRole::Transmitted)?;
        let time = time_raw.samples.as_slice();
        deadline.check("signal acquisition")?;

        let (wave_speed, pulse_speed) =
            self.wave_speeds(record, &config, (time, &incident, &transmitted), &deadline)?;

        let striker = &record.striker_bar;
        let timing = PulseTiming::from_striker(
            striker.require(key::ORIGINAL_LENGTH)?,
            striker.require(key::DENSITY)?,
            striker.require(key::VELOCITY)?,
            wave_speed,
        );
        self.logger.record(&format!(
            "loading duration {:.2e} ms, stress wave length {:.2e} mm",
            timing.duration, timing.length
        ));
        self.logger.detail(&format!(
            "incident stress amplitude {:.4e} GPa, strain amplitude {:.2e}",
            timing.stress_amplitude, timing.strain_amplitude
        ));

        let pulse_points = timing.pulse_points(time)?;
        let time_step = StatsHelper::mean_step(time).unwrap_or_default();
        self.logger
            .record(&format!("{pulse_points} time points per pulse window"));

        let window = |signal: &[f64], polarity: SignPolarity| {
            pulse::locate_window(
                signal,
                &WindowSpec::from_config(&config, pulse_points, polarity),
                &deadline,
            )
        };
        let incident_window = window(&incident, config.incident_polarity)?;
        let reflected_window = window(&incident, config.reflected_polarity)?;
        let transmitted_window = window(&transmitted, config.transmitted_polarity)?;
        for (role, found) in [
            (SignalRole::Incident, &incident_window),
            (SignalRole::Reflected, &reflected_window),
            (SignalRole::Transmitted, &transmitted_window),
        ] {
            let at = time.get(found.peak_index).copied().unwrap_or(f64::NAN);
            self.logger.detail(&format!(
                "{role:?} peak {:.4e} at {at:.4e} ms, window from index {}",
                found.peak, found.anchor
            ));
        }
        let baseline = StatsHelper::rms(&incident[..incident_window.anchor]);
        if baseline > config.zero_cutoff {
            self.logger.warn(&format!(
                "pre-pulse noise {baseline:.2e} exceeds the zero cutoff {:.2e}",
                config.zero_cutoff
            ));
        }

        let factor = config.interpolation.max(1);
        let extracted_time = InterpHelper::linspace(
            0.0,
            time_step * (pulse_points - 1) as f64,
            pulse_points * factor,
        );

        let front: Vec<f64> = incident_window
            .samples
            .iter()
            .zip(&reflected_window.samples)
            .map(|(i, r)| wave_speed * (i - r))
            .collect();
        let back: Vec<f64> = transmitted_window
            .samples
            .iter()
            .map(|t| wave_speed * t)
            .collect();

        let properties = vec![
            PulseProperty {
                kind: PulsePropertyKind::Duration,
                value: timing.duration,
            },
            PulseProperty {
                kind: PulsePropertyKind::Length,
                value: timing.length,
            },
            PulseProperty {
                kind: PulsePropertyKind::Speed,
                value: pulse_speed,
            },
            PulseProperty {
                kind: PulsePropertyKind::StressAmplitude,
                value: timing.stress_amplitude * 1000.0,
            },
            PulseProperty {
                kind: PulsePropertyKind::StrainAmplitude,
                value: timing.strain_amplitude,
            },
        ];

        let wave_speed_updates = self.wave_speed_updates(record, &config, wave_speed);
        deadline.check("signal extraction")?;

        Ok(ExtractionOutput {
            test_type: record.test_type,
            wave_speed,
            pulse_speed,
            timing,
            pulse_points,
            time_step,
            properties,
            signals: vec![
                ExtractedSignal {
                    role: SignalRole::Incident,
                    samples: incident_window.samples,
                },
                ExtractedSignal {
                    role: SignalRole::Reflected,
                    samples: reflected_window.samples,
                },
                ExtractedSignal {
                    role: SignalRole::Transmitted,
                    samples: transmitted_window.samples,
                },
                ExtractedSignal {
                    role: SignalRole::Time,
                    samples: extracted_time,
                },
            ],
            particle_velocities: vec![
                SeriesEntity {
                    kind: SeriesKind::ParticleVelocityFront,
                    samples: front,
                },
                SeriesEntity {
                    kind: SeriesKind::ParticleVelocityBack,
                    samples: back,
                },
            ],
            wave_speed_updates,
        })
    }

    fn cleanup(&mut self) {
        self.config = None;
        self.logger = LogManager::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::fixtures;
    use crate::store::{codec, PropertyStore, Value};

    fn run(graph: &crate::store::Graph, config: &AnalysisConfig) -> AnalysisResult<ExtractionOutput> {
        let record = ExperimentRecord::load(graph)?;
        let mut stage = SignalExtractor::new();
        stage.initialize(config)?;
        let output = stage.execute(&record);
        stage.cleanup();
        output
    }

    #[test]
    fn specimen_test_uses_recorded_wave_speed() {
        let graph = fixtures::experiment("S01", TestType::SpecimenTest);
        let output = run(&graph, &AnalysisConfig::default()).unwrap();

        assert_eq!(output.wave_speed, fixtures::WAVE_SPEED);
        // gauges + specimen = 210 mm over 40 samples
        assert!((output.pulse_speed - 210.0 / 0.04).abs() < 0.5);
        assert_eq!(output.pulse_points, fixtures::PULSE_POINTS);
        assert!(output.wave_speed_updates.is_empty());

        let incident = output.signal(SignalRole::Incident).unwrap();
        let reflected = output.signal(SignalRole::Reflected).unwrap();
        let transmitted = output.signal(SignalRole::Transmitted).unwrap();
        assert_eq!(incident.len(), fixtures::PULSE_POINTS);
        assert!((incident[5] + 0.001).abs() < 1e-8);
        assert!((reflected[5] - 0.0004).abs() < 1e-8);
        assert!((transmitted[5] + 0.0006).abs() < 1e-8);
        assert_eq!(incident[0], 0.0);

        let time = output.signal(SignalRole::Time).unwrap();
        assert_eq!(time.len(), fixtures::PULSE_POINTS);
        assert_eq!(time[0], 0.0);
        assert!((time[19] - 0.019).abs() < 1e-6);

        let front = &output.particle_velocities[0];
        assert_eq!(front.kind, SeriesKind::ParticleVelocityFront);
        assert!((front.samples[5] + 5000.0 * 0.0014).abs() < 1e-4);
        let stress = output.property(PulsePropertyKind::StressAmplitude).unwrap();
        assert!((stress - 200.0).abs() < 1e-3);
    }

    #[test]
    fn pulse_test_calibrates_all_bars() {
        let graph = fixtures::experiment("P01", TestType::PulseTest);
        let output = run(&graph, &AnalysisConfig::default()).unwrap();

        assert!((output.wave_speed - 5000.0).abs() < 0.5);
        assert_eq!(output.pulse_speed, output.wave_speed);
        assert_eq!(output.wave_speed_updates.len(), 3);
        assert!(output.wave_speed_updates.iter().all(|u| u.node.is_some()));

        let disabled = AnalysisConfig {
            persist_calibrated_wave_speed: false,
            ..AnalysisConfig::default()
        };
        assert!(run(&graph, &disabled).unwrap().wave_speed_updates.is_empty());
    }

    #[test]
    fn interpolation_scales_every_window() {
        let graph = fixtures::experiment("S02", TestType::SpecimenTest);
        let config = AnalysisConfig {
            interpolation: 3,
            ..AnalysisConfig::default()
        };
        let output = run(&graph, &config).unwrap();
        for signal in &output.signals {
            assert_eq!(signal.samples.len(), 60, "{:?}", signal.role);
        }
    }

    #[test]
    fn second_incident_signal_is_unimplemented() {
        let mut graph = fixtures::experiment("S03", TestType::SpecimenTest);
        let extra = "dynamat:IncidentSensorSignal_1";
        graph.add(extra, pred::RDF_TYPE, Value::iri("dynamat:IncidentSensorSignal"));
        graph.add(extra, pred::HAS_ENCODING, Value::string("base64Binary"));
        graph.add(extra, pred::HAS_SIZE, Value::int(1));
        graph.add(extra, pred::HAS_ENCODED_DATA, Value::base64(codec::encode_f32(&[0.0])));
        graph.add(extra, pred::HAS_UNITS, Value::iri("dynamat:Unitless"));

        let err = run(&graph, &AnalysisConfig::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::Unimplemented(_)));
    }

    #[test]
    fn time_axis_must_be_in_milliseconds() {
        let mut graph = fixtures::experiment("S04", TestType::SpecimenTest);
        graph.set(
            "dynamat:TimeSensorSignal_0",
            pred::HAS_UNITS,
            Value::iri("dynamat:Second"),
        );
        let err = run(&graph, &AnalysisConfig::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::UnsupportedUnit { .. }));
    }

    #[test]
    fn missing_striker_velocity_is_reported() {
        let mut graph = fixtures::experiment("S05", TestType::SpecimenTest);
        let striker = graph.instances_of("dynamat:StrikerBar").remove(0);
        let velocity = format!("{striker}_Velocity");
        graph.remove(&striker, Some(pred::HAS_DIMENSION), Some(&Value::iri(&velocity)));

        let err = run(&graph, &AnalysisConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::MissingProperty { ref property, .. } if property == key::VELOCITY
        ));
    }

    #[test]
    fn unconfigured_stage_refuses_to_run() {
        let graph = fixtures::experiment("S06", TestType::SpecimenTest);
        let record = ExperimentRecord::load(&graph).unwrap();
        let mut stage = SignalExtractor::new();
        assert!(stage.execute(&record).is_err());
    }
}
