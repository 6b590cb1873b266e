use crate::math::IntegrateHelper;
use crate::model::{ExperimentRecord, RawSignal, SeriesEntity};
use crate::prelude::{AnalysisConfig, AnalysisError, AnalysisResult, ProcessingStage};
use crate::processing::extractor::ExtractionOutput;
use crate::store::PropertyStore;
use crate::telemetry::LogManager;
use crate::vocab::{self, class, key, pred, Producer, PulsePropertyKind, SeriesKind, SignalRole};
use ndarray::Array1;

/// Pulse windows and constants the one-dimensional wave analysis needs.
///
/// Lengths in mm, areas in mm², modulus in MPa, density in kg/mm³, wave speed
/// in m/s and times in ms.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesInput {
    pub time: Vec<f64>,
    pub incident: Vec<f64>,
    pub reflected: Vec<f64>,
    pub transmitted: Vec<f64>,
    pub pulse_duration: f64,
    pub specimen_length: f64,
    pub specimen_area: f64,
    pub bar_area: f64,
    pub bar_modulus: f64,
    pub bar_density: f64,
    pub wave_speed: f64,
}

struct Constants {
    pulse_duration: f64,
    specimen_length: f64,
    specimen_area: f64,
    bar_area: f64,
    bar_modulus: f64,
    bar_density: f64,
    wave_speed: f64,
}

impl Constants {
    /// Specimen geometry plus the incident bar, which the wave meets first.
    fn from_record(record: &ExperimentRecord, pulse_duration: f64) -> AnalysisResult<Self> {
        let specimen = record
            .specimen
            .as_ref()
            .ok_or_else(|| AnalysisError::missing("experiment", class::SPECIMEN))?;
        let bar = &record.incident_bar;
        Ok(Self {
            pulse_duration,
            specimen_length: specimen.require(key::ORIGINAL_LENGTH)?,
            specimen_area: specimen.require(key::CROSS_SECTION)?,
            bar_area: bar.require(key::CROSS_SECTION)?,
            bar_modulus: bar.require(key::ELASTIC_MODULUS)?,
            bar_density: bar.require(key::DENSITY)?,
            wave_speed: bar.require(key::WAVE_SPEED)?,
        })
    }

    fn with_signals(self, signals: [Vec<f64>; 4]) -> SeriesInput {
        let [time, incident, reflected, transmitted] = signals;
        SeriesInput {
            time,
            incident,
            reflected,
            transmitted,
            pulse_duration: self.pulse_duration,
            specimen_length: self.specimen_length,
            specimen_area: self.specimen_area,
            bar_area: self.bar_area,
            bar_modulus: self.bar_modulus,
            bar_density: self.bar_density,
            wave_speed: self.wave_speed,
        }
    }
}

impl SeriesInput {
    /// Builds the input straight from an extraction that has not been written yet.
    pub fn from_extraction(record: &ExperimentRecord, output: &ExtractionOutput) -> AnalysisResult<Self> {
        let pulse_duration = output
            .property(PulsePropertyKind::Duration)
            .ok_or_else(|| AnalysisError::missing("extraction", PulsePropertyKind::Duration.class()))?;
        let signal = |role: SignalRole| {
            output
                .signal(role)
                .map(<[f64]>::to_vec)
                .ok_or_else(|| AnalysisError::missing("extraction", role.extracted_class()))
        };
        let signals = [
            signal(SignalRole::Time)?,
            signal(SignalRole::Incident)?,
            signal(SignalRole::Reflected)?,
            signal(SignalRole::Transmitted)?,
        ];
        Ok(Constants::from_record(record, pulse_duration)?.with_signals(signals))
    }

    /// Reads previously persisted extracted signals and pulse duration.
    pub fn from_store<S: PropertyStore + ?Sized>(
        store: &S,
        record: &ExperimentRecord,
    ) -> AnalysisResult<Self> {
        let duration_node = PulsePropertyKind::Duration.instance();
        let pulse_duration = store
            .first_object(duration_node, pred::HAS_VALUE)
            .and_then(|value| value.as_f64())
            .ok_or_else(|| AnalysisError::missing(duration_node, pred::HAS_VALUE))?;

        let signal = |role: SignalRole| -> AnalysisResult<Vec<f64>> {
            let class = role.extracted_class();
            let instance = store
                .instances_of(&class)
                .into_iter()
                .next()
                .ok_or_else(|| AnalysisError::missing("experiment", class.as_str()))?;
            Ok(RawSignal::load(store, &instance, role)?.samples)
        };
        let signals = [
            signal(SignalRole::Time)?,
            signal(SignalRole::Incident)?,
            signal(SignalRole::Reflected)?,
            signal(SignalRole::Transmitted)?,
        ];
        Ok(Constants::from_record(record, pulse_duration)?.with_signals(signals))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesOutput {
    pub series: Vec<SeriesEntity>,
}

impl SeriesOutput {
    pub fn get(&self, kind: SeriesKind) -> Option<&[f64]> {
        self.series
            .iter()
            .find(|entity| entity.kind == kind)
            .map(|entity| entity.samples.as_slice())
    }
}

/// Strain rate, strain, stress and energy histories at the specimen faces.
pub struct SeriesStage {
    config: Option<AnalysisConfig>,
    logger: LogManager,
}

impl SeriesStage {
    pub fn new() -> Self {
        Self {
            config: None,
            logger: LogManager::new(),
        }
    }

    fn report_extremum(&self, kind: SeriesKind, values: &Array1<f64>, time: &Array1<f64>) {
        let peak = values
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, f64)>, (i, &v)| match best {
                Some((_, b)) if b.abs() >= v.abs() => best,
                _ => Some((i, v)),
            });
        if let Some((index, value)) = peak {
            self.logger.detail(&format!(
                "{} peaks at {value:.3e} {} at {:.3e} ms",
                kind.legend(),
                vocab::local_name(&vocab::expand(kind.unit())),
                time[index]
            ));
        }
    }
}

impl Default for SeriesStage {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessingStage for SeriesStage {
    type Input = SeriesInput;
    type Output = SeriesOutput;

    fn initialize(&mut self, config: &AnalysisConfig) -> AnalysisResult<()> {
        self.config = Some(config.clone());
        Ok(())
    }

    fn execute(&mut self, input: &SeriesInput) -> AnalysisResult<SeriesOutput> {
        self.config
            .as_ref()
            .ok_or_else(|| AnalysisError::InvalidInput("series stage not configured".into()))?;

        let n = input.time.len();
        for (name, samples) in [
            ("incident", &input.incident),
            ("reflected", &input.reflected),
            ("transmitted", &input.transmitted),
        ] {
            if samples.len() != n {
                return Err(AnalysisError::SizeMismatch {
                    instance: format!("extracted {name} signal"),
                    expected: n,
                    actual: samples.len(),
                });
            }
        }
        if input.specimen_length <= 0.0 || input.specimen_area <= 0.0 {
            return Err(AnalysisError::InvalidInput(format!(
                "specimen length {} mm and area {} mm² must be positive",
                input.specimen_length, input.specimen_area
            )));
        }

        let time = Array1::from(input.time.clone());
        let incident = Array1::from(input.incident.clone());
        let reflected = Array1::from(input.reflected.clone());
        let transmitted = Array1::from(input.transmitted.clone());

        let c = input.wave_speed;
        let rate_scale = c / input.specimen_length;
        let stress_scale = input.bar_area * input.bar_modulus / input.specimen_area;
        let energy_scale = 0.5 * input.bar_area * c * input.bar_modulus * input.pulse_duration;
        let kinetic_scale =
            0.5 * 1000.0 * input.bar_area * c.powi(3) * input.bar_density * input.pulse_duration;

        let net = &incident - &reflected - &transmitted;
        let strain_rate = &net * (rate_scale * 1000.0);
        let strain = IntegrateHelper::cumulative_trapezoid(net.view(), time.view()) * rate_scale;
        let true_strain = strain.mapv(f64::ln_1p);

        let stress_front = (&incident + &reflected) * stress_scale;
        let stress_back = &transmitted * stress_scale;
        let stretch = strain.mapv(|e| 1.0 + e);
        let true_stress_front = &stress_front * &stretch;
        let true_stress_back = &stress_back * &stretch;

        let pulse_energy = |name: &str, pulse: &Array1<f64>| {
            let true_strain = pulse.mapv(f64::ln_1p);
            let largest = true_strain.iter().fold(0.0_f64, |m, &e| if e.abs() > m.abs() { e } else { m });
            self.logger
                .detail(&format!("{name} true strain reaches {largest:.3e}"));
            true_strain.mapv(|e| energy_scale * e * e)
        };
        let incident_energy = pulse_energy("incident", &incident);
        let reflected_energy = pulse_energy("reflected", &reflected);
        let transmitted_energy = pulse_energy("transmitted", &transmitted);
        let squares = incident.mapv(|e| e * e) - reflected.mapv(|e| e * e) - transmitted.mapv(|e| e * e);
        let elastic = &squares * energy_scale;
        let kinetic = &squares * kinetic_scale;
        let total = &elastic + &kinetic;

        let computed = [
            (SeriesKind::EngineeringStrainRate, strain_rate),
            (SeriesKind::EngineeringStrain, strain),
            (SeriesKind::TrueStrain, true_strain),
            (SeriesKind::EngineeringStressFront, stress_front),
            (SeriesKind::EngineeringStressBack, stress_back),
            (SeriesKind::TrueStressFront, true_stress_front),
            (SeriesKind::TrueStressBack, true_stress_back),
            (SeriesKind::IncidentStrainEnergy, incident_energy),
            (SeriesKind::ReflectedStrainEnergy, reflected_energy),
            (SeriesKind::TransmittedStrainEnergy, transmitted_energy),
            (SeriesKind::AbsorbedElasticEnergy, elastic),
            (SeriesKind::AbsorbedKineticEnergy, kinetic),
            (SeriesKind::TotalAbsorbedEnergy, total),
        ];

        let mut series = Vec::with_capacity(computed.len());
        for (kind, values) in computed {
            debug_assert_eq!(kind.producer(), Producer::Series);
            self.report_extremum(kind, &values, &time);
            series.push(SeriesEntity {
                kind,
                samples: values.to_vec(),
            });
        }
        self.logger
            .record(&format!("{} series over {n} time points", series.len()));
        Ok(SeriesOutput { series })
    }

    fn cleanup(&mut self) {
        self.config = None;
    }
}
