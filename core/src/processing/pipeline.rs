use crate::model::ExperimentRecord;
use crate::prelude::{AnalysisConfig, AnalysisError, AnalysisResult, ProcessingStage};
use crate::processing::extractor::SignalExtractor;
use crate::processing::persist::SecondaryDataWriter;
use crate::processing::series::{SeriesInput, SeriesOutput, SeriesStage};
use crate::store::{Graph, PropertyStore};
use crate::telemetry::LogManager;
use crate::units::{ConversionReport, Unit, UnitConverter};
use crate::vocab::{self, class, Producer, PulsePropertyKind, SignalRole, TestType};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PulseSummary {
    pub name: String,
    pub value: f64,
    pub unit: String,
}

/// What one analysis run found and wrote.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisSummary {
    pub test_name: String,
    pub test_type: String,
    pub test_mode: Option<String>,
    pub test_temperature: Option<String>,
    pub specimens: usize,
    pub sensor_signals: usize,
    pub extracted_signals: usize,
    pub series: usize,
    pub wave_speed: f64,
    pub pulse_properties: Vec<PulseSummary>,
    pub units_converted: usize,
}

impl AnalysisSummary {
    fn collect<S: PropertyStore + ?Sized>(store: &S, record: &ExperimentRecord, wave_speed: f64) -> Self {
        let sensor_signals = [
            SignalRole::Incident,
            SignalRole::Transmitted,
            SignalRole::Time,
            SignalRole::Temperature,
        ]
        .iter()
        .filter_map(|role| role.sensor_class())
        .map(|class| store.instances_of(&class).len())
        .sum();

        let pulse_properties = PulsePropertyKind::ALL
            .iter()
            .filter_map(|kind| {
                let value = store
                    .first_object(kind.instance(), vocab::pred::HAS_VALUE)?
                    .as_f64()?;
                let unit = Unit::from_iri(&vocab::expand(kind.unit()))
                    .map(|unit| unit.abbreviation().to_string())
                    .unwrap_or_default();
                Some(PulseSummary {
                    name: vocab::local_name(&vocab::expand(kind.class())).to_string(),
                    value,
                    unit,
                })
            })
            .collect();

        let local = |iri: &Option<String>| iri.as_deref().map(|iri| vocab::local_name(iri).to_string());
        Self {
            test_name: record.label(),
            test_type: vocab::local_name(&vocab::expand(record.test_type.iri())).to_string(),
            test_mode: local(&record.test_mode),
            test_temperature: local(&record.test_temperature),
            specimens: store.instances_of(class::SPECIMEN).len(),
            sensor_signals,
            extracted_signals: store.instances_of(class::EXTRACTED_SIGNAL).len(),
            series: store.instances_of(class::SERIES_DATA).len(),
            wave_speed,
            pulse_properties,
            units_converted: 0,
        }
    }
}

impl fmt::Display for AnalysisSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Test: {} ({})", self.test_name, self.test_type)?;
        writeln!(
            f,
            "Mode: {}  Temperature: {}",
            self.test_mode.as_deref().unwrap_or("-"),
            self.test_temperature.as_deref().unwrap_or("-")
        )?;
        writeln!(
            f,
            "Specimens: {}  Sensor signals: {}  Extracted signals: {}  Series: {}",
            self.specimens, self.sensor_signals, self.extracted_signals, self.series
        )?;
        writeln!(f, "Wave speed: {:.2} m/s", self.wave_speed)?;
        for property in &self.pulse_properties {
            writeln!(f, "  {}: {:.4e} {}", property.name, property.value, property.unit)?;
        }
        if self.units_converted > 0 {
            writeln!(f, "Units converted: {}", self.units_converted)?;
        }
        Ok(())
    }
}

/// Load, extract, derive and write back one experiment.
///
/// Everything is computed before the first write, so a failing experiment
/// leaves its graph as it found it.
pub struct AnalysisPipeline<'o> {
    config: AnalysisConfig,
    ontology: Option<&'o Graph>,
}

impl<'o> AnalysisPipeline<'o> {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            ontology: None,
        }
    }

    /// Unit metadata is copied from `ontology` during conversion.
    pub fn with_ontology(mut self, ontology: &'o Graph) -> Self {
        self.ontology = Some(ontology);
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    fn converter(&self) -> UnitConverter<'o> {
        match self.ontology {
            Some(ontology) => UnitConverter::with_ontology(ontology),
            None => UnitConverter::new(),
        }
    }

    pub fn convert_units(&self, graph: &mut Graph) -> AnalysisResult<ConversionReport> {
        self.converter().convert(graph)
    }

    /// Unit conversion followed by the full analysis.
    pub fn run(&self, graph: &mut Graph) -> AnalysisResult<AnalysisSummary> {
        let report = self.convert_units(graph)?;
        let mut summary = self.analyze(graph)?;
        summary.units_converted = report.total();
        Ok(summary)
    }

    /// Analysis of a graph whose units are already canonical.
    pub fn analyze<S: PropertyStore + ?Sized>(&self, store: &mut S) -> AnalysisResult<AnalysisSummary> {
        let record = ExperimentRecord::load(&*store)?;
        let logger = LogManager::for_experiment(record.label());

        let mut extractor = SignalExtractor::new();
        extractor.initialize(&self.config)?;
        let extraction = extractor.execute(&record);
        extractor.cleanup();
        let extraction = extraction?;

        let series = match record.test_type {
            TestType::SpecimenTest => {
                let input = SeriesInput::from_extraction(&record, &extraction)?;
                Some(self.series(&input)?)
            }
            TestType::PulseTest => None,
        };

        let mut writer = SecondaryDataWriter::new(store);
        let cleared = writer.clear_all();
        writer.wave_speeds(&extraction.wave_speed_updates);
        writer.pulse_properties(&extraction.properties);
        writer.extracted_signals(&extraction.signals);
        writer.series(&extraction.particle_velocities);
        if let Some(series) = &series {
            writer.series(&series.series);
        }
        writer.describe_units(&self.converter());
        logger.record(&format!(
            "secondary data rewritten ({cleared} stale triples cleared)"
        ));

        Ok(AnalysisSummary::collect(&*store, &record, extraction.wave_speed))
    }

    /// Recomputes only the series data from extracted signals already in the store.
    pub fn rerun_series<S: PropertyStore + ?Sized>(&self, store: &mut S) -> AnalysisResult<SeriesOutput> {
        let record = ExperimentRecord::load(&*store)?;
        if record.test_type != TestType::SpecimenTest {
            return Err(AnalysisError::InvalidInput(format!(
                "{}: series data needs a specimen test",
                record.label()
            )));
        }
        let input = SeriesInput::from_store(&*store, &record)?;
        let output = self.series(&input)?;

        let mut writer = SecondaryDataWriter::new(store);
        writer.clear_series(Producer::Series);
        writer.series(&output.series);
        writer.describe_units(&self.converter());
        Ok(output)
    }

    fn series(&self, input: &SeriesInput) -> AnalysisResult<SeriesOutput> {
        let mut stage = SeriesStage::new();
        stage.initialize(&self.config)?;
        let output = stage.execute(input);
        stage.cleanup();
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::fixtures;
    use crate::store::Value;
    use crate::vocab::{key, pred, BarRole, SeriesKind};

    #[test]
    fn specimen_test_writes_all_secondary_data() {
        let mut graph = fixtures::experiment("S20", TestType::SpecimenTest);
        let summary = AnalysisPipeline::new(AnalysisConfig::default())
            .run(&mut graph)
            .unwrap();

        assert_eq!(summary.test_name, "S20");
        assert_eq!(summary.test_type, "SpecimenTest");
        assert_eq!(summary.test_mode.as_deref(), Some("LABMode"));
        assert_eq!(summary.specimens, 1);
        assert_eq!(summary.sensor_signals, 3);
        assert_eq!(summary.extracted_signals, 4);
        assert_eq!(summary.series, SeriesKind::ALL.len());
        assert_eq!(summary.pulse_properties.len(), 5);
        assert!(summary.to_string().contains("Extracted signals: 4"));

        let strain = graph
            .first_object(SeriesKind::EngineeringStrain.instance(), pred::HAS_SIZE)
            .and_then(|v| v.as_usize());
        assert_eq!(strain, Some(fixtures::PULSE_POINTS));
    }

    #[test]
    fn rerun_is_idempotent() {
        let mut graph = fixtures::experiment("S21", TestType::SpecimenTest);
        let pipeline = AnalysisPipeline::new(AnalysisConfig::default());
        pipeline.run(&mut graph).unwrap();
        let first = graph.clone();
        pipeline.run(&mut graph).unwrap();
        assert_eq!(graph, first);
    }

    #[test]
    fn derived_units_are_described() {
        let mut graph = fixtures::experiment("S22", TestType::SpecimenTest);
        AnalysisPipeline::new(AnalysisConfig::default())
            .run(&mut graph)
            .unwrap();

        let units = SeriesKind::ALL
            .iter()
            .map(|kind| kind.unit())
            .chain(PulsePropertyKind::ALL.iter().map(|kind| kind.unit()))
            .chain([SignalRole::Incident.extracted_unit(), SignalRole::Time.extracted_unit()]);
        for unit in units {
            assert!(
                !graph.objects(unit, pred::RDFS_LABEL).is_empty(),
                "{unit} has no label"
            );
        }
        assert_eq!(
            graph.objects("dynamat:Millijoule", pred::HAS_ABBREVIATION),
            vec![Value::string("mJ")]
        );
    }

    #[test]
    fn derived_units_prefer_ontology_metadata() {
        let mut ontology = Graph::new();
        ontology.add("dynamat:Hertz", pred::RDFS_LABEL, Value::string("Hertz (1/s)"));
        let mut graph = fixtures::experiment("S23", TestType::SpecimenTest);
        AnalysisPipeline::new(AnalysisConfig::default())
            .with_ontology(&ontology)
            .run(&mut graph)
            .unwrap();

        assert_eq!(
            graph.objects("dynamat:Hertz", pred::RDFS_LABEL),
            vec![Value::string("Hertz (1/s)")]
        );
        assert!(!graph.objects("dynamat:Millijoule", pred::RDFS_LABEL).is_empty());
    }

    #[test]
    fn pulse_test_writes_no_series_and_calibrates_bars() {
        let mut graph = fixtures::experiment("P20", TestType::PulseTest);
        let summary = AnalysisPipeline::new(AnalysisConfig::default())
            .run(&mut graph)
            .unwrap();

        assert_eq!(summary.specimens, 0);
        // particle velocities only
        assert_eq!(summary.series, 2);
        let record = ExperimentRecord::load(&graph).unwrap();
        for role in BarRole::ALL {
            let speed = record.bar(role).require(key::WAVE_SPEED).unwrap();
            assert!((speed - summary.wave_speed).abs() < 1e-2);
        }
    }

    #[test]
    fn failed_analysis_leaves_graph_untouched() {
        let mut graph = fixtures::experiment("S22", TestType::SpecimenTest);
        let specimen = graph.instances_of(class::SPECIMEN).remove(0);
        let length = format!("{specimen}_OriginalLength");
        graph.remove(&length, Some(pred::HAS_VALUE), None);
        let before = graph.clone();

        let err = AnalysisPipeline::new(AnalysisConfig::default())
            .analyze(&mut graph)
            .unwrap_err();
        assert!(matches!(err, AnalysisError::MissingProperty { .. }));
        assert_eq!(graph, before);
    }

    #[test]
    fn series_rerun_reads_persisted_signals() {
        let mut graph = fixtures::experiment("S23", TestType::SpecimenTest);
        let pipeline = AnalysisPipeline::new(AnalysisConfig::default());
        pipeline.run(&mut graph).unwrap();

        let output = pipeline.rerun_series(&mut graph).unwrap();
        assert_eq!(output.series.len(), 13);
        assert_eq!(graph.instances_of(class::SERIES_DATA).len(), SeriesKind::ALL.len());
    }

    #[test]
    fn units_are_converted_before_analysis() {
        let mut graph = fixtures::experiment("S24", TestType::SpecimenTest);
        let specimen = graph.instances_of(class::SPECIMEN).remove(0);
        let length = format!("{specimen}_OriginalLength");
        graph.set(&length, pred::HAS_VALUE, Value::float(0.01));
        graph.set(&length, pred::HAS_UNITS, Value::iri("dynamat:Meter"));

        let summary = AnalysisPipeline::new(AnalysisConfig::default())
            .run(&mut graph)
            .unwrap();
        assert!(summary.units_converted > 0);
        let record = ExperimentRecord::load(&graph).unwrap();
        let converted = record.specimen.unwrap().require(key::ORIGINAL_LENGTH).unwrap();
        assert!((converted - 10.0).abs() < 1e-4);
    }
}
