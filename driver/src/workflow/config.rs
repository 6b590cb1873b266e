use anyhow::Context;
use serde::{Deserialize, Serialize};
use shpbcore::model::ExperimentRecord;
use shpbcore::validation::{ShapeSet, ShapeValidator};
use shpbcore::vocab::{self, TestType};
use shpbcore::AnalysisConfig;
use std::fs;
use std::path::{Path, PathBuf};

/// Shape files keyed by the experiment facet they check.
///
/// Missing metadata and test-type entries fall back to the built-in shapes;
/// mode and temperature shapes only run when a file is configured.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeCatalog {
    pub metadata: Option<PathBuf>,
    pub specimen_test: Option<PathBuf>,
    pub pulse_test: Option<PathBuf>,
    pub lab_mode: Option<PathBuf>,
    pub fea_mode: Option<PathBuf>,
    pub room_temperature: Option<PathBuf>,
    pub high_temperature: Option<PathBuf>,
}

fn load_shapes(path: &Path) -> anyhow::Result<ShapeSet> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("reading shape file {}", path.display()))?;
    serde_yaml::from_str(&contents)
        .with_context(|| format!("parsing shape file {}", path.display()))
}

impl ShapeCatalog {
    /// Validator holding every shape set that applies to `record`.
    pub fn validator_for(&self, record: &ExperimentRecord) -> anyhow::Result<ShapeValidator> {
        let mut validator = ShapeValidator::default();
        validator.push(match &self.metadata {
            Some(path) => load_shapes(path)?,
            None => ShapeSet::metadata(),
        });

        let (configured, builtin) = match record.test_type {
            TestType::SpecimenTest => (&self.specimen_test, ShapeSet::specimen_test()),
            TestType::PulseTest => (&self.pulse_test, ShapeSet::pulse_test()),
        };
        validator.push(match configured {
            Some(path) => load_shapes(path)?,
            None => builtin,
        });

        let mode = record.test_mode.as_deref().map(vocab::local_name);
        let mode_shapes = match mode {
            Some("LABMode") => self.lab_mode.as_ref(),
            Some("FEAMode") => self.fea_mode.as_ref(),
            _ => None,
        };
        let temperature = record.test_temperature.as_deref().map(vocab::local_name);
        let temperature_shapes = match temperature {
            Some("RoomTemperature") => self.room_temperature.as_ref(),
            Some("HighTemperature") => self.high_temperature.as_ref(),
            _ => None,
        };
        for path in mode_shapes.into_iter().chain(temperature_shapes) {
            validator.push(load_shapes(path)?);
        }
        Ok(validator)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Folder holding the permanent experiment collection.
    pub database: PathBuf,
    /// Ontology graph used to describe unit individuals during conversion.
    pub ontology: Option<PathBuf>,
    pub workers: usize,
    pub analysis: AnalysisConfig,
    pub shapes: ShapeCatalog,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("database"),
            ontology: None,
            workers: 4,
            analysis: AnalysisConfig::default(),
            shapes: ShapeCatalog::default(),
        }
    }
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn with_overrides(mut self, overrides: &Overrides) -> Self {
        if let Some(database) = &overrides.database {
            self.database = database.clone();
        }
        if let Some(workers) = overrides.workers {
            self.workers = workers;
        }
        if let Some(interpolation) = overrides.interpolation {
            self.analysis.interpolation = interpolation;
        }
        if let Some(secs) = overrides.deadline_secs {
            self.analysis.deadline_secs = Some(secs);
        }
        self
    }

    pub fn to_analysis_config(&self) -> AnalysisConfig {
        self.analysis.clone()
    }
}

/// Command-line values that take precedence over the YAML file.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub database: Option<PathBuf>,
    pub workers: Option<usize>,
    pub interpolation: Option<usize>,
    pub deadline_secs: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::profile::{build_experiment, GeneratorConfig};
    use rand::{rngs::StdRng, SeedableRng};
    use shpbcore::prelude::SignPolarity;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn config_load_reads_yaml() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(
            b"database: /data/shpb\nworkers: 2\nanalysis:\n  interpolation: 4\n  reflected_polarity: negative\n",
        )
        .unwrap();
        let path = temp.into_temp_path();
        let cfg = WorkflowConfig::load(&path).unwrap();
        assert_eq!(cfg.workers, 2);
        assert_eq!(cfg.database, PathBuf::from("/data/shpb"));
        assert_eq!(cfg.analysis.interpolation, 4);
        assert_eq!(cfg.analysis.reflected_polarity, SignPolarity::Negative);
        assert_eq!(cfg.analysis.zero_cutoff, AnalysisConfig::default().zero_cutoff);
    }

    #[test]
    fn overrides_win_over_file_values() {
        let cfg = WorkflowConfig::default().with_overrides(&Overrides {
            workers: Some(8),
            deadline_secs: Some(30),
            ..Default::default()
        });
        assert_eq!(cfg.workers, 8);
        assert_eq!(cfg.to_analysis_config().deadline_secs, Some(30));
        assert_eq!(cfg.database, PathBuf::from("database"));
    }

    #[test]
    fn catalog_adds_configured_mode_shapes() {
        let mut shapes = NamedTempFile::new().unwrap();
        shapes
            .write_all(
                b"name: lab\nshapes:\n  - target_class: dynamat:TestingConditions\n    properties:\n      - path: dynamat:hasTestMode\n        min_count: 1\n",
            )
            .unwrap();
        let path = shapes.into_temp_path();

        let mut rng = StdRng::seed_from_u64(1);
        let (_, graph) = build_experiment(&GeneratorConfig::default(), 0, &mut rng).unwrap();
        let record = ExperimentRecord::load(&graph).unwrap();

        let catalog = ShapeCatalog {
            lab_mode: Some(path.to_path_buf()),
            ..Default::default()
        };
        let validator = catalog.validator_for(&record).unwrap();
        let names: Vec<&str> = validator.sets().iter().map(|set| set.name.as_str()).collect();
        assert_eq!(names.len(), 3);
        assert_eq!(names[0], "metadata");
        assert_eq!(names[2], "lab");
    }
}
