use crate::workflow::config::WorkflowConfig;
use anyhow::Context;
use log::{error, info, warn};
use serde::Serialize;
use shpbcore::model::ExperimentRecord;
use shpbcore::prelude::ErrorCategory;
use shpbcore::telemetry::{Metrics, MetricsRecorder};
use shpbcore::validation::{ValidationReport, Validator};
use shpbcore::{AnalysisError, AnalysisPipeline, AnalysisSummary, Graph};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Result of pushing one file through the validation gate.
#[derive(Debug)]
pub enum IngestOutcome {
    Accepted {
        summary: AnalysisSummary,
        destination: PathBuf,
    },
    Rejected(ValidationReport),
}

/// Database file name for a test name, kept to a single path component.
fn database_file_name(test_name: Option<&str>) -> anyhow::Result<String> {
    let name = test_name.map(str::trim).unwrap_or_default();
    anyhow::ensure!(!name.is_empty(), "experiment has no test name");
    let stem: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let stem = stem.trim_start_matches('.');
    anyhow::ensure!(
        !stem.is_empty(),
        "test name {name:?} does not give a usable file name"
    );
    Ok(format!("{stem}.ttl"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchMode {
    /// Re-analyze files in place.
    Update,
    /// Validate and copy files into the database.
    Ingest,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileFailure {
    pub path: PathBuf,
    pub category: Option<ErrorCategory>,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileRejection {
    pub path: PathBuf,
    pub report: ValidationReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub processed: usize,
    pub failed: usize,
    pub rejected: usize,
    pub summaries: Vec<AnalysisSummary>,
    pub failures: Vec<FileFailure>,
    pub rejections: Vec<FileRejection>,
}

impl BatchSummary {
    fn new(metrics: Metrics) -> Self {
        Self {
            processed: metrics.processed,
            failed: metrics.failed,
            rejected: metrics.rejected,
            summaries: Vec::new(),
            failures: Vec::new(),
            rejections: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

enum FileOutcome {
    Processed(AnalysisSummary),
    Rejected(ValidationReport),
}

#[derive(Clone)]
pub struct Runner {
    config: Arc<WorkflowConfig>,
    ontology: Option<Arc<Graph>>,
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> anyhow::Result<Self> {
        let ontology = match &config.ontology {
            Some(path) => Some(Arc::new(
                Graph::load(path).with_context(|| format!("loading ontology {}", path.display()))?,
            )),
            None => None,
        };
        Ok(Self {
            config: Arc::new(config),
            ontology,
        })
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    fn pipeline(&self) -> AnalysisPipeline<'_> {
        let pipeline = AnalysisPipeline::new(self.config.to_analysis_config());
        match &self.ontology {
            Some(ontology) => pipeline.with_ontology(ontology),
            None => pipeline,
        }
    }

    fn load(path: &Path) -> anyhow::Result<Graph> {
        Graph::load(path).with_context(|| format!("loading {}", path.display()))
    }

    /// Converts units, re-runs the analysis and rewrites `path` in place.
    pub fn process_file(&self, path: &Path) -> anyhow::Result<AnalysisSummary> {
        let mut graph = Self::load(path)?;
        let summary = self
            .pipeline()
            .run(&mut graph)
            .with_context(|| format!("analyzing {}", path.display()))?;
        graph
            .save_atomic(path)
            .with_context(|| format!("writing {}", path.display()))?;
        info!("{}: {} series written", summary.test_name, summary.series);
        Ok(summary)
    }

    /// Converts, validates and analyzes `path`, then writes the result into
    /// the database folder. Nothing is written when validation fails.
    pub fn ingest_file(&self, path: &Path) -> anyhow::Result<IngestOutcome> {
        let mut graph = Self::load(path)?;
        let pipeline = self.pipeline();
        let converted = pipeline
            .convert_units(&mut graph)
            .with_context(|| format!("converting units in {}", path.display()))?;

        let record = ExperimentRecord::load(&graph)
            .with_context(|| format!("reading experiment {}", path.display()))?;
        let validator = self.config.shapes.validator_for(&record)?;
        let report = validator.validate(&graph);
        if !report.conforms {
            warn!("{}: rejected by validation\n{report}", record.label());
            return Ok(IngestOutcome::Rejected(report));
        }
        let file_name = database_file_name(record.test_name.as_deref())
            .with_context(|| format!("naming database entry for {}", path.display()))?;

        let mut summary = pipeline
            .analyze(&mut graph)
            .with_context(|| format!("analyzing {}", path.display()))?;
        summary.units_converted = converted.total();

        let database = &self.config.database;
        fs::create_dir_all(database)
            .with_context(|| format!("creating database folder {}", database.display()))?;
        let destination = database.join(file_name);
        graph
            .save_atomic(&destination)
            .with_context(|| format!("writing {}", destination.display()))?;
        info!("{}: ingested into {}", summary.test_name, destination.display());
        Ok(IngestOutcome::Accepted {
            summary,
            destination,
        })
    }

    /// Every `.ttl` file directly inside the database folder, sorted.
    pub fn database_files(&self) -> anyhow::Result<Vec<PathBuf>> {
        let database = &self.config.database;
        let entries = fs::read_dir(database)
            .with_context(|| format!("listing database folder {}", database.display()))?;
        let mut files = Vec::new();
        for entry in entries {
            let path = entry
                .with_context(|| format!("listing database folder {}", database.display()))?
                .path();
            if path.extension().is_some_and(|ext| ext == "ttl") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    fn run_one(&self, path: &Path, mode: BatchMode) -> anyhow::Result<FileOutcome> {
        match mode {
            BatchMode::Update => self.process_file(path).map(FileOutcome::Processed),
            BatchMode::Ingest => Ok(match self.ingest_file(path)? {
                IngestOutcome::Accepted { summary, .. } => FileOutcome::Processed(summary),
                IngestOutcome::Rejected(report) => FileOutcome::Rejected(report),
            }),
        }
    }

    /// Runs every file on the blocking pool, at most `workers` at a time.
    /// One file failing never stops the others.
    pub async fn run_batch(&self, files: Vec<PathBuf>, mode: BatchMode) -> anyhow::Result<BatchSummary> {
        let metrics = Arc::new(MetricsRecorder::new());
        let permits = Arc::new(Semaphore::new(self.config.workers.max(1)));
        let mut tasks = JoinSet::new();

        for path in files {
            let runner = self.clone();
            let metrics = Arc::clone(&metrics);
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .context("batch worker pool closed")?;
                let worker_path = path.clone();
                let outcome = tokio::task::spawn_blocking(move || {
                    let outcome = runner.run_one(&worker_path, mode);
                    match &outcome {
                        Ok(FileOutcome::Processed(_)) => metrics.record_processed(),
                        Ok(FileOutcome::Rejected(_)) => metrics.record_rejected(),
                        Err(_) => metrics.record_failure(),
                    }
                    outcome
                })
                .await
                .with_context(|| format!("worker for {} panicked", path.display()))?;
                Ok::<_, anyhow::Error>((path, outcome))
            });
        }

        let mut outcomes = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            outcomes.push(joined.context("batch task aborted")??);
        }

        let mut summary = BatchSummary::new(metrics.snapshot());
        outcomes.sort_by(|a, b| a.0.cmp(&b.0));
        for (path, outcome) in outcomes {
            match outcome {
                Ok(FileOutcome::Processed(result)) => summary.summaries.push(result),
                Ok(FileOutcome::Rejected(report)) => {
                    summary.rejections.push(FileRejection { path, report })
                }
                Err(err) => {
                    error!("{}: {err:#}", path.display());
                    let category = err.downcast_ref::<AnalysisError>().map(AnalysisError::category);
                    summary.failures.push(FileFailure {
                        path,
                        category,
                        error: format!("{err:#}"),
                    });
                }
            }
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::profile::{write_experiments, GeneratorConfig};
    use shpbcore::vocab::{pred, SignalRole};
    use shpbcore::PropertyStore;

    fn runner_for(database: &Path, workers: usize) -> Runner {
        Runner::new(WorkflowConfig {
            database: database.to_path_buf(),
            workers,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn process_file_rewrites_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let files = write_experiments(dir.path(), 1, &GeneratorConfig::default()).unwrap();
        let runner = runner_for(dir.path(), 1);

        let summary = runner.process_file(&files[0]).unwrap();
        assert_eq!(summary.extracted_signals, 4);
        let reloaded = Graph::load(&files[0]).unwrap();
        assert_eq!(
            reloaded
                .instances_of(shpbcore::vocab::class::EXTRACTED_SIGNAL)
                .len(),
            4
        );
    }

    #[test]
    fn ingest_writes_into_the_database() {
        let incoming = tempfile::tempdir().unwrap();
        let database = tempfile::tempdir().unwrap();
        let files = write_experiments(incoming.path(), 1, &GeneratorConfig::default()).unwrap();
        let runner = runner_for(database.path(), 1);

        match runner.ingest_file(&files[0]).unwrap() {
            IngestOutcome::Accepted { destination, summary } => {
                assert_eq!(destination, database.path().join("SYN_000.ttl"));
                assert_eq!(summary.test_name, "SYN_000");
                assert!(destination.exists());
            }
            IngestOutcome::Rejected(report) => panic!("unexpected rejection: {report}"),
        }
    }

    #[test]
    fn ingest_rejects_without_writing() {
        let incoming = tempfile::tempdir().unwrap();
        let database = tempfile::tempdir().unwrap();
        let files = write_experiments(incoming.path(), 1, &GeneratorConfig::default()).unwrap();
        let mut graph = Graph::load(&files[0]).unwrap();
        let conditions = graph.subjects_with(pred::HAS_TEST_MODE, None);
        graph.remove(&conditions[0], Some(pred::HAS_TEST_MODE), None);
        graph.save_atomic(&files[0]).unwrap();

        let runner = runner_for(database.path(), 1);
        match runner.ingest_file(&files[0]).unwrap() {
            IngestOutcome::Rejected(report) => assert!(!report.conforms),
            IngestOutcome::Accepted { .. } => panic!("experiment without a test mode was accepted"),
        }
        assert_eq!(fs::read_dir(database.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_names_stay_inside_the_database() {
        assert_eq!(database_file_name(Some("SYN_000")).unwrap(), "SYN_000.ttl");
        assert_eq!(database_file_name(Some("../escape")).unwrap(), "_escape.ttl");
        assert_eq!(database_file_name(Some("a/b\\c")).unwrap(), "a_b_c.ttl");
        assert!(database_file_name(Some("..")).is_err());
        assert!(database_file_name(Some("  ")).is_err());
        assert!(database_file_name(None).is_err());
    }

    #[test]
    fn ingest_sanitizes_the_test_name() {
        let incoming = tempfile::tempdir().unwrap();
        let database = tempfile::tempdir().unwrap();
        let files = write_experiments(incoming.path(), 1, &GeneratorConfig::default()).unwrap();
        let mut graph = Graph::load(&files[0]).unwrap();
        let metadata = graph.subjects_with(pred::HAS_TEST_NAME, None);
        graph.set(&metadata[0], pred::HAS_TEST_NAME, shpbcore::Value::string("../escape"));
        graph.save_atomic(&files[0]).unwrap();

        let runner = runner_for(database.path(), 1);
        match runner.ingest_file(&files[0]).unwrap() {
            IngestOutcome::Accepted { destination, .. } => {
                assert_eq!(destination, database.path().join("_escape.ttl"));
                assert!(destination.exists());
            }
            IngestOutcome::Rejected(report) => panic!("unexpected rejection: {report}"),
        }
        assert!(!database.path().parent().unwrap().join("escape.ttl").exists());
    }

    #[tokio::test]
    async fn batch_isolates_a_wrong_declared_size() {
        let database = tempfile::tempdir().unwrap();
        let files = write_experiments(database.path(), 3, &GeneratorConfig::default()).unwrap();
        let bad = files[1].clone();
        let mut graph = Graph::load(&bad).unwrap();
        let incident_class = SignalRole::Incident.sensor_class().unwrap();
        let signal = graph.instances_of(&incident_class).remove(0);
        graph.set(&signal, pred::HAS_SIZE, shpbcore::Value::int(7));
        graph.save_atomic(&bad).unwrap();
        let before = fs::read_to_string(&bad).unwrap();

        let runner = runner_for(database.path(), 2);
        let summary = runner.run_batch(files.clone(), BatchMode::Update).await.unwrap();
        assert_eq!(summary.processed, files.len() - 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failures[0].path, bad);
        assert_eq!(summary.failures[0].category, Some(ErrorCategory::DataShape));
        assert!(summary.failures[0].error.contains("declared"));
        assert_eq!(fs::read_to_string(&bad).unwrap(), before);
    }

    #[tokio::test]
    async fn batch_isolates_a_corrupt_file() {
        let database = tempfile::tempdir().unwrap();
        let mut files = write_experiments(database.path(), 4, &GeneratorConfig::default()).unwrap();
        let corrupt = database.path().join("broken.ttl");
        fs::write(&corrupt, "@prefix dynamat: <broken").unwrap();
        files.push(corrupt.clone());

        let runner = runner_for(database.path(), 2);
        let listed = runner.database_files().unwrap();
        assert_eq!(listed.len(), files.len());

        let summary = runner.run_batch(listed, BatchMode::Update).await.unwrap();
        assert_eq!(summary.processed, 4);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.rejected, 0);
        assert_eq!(summary.failures[0].path, corrupt);
        assert_eq!(summary.failures[0].category, None);
        assert!(!summary.is_clean());
        assert!(serde_json::to_string(&summary).unwrap().contains("\"failed\":1"));
    }

    #[tokio::test]
    async fn analysis_failures_carry_their_category() {
        let database = tempfile::tempdir().unwrap();
        let files = write_experiments(database.path(), 1, &GeneratorConfig::default()).unwrap();
        let mut graph = Graph::load(&files[0]).unwrap();
        let velocity = graph
            .subjects_with(pred::RDF_TYPE, Some(&shpbcore::Value::iri("dynamat:Velocity")))
            .remove(0);
        graph.remove(&velocity, Some(pred::HAS_VALUE), None);
        graph.save_atomic(&files[0]).unwrap();

        let summary = runner_for(database.path(), 1)
            .run_batch(files, BatchMode::Update)
            .await
            .unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failures[0].category, Some(ErrorCategory::DataShape));
    }
}
