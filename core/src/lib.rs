//! Signal-extraction and stress-wave analysis core for Split-Hopkinson
//! Pressure Bar (SHPB) experiments.
//!
//! An experiment lives in an RDF graph. The modules below load the relevant
//! triples into typed records, normalize units, isolate the incident,
//! reflected and transmitted pulses, and derive the one-dimensional
//! stress-wave quantities that are written back to the graph.

pub mod math;
pub mod model;
pub mod prelude;
pub mod processing;
pub mod store;
pub mod telemetry;
pub mod units;
pub mod validation;
pub mod vocab;

pub use prelude::{AnalysisConfig, AnalysisError, AnalysisResult, ProcessingStage};
pub use processing::pipeline::{AnalysisPipeline, AnalysisSummary};
pub use store::{Graph, PropertyStore, Value};
