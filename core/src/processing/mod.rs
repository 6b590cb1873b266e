pub mod extractor;
pub mod persist;
pub mod pipeline;
pub mod pulse;
pub mod series;

#[cfg(test)]
pub(crate) mod fixtures;

pub use extractor::{ExtractionOutput, SignalExtractor, WaveSpeedUpdate};
pub use persist::SecondaryDataWriter;
pub use pipeline::{AnalysisPipeline, AnalysisSummary, PulseSummary};
pub use series::{SeriesInput, SeriesOutput, SeriesStage};
