use crate::store::StoreError;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Sign of the dominant excursion searched for in a strain trace.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SignPolarity {
    /// Compressive, negative-going pulse: the extremum is the minimum.
    Negative,
    /// Tensile or unloading pulse: the extremum is the maximum.
    Positive,
}

impl SignPolarity {
    pub fn is_min_search(self) -> bool {
        matches!(self, SignPolarity::Negative)
    }
}

/// Shared configuration for each analysis stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Resampling factor applied to every extracted window (1 keeps the raw grid).
    pub interpolation: usize,
    /// Near-zero tolerance used to anchor a pulse window on its foot.
    pub zero_cutoff: f64,
    /// Number of samples to step back from the zero anchor.
    pub window_offset: usize,
    pub incident_polarity: SignPolarity,
    pub reflected_polarity: SignPolarity,
    pub transmitted_polarity: SignPolarity,
    /// Write a pulse-test wave speed back onto the bars.
    pub persist_calibrated_wave_speed: bool,
    /// Wall-clock budget for one experiment, in seconds.
    pub deadline_secs: Option<u64>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            interpolation: 1,
            zero_cutoff: 1e-5,
            window_offset: 0,
            incident_polarity: SignPolarity::Negative,
            reflected_polarity: SignPolarity::Positive,
            transmitted_polarity: SignPolarity::Negative,
            persist_calibrated_wave_speed: true,
            deadline_secs: None,
        }
    }
}

/// Cooperative per-experiment time budget.
#[derive(Debug, Clone, Copy, Default)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    const CHECK_STRIDE: usize = 4096;

    pub fn none() -> Self {
        Self { at: None }
    }

    pub fn after(budget: Duration) -> Self {
        Self {
            at: Some(Instant::now() + budget),
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        config
            .deadline_secs
            .map(|secs| Self::after(Duration::from_secs(secs)))
            .unwrap_or_default()
    }

    pub fn check(&self, context: &str) -> AnalysisResult<()> {
        match self.at {
            Some(at) if Instant::now() >= at => {
                Err(AnalysisError::DeadlineExceeded(context.to_string()))
            }
            _ => Ok(()),
        }
    }

    /// Checks the clock once every few thousand iterations of a sample loop.
    pub fn tick(&self, index: usize, context: &str) -> AnalysisResult<()> {
        if index % Self::CHECK_STRIDE == 0 {
            self.check(context)
        } else {
            Ok(())
        }
    }
}

/// Coarse classification used by batch reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    DataShape,
    UnsupportedUnit,
    ThresholdNotFound,
    Deadline,
    Internal,
}

/// Common error type for stage execution.
#[derive(thiserror::Error, Debug)]
pub enum AnalysisError {
    #[error("{instance}: decoded {actual} samples but {expected} were declared")]
    SizeMismatch {
        instance: String,
        expected: usize,
        actual: usize,
    },
    #[error("{subject}: missing required property {property}")]
    MissingProperty { subject: String, property: String },
    #[error("{instance}: unsupported {dimension} unit {unit}")]
    UnsupportedUnit {
        instance: String,
        unit: String,
        dimension: String,
    },
    #[error("{instance}: unsupported signal encoding {encoding:?}")]
    UnsupportedEncoding { instance: String, encoding: String },
    #[error("threshold not found: {0}")]
    ThresholdNotFound(String),
    #[error("pulse window [{start}, {end}) does not fit a signal of {len} samples")]
    WindowOutOfBounds { start: i64, end: i64, len: usize },
    #[error("not implemented: {0}")]
    Unimplemented(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("deadline exceeded during {0}")]
    DeadlineExceeded(String),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl AnalysisError {
    pub fn missing(subject: impl Into<String>, property: impl Into<String>) -> Self {
        Self::MissingProperty {
            subject: subject.into(),
            property: property.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::SizeMismatch { .. }
            | Self::MissingProperty { .. }
            | Self::UnsupportedEncoding { .. }
            | Self::WindowOutOfBounds { .. }
            | Self::Store(_) => ErrorCategory::DataShape,
            Self::UnsupportedUnit { .. } => ErrorCategory::UnsupportedUnit,
            Self::ThresholdNotFound(_) => ErrorCategory::ThresholdNotFound,
            Self::DeadlineExceeded(_) => ErrorCategory::Deadline,
            Self::Unimplemented(_) | Self::InvalidInput(_) => ErrorCategory::Internal,
        }
    }
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Trait describing the sequential analysis stages.
pub trait ProcessingStage {
    type Input;
    type Output;

    fn initialize(&mut self, config: &AnalysisConfig) -> AnalysisResult<()>;
    fn execute(&mut self, input: &Self::Input) -> AnalysisResult<Self::Output>;
    fn cleanup(&mut self);
}
