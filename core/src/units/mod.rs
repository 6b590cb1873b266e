//! Unit normalization: every recorded quantity is rewritten to mm, kg/mm³,
//! mm², MPa, °C, m/s, ms, Ω or V before analysis.

pub mod converter;
pub mod table;

pub use converter::{ConversionReport, UnitConverter};
pub use table::{Dimension, Unit};
