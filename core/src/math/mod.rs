pub mod integrate;
pub mod interp;
pub mod stats;

pub use integrate::IntegrateHelper;
pub use interp::InterpHelper;
pub use stats::StatsHelper;
