use log::{debug, info, warn};

/// Log sink scoped to one experiment, so interleaved batch output stays attributable.
#[derive(Debug, Clone)]
pub struct LogManager {
    scope: String,
}

impl LogManager {
    pub fn new() -> Self {
        Self {
            scope: "shpb".to_string(),
        }
    }

    pub fn for_experiment(id: impl Into<String>) -> Self {
        Self { scope: id.into() }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn record(&self, message: &str) {
        info!("[{}] {}", self.scope, message);
    }

    pub fn detail(&self, message: &str) {
        debug!("[{}] {}", self.scope, message);
    }

    pub fn warn(&self, message: &str) {
        warn!("[{}] {}", self.scope, message);
    }
}

impl Default for LogManager {
    fn default() -> Self {
        Self::new()
    }
}
