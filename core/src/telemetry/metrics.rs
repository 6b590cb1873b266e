use std::sync::Mutex;

/// Batch counters shared across worker tasks.
pub struct MetricsRecorder {
    inner: Mutex<Metrics>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Metrics {
    pub processed: usize,
    pub failed: usize,
    /// Experiments that ran but did not pass validation.
    pub rejected: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Metrics::default()),
        }
    }

    pub fn record_processed(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.processed += 1;
        }
    }

    pub fn record_failure(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.failed += 1;
        }
    }

    pub fn record_rejected(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.rejected += 1;
        }
    }

    pub fn snapshot(&self) -> Metrics {
        self.inner.lock().map(|metrics| *metrics).unwrap_or_default()
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn counters_accumulate_across_threads() {
        let recorder = Arc::new(MetricsRecorder::new());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let recorder = Arc::clone(&recorder);
                thread::spawn(move || {
                    recorder.record_processed();
                    if i == 0 {
                        recorder.record_failure();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        recorder.record_rejected();

        let snapshot = recorder.snapshot();
        assert_eq!(snapshot.processed, 4);
        assert_eq!(snapshot.failed, 1);
        assert_eq!(snapshot.rejected, 1);
    }
}
