//! Phase timing.

use std::time::Instant;

/// Measures one preparation phase and logs how long it took.
pub struct Timer {
    name: String,
    start: Instant,
}

impl Timer {
    pub fn start(name: &str) -> Self {
        tracing::debug!(phase = name, "starting");
        Self {
            name: name.to_string(),
            start: Instant::now(),
        }
    }

    pub fn finish(self) {
        let secs = self.start.elapsed().as_secs_f64();
        if secs >= 60.0 {
            tracing::info!(phase = %self.name, "[{:.1}m] {}", secs / 60.0, self.name);
        } else {
            tracing::info!(phase = %self.name, "[{:.1}s] {}", secs, self.name);
        }
    }
}
