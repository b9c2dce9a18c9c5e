//! Bootstrap phase timing.

use std::time::Instant;

use tracing::info;

/// Measures one bootstrap phase and logs its duration when finished.
pub struct Timer {
    name: &'static str,
    start: Instant,
}

impl Timer {
    pub fn start(name: &'static str) -> Self {
        Self {
            name,
            start: Instant::now(),
        }
    }

    pub fn finish(self) {
        let ms = (self.start.elapsed().as_secs_f64() * 10_000.0).round() / 10.0;
        info!(phase = self.name, elapsed_ms = ms, "phase finished");
    }
}
