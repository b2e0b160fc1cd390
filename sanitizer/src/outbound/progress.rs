//! Progress reporting through structured log events.

use tracing::{debug, info};

use crate::domain::ports::ProgressReporter;

/// Number of progress events logged per phase.
const REPORTS_PER_PHASE: usize = 10;

/// Logs phase boundaries at `info` and every tenth of a phase at `debug`.
#[derive(Debug, Default)]
pub struct TracingProgress {
    label: String,
    total: usize,
    done: usize,
    step: usize,
    next_report: usize,
}

impl TracingProgress {
    /// A reporter with no phase in progress.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressReporter for TracingProgress {
    fn start(&mut self, label: &str, total: usize) {
        label.clone_into(&mut self.label);
        self.total = total;
        self.done = 0;
        self.step = total.div_ceil(REPORTS_PER_PHASE).max(1);
        self.next_report = self.step;
        info!(phase = %self.label, total, "phase started");
    }

    fn tick(&mut self) {
        self.done = self.done.saturating_add(1);
        if self.done >= self.next_report || self.done == self.total {
            debug!(phase = %self.label, done = self.done, total = self.total, "progress");
            self.next_report = self.done.saturating_add(self.step);
        }
    }

    fn finish(&mut self) {
        info!(phase = %self.label, processed = self.done, "phase finished");
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn start_resets_the_counter() {
        let mut progress = TracingProgress::new();
        progress.start("Rewriting users...", 2);
        progress.tick();
        progress.tick();
        progress.finish();

        progress.start("Rewriting comments...", 5);

        assert_eq!(progress.done, 0);
        assert_eq!(progress.total, 5);
        assert_eq!(progress.label, "Rewriting comments...");
    }

    #[rstest]
    #[case(0, 1)]
    #[case(5, 1)]
    #[case(10, 1)]
    #[case(25, 3)]
    #[case(100, 10)]
    fn reports_roughly_every_tenth(#[case] total: usize, #[case] step: usize) {
        let mut progress = TracingProgress::new();
        progress.start("Rewriting users...", total);

        assert_eq!(progress.step, step);
        assert_eq!(progress.next_report, step);
    }

    #[test]
    fn threshold_advances_after_each_report() {
        let mut progress = TracingProgress::new();
        progress.start("Rewriting comments...", 30);

        for _ in 0..3 {
            progress.tick();
        }
        assert_eq!(progress.next_report, 6);

        progress.tick();
        assert_eq!(progress.next_report, 6);
    }
}
