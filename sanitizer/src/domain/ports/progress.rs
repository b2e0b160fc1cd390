//! Port for reporting per-record progress during a run.

/// Receives progress events from the sanitization engine.
///
/// Rendering is left to adapters; the engine only reports phase boundaries
/// and one tick per processed record.
pub trait ProgressReporter: Send {
    /// A phase covering `total` records has started.
    fn start(&mut self, label: &str, total: usize);

    /// One record of the current phase has been processed.
    fn tick(&mut self);

    /// The current phase has finished.
    fn finish(&mut self);
}

/// Reporter that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpProgress;

impl ProgressReporter for NoOpProgress {
    fn start(&mut self, _label: &str, _total: usize) {}

    fn tick(&mut self) {}

    fn finish(&mut self) {}
}
