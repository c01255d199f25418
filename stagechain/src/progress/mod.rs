//! Progress reporting.
//!
//! Each stage carries a weight: the cumulative percent complete once it
//! finishes. Progress inside a stage is scaled into the band between the
//! predecessor's weight and its own, then handed to a [`ProgressSink`].

mod sink;

pub use sink::{CollectingProgressSink, LoggingProgressSink, NoOpProgressSink, ProgressSink};

#[cfg(test)]
pub use sink::MockProgressSink;

/// Progress handle given to a running stage.
pub struct StageProgress<'a> {
    stage: &'a str,
    sink: &'a dyn ProgressSink,
    previous: f64,
    delta: f64,
}

impl<'a> StageProgress<'a> {
    /// Creates a handle for a stage with weight `progress` following a stage
    /// with weight `previous` (if any).
    #[must_use]
    pub fn new(stage: &'a str, sink: &'a dyn ProgressSink, progress: f64, previous: Option<f64>) -> Self {
        let (previous, delta) = match previous {
            Some(prev) => (prev.max(0.0), (progress - prev).max(0.0)),
            None => (0.0, progress.max(0.0)),
        };
        Self {
            stage,
            sink,
            previous,
            delta,
        }
    }

    /// Cumulative percent emitted for `percent` of this stage's own work.
    #[must_use]
    pub fn cumulative(&self, percent: f64) -> f64 {
        let percent = percent.clamp(0.0, 100.0);
        self.previous + self.delta * percent / 100.0
    }

    /// Reports progress within the stage, as a percentage in `[0, 100]`.
    pub fn update(&self, percent: f64) {
        self.sink.send_update(self.stage, self.cumulative(percent));
    }

    /// Reports the stage as complete.
    pub fn finish(&self) {
        self.update(100.0);
    }

    /// Weight already accounted for by earlier stages.
    #[must_use]
    pub fn previous(&self) -> f64 {
        self.previous
    }

    /// Share of the total owned by this stage.
    #[must_use]
    pub fn delta(&self) -> f64 {
        self.delta
    }
}

impl std::fmt::Debug for StageProgress<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageProgress")
            .field("stage", &self.stage)
            .field("previous", &self.previous)
            .field("delta", &self.delta)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::{eq, function};

    #[test]
    fn test_band_between_predecessor_and_stage() {
        let sink = NoOpProgressSink;
        let progress = StageProgress::new("odm_meshing", &sink, 60.0, Some(52.0));

        assert!((progress.previous() - 52.0).abs() < 1e-9);
        assert!((progress.delta() - 8.0).abs() < 1e-9);
        assert!((progress.cumulative(50.0) - 56.0).abs() < 1e-9);
    }

    #[test]
    fn test_entry_stage_starts_at_zero() {
        let sink = NoOpProgressSink;
        let progress = StageProgress::new("multispectral", &sink, 5.0, None);
        assert!((progress.cumulative(100.0) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_weight_lower_than_predecessor_has_no_band() {
        // merge (100) is followed by opensfm (25)
        let sink = NoOpProgressSink;
        let progress = StageProgress::new("opensfm", &sink, 25.0, Some(100.0));
        assert!(progress.delta().abs() < 1e-9);
        assert!((progress.cumulative(40.0) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_update_is_clamped() {
        let mut sink = MockProgressSink::new();
        sink.expect_send_update()
            .with(eq("odm_dem"), function(|p: &f64| (*p - 90.0).abs() < 1e-9))
            .times(1)
            .return_const(());
        sink.expect_send_update()
            .with(eq("odm_dem"), function(|p: &f64| (*p - 80.0).abs() < 1e-9))
            .times(1)
            .return_const(());

        let progress = StageProgress::new("odm_dem", &sink, 90.0, Some(80.0));
        progress.update(250.0);
        progress.update(-3.0);
    }

    #[test]
    fn test_finish_emits_stage_weight() {
        let sink = CollectingProgressSink::new();
        StageProgress::new("odm_report", &sink, 100.0, Some(98.0)).finish();

        assert_eq!(sink.updates(), vec![("odm_report".to_string(), 100.0)]);
    }
}
