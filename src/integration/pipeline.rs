//! TrackerPipeline for combining detection with tracking.

use std::convert::Infallible;

use crate::error::Result;
use crate::tracker::{TrackManager, TrackSnapshot, TrackerConfig};

use super::DetectionSource;

/// Consumer of periodic track snapshots, such as a CSV or database writer.
pub trait SnapshotSink {
    type Error: std::fmt::Display;

    fn save(&mut self, frame_index: u64, snapshots: &[TrackSnapshot])
    -> std::result::Result<(), Self::Error>;
}

/// Sink that discards everything; the default when no persistence is attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl SnapshotSink for NullSink {
    type Error = Infallible;

    fn save(&mut self, _: u64, _: &[TrackSnapshot]) -> std::result::Result<(), Infallible> {
        Ok(())
    }
}

/// A combined tracker that bundles detection inference with tracking.
///
/// Runs any `DetectionSource` into the [`TrackManager`] each frame and hands
/// the snapshot to an optional [`SnapshotSink`] every `autosave_every` frames.
pub struct TrackerPipeline<D: DetectionSource, S: SnapshotSink = NullSink> {
    detector: D,
    tracker: TrackManager,
    sink: Option<S>,
    autosave_every: u64,
}

impl<D: DetectionSource> TrackerPipeline<D> {
    /// Create a new tracking pipeline with the given detector and tracker config.
    pub fn new(detector: D, config: TrackerConfig) -> Result<Self> {
        Ok(Self {
            detector,
            tracker: TrackManager::new(config)?,
            sink: None,
            autosave_every: 1,
        })
    }

    /// Create a new tracking pipeline with default tracker configuration.
    pub fn with_default_config(detector: D) -> Result<Self> {
        Self::new(detector, TrackerConfig::default())
    }
}

impl<D: DetectionSource, S: SnapshotSink> TrackerPipeline<D, S> {
    /// Attach a snapshot sink, saving every `every` frames (at least 1).
    pub fn with_sink<T: SnapshotSink>(self, sink: T, every: u64) -> TrackerPipeline<D, T> {
        TrackerPipeline {
            detector: self.detector,
            tracker: self.tracker,
            sink: Some(sink),
            autosave_every: every.max(1),
        }
    }

    /// Process a single frame and return the live tracks.
    ///
    /// A detector error aborts the frame before the tracker is touched. Sink
    /// failures are logged and do not affect tracking.
    pub fn process_frame(
        &mut self,
        input: &[u8],
        width: u32,
        height: u32,
    ) -> std::result::Result<Vec<TrackSnapshot>, D::Error> {
        let detections = self.detector.detect(input, width, height)?;
        let snapshots = self.tracker.update(detections);

        let frame_index = self.tracker.frame_index();
        if let Some(sink) = self.sink.as_mut() {
            if frame_index % self.autosave_every == 0 {
                if let Err(err) = sink.save(frame_index, &snapshots) {
                    tracing::warn!(frame = frame_index, error = %err, "snapshot save failed");
                }
            }
        }

        Ok(snapshots)
    }

    /// Get a reference to the underlying detector.
    pub fn detector(&self) -> &D {
        &self.detector
    }

    /// Get a mutable reference to the underlying detector.
    pub fn detector_mut(&mut self) -> &mut D {
        &mut self.detector
    }

    /// Get a reference to the underlying tracker.
    pub fn tracker(&self) -> &TrackManager {
        &self.tracker
    }

    pub fn sink(&self) -> Option<&S> {
        self.sink.as_ref()
    }
}
