//! Single object track for multi-object tracking.

use std::collections::VecDeque;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::prediction::Prediction;
use crate::tracker::config::LifecycleConfig;
use crate::tracker::kalman_filter::{KalmanFilter, StateEstimator};
use crate::tracker::matching::Detection;
use crate::tracker::rect::Rect;
use crate::tracker::track_state::TrackStatus;

/// One position sample in a track history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistorySample {
    pub frame_index: u64,
    pub x: f64,
    pub y: f64,
    pub timestamp: f64,
}

/// Bounded, temporally ordered position history. The oldest sample is
/// evicted once capacity is reached.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackHistory {
    samples: VecDeque<HistorySample>,
    capacity: usize,
}

impl TrackHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample. Samples not newer than the last one are ignored so
    /// the history stays strictly ordered by frame.
    pub fn push(&mut self, sample: HistorySample) {
        if let Some(last) = self.samples.back() {
            if sample.frame_index <= last.frame_index {
                return;
            }
        }
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<&HistorySample> {
        self.samples.back()
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &HistorySample> + '_ {
        self.samples.iter()
    }
}

impl FromIterator<HistorySample> for TrackHistory {
    /// Collect into a history sized to hold every sample.
    fn from_iter<I: IntoIterator<Item = HistorySample>>(iter: I) -> Self {
        let samples: Vec<_> = iter.into_iter().collect();
        let mut history = TrackHistory::new(samples.len());
        for sample in samples {
            history.push(sample);
        }
        history
    }
}

/// Single object track.
///
/// Created and destroyed only by the [`TrackManager`](crate::TrackManager);
/// exposed read-only through getters.
#[derive(Debug, Clone)]
pub struct Track {
    id: u64,
    status: TrackStatus,
    age: u32,
    hits: u32,
    misses: u32,
    confidence: f64,
    bbox: Rect,
    class_label: Option<String>,
    start_frame: u64,
    last_seen_frame: u64,
    estimator: StateEstimator,
    history: TrackHistory,
    prediction: Option<Prediction>,
}

impl Track {
    /// Birth of a track from an unmatched detection.
    pub(crate) fn new(
        id: u64,
        detection: &Detection,
        filter: Arc<KalmanFilter>,
        frame_index: u64,
        timestamp: f64,
        history_capacity: usize,
    ) -> Self {
        let estimator = StateEstimator::new(filter, detection.bbox.to_cxcywh());
        let (x, y) = detection.bbox.center();
        let mut history = TrackHistory::new(history_capacity);
        history.push(HistorySample {
            frame_index,
            x,
            y,
            timestamp,
        });

        Self {
            id,
            status: TrackStatus::Acquiring,
            age: 0,
            hits: 1,
            misses: 0,
            confidence: detection.score,
            bbox: detection.bbox,
            class_label: detection.class_label.clone(),
            start_frame: frame_index,
            last_seen_frame: frame_index,
            estimator,
            history,
            prediction: None,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn status(&self) -> TrackStatus {
        self.status
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    pub fn hits(&self) -> u32 {
        self.hits
    }

    pub fn misses(&self) -> u32 {
        self.misses
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Last observed bounding box.
    pub fn bbox(&self) -> Rect {
        self.bbox
    }

    pub fn class_label(&self) -> Option<&str> {
        self.class_label.as_deref()
    }

    pub fn start_frame(&self) -> u64 {
        self.start_frame
    }

    pub fn last_seen_frame(&self) -> u64 {
        self.last_seen_frame
    }

    pub fn estimator(&self) -> &StateEstimator {
        &self.estimator
    }

    pub fn position(&self) -> [f64; 2] {
        self.estimator.position()
    }

    pub fn velocity(&self) -> [f64; 2] {
        self.estimator.velocity()
    }

    /// Box predicted by the filter, used for association.
    pub fn rect(&self) -> Rect {
        self.estimator.rect()
    }

    pub fn history(&self) -> &TrackHistory {
        &self.history
    }

    pub fn prediction(&self) -> Option<&Prediction> {
        self.prediction.as_ref()
    }

    pub(crate) fn predict(&mut self) {
        self.estimator.predict();
    }

    /// Apply a matched detection. On a filter failure the track keeps its
    /// prior and nothing else changes.
    pub(crate) fn mark_hit(
        &mut self,
        detection: &Detection,
        frame_index: u64,
        timestamp: f64,
        config: &LifecycleConfig,
    ) -> Result<()> {
        self.estimator.update(detection.bbox.to_cxcywh())?;

        let alpha = config.confidence_smoothing;
        self.confidence = alpha * detection.score + (1.0 - alpha) * self.confidence;
        self.hits += 1;
        self.misses = 0;
        self.bbox = detection.bbox;
        if detection.class_label.is_some() {
            self.class_label = detection.class_label.clone();
        }
        self.last_seen_frame = frame_index;

        let (x, y) = detection.bbox.center();
        self.history.push(HistorySample {
            frame_index,
            x,
            y,
            timestamp,
        });
        Ok(())
    }

    /// Register a frame without a matching detection.
    pub(crate) fn mark_miss(&mut self, frame_index: u64, timestamp: f64, config: &LifecycleConfig) {
        self.misses += 1;
        self.confidence *= config.miss_confidence_decay;
        if config.record_coasted_positions {
            let [x, y] = self.estimator.position();
            self.history.push(HistorySample {
                frame_index,
                x,
                y,
                timestamp,
            });
        }
    }

    pub(crate) fn increment_age(&mut self) {
        self.age += 1;
    }

    /// Re-evaluate the lifecycle status, returning the previous one.
    pub(crate) fn advance_status(&mut self, config: &LifecycleConfig) -> TrackStatus {
        let previous = self.status;
        self.status = previous.next(self.hits, self.misses, self.confidence, config);
        previous
    }

    pub(crate) fn set_prediction(&mut self, prediction: Option<Prediction>) {
        self.prediction = prediction;
    }
}
