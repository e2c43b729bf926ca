//! Frame cycle: predict, associate, update/create/retire, forecast.

use std::sync::Arc;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::Result;
use crate::prediction::TrajectoryPredictor;
use crate::tracker::config::TrackerConfig;
use crate::tracker::kalman_filter::KalmanFilter;
use crate::tracker::matching::{self, AssignmentResult, Detection};
use crate::tracker::rect::Rect;
use crate::tracker::snapshot::TrackSnapshot;
use crate::tracker::track::Track;
use crate::tracker::track_state::TrackStatus;

/// Forecasts above this confidence count as high-confidence.
const HIGH_CONFIDENCE_PREDICTION: f64 = 0.7;

/// Running totals since the manager was created.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TrackerStats {
    pub frames_processed: u64,
    pub tracks_created: u64,
    pub tracks_removed: u64,
    pub detections_rejected: u64,
    pub predictions_made: u64,
    pub high_confidence_predictions: u64,
    pub mean_prediction_confidence: f64,
}

impl TrackerStats {
    fn record_prediction(&mut self, confidence: f64) {
        self.predictions_made += 1;
        let n = self.predictions_made as f64;
        self.mean_prediction_confidence += (confidence - self.mean_prediction_confidence) / n;
        if confidence > HIGH_CONFIDENCE_PREDICTION {
            self.high_confidence_predictions += 1;
        }
    }
}

/// Owns every live track and runs the per-frame tracking cycle.
pub struct TrackManager {
    tracks: Vec<Track>,
    next_id: u64,
    frame_index: u64,
    config: TrackerConfig,
    kalman_filter: Arc<KalmanFilter>,
    predictor: TrajectoryPredictor,
    stats: TrackerStats,
}

impl TrackManager {
    /// Create a manager, rejecting invalid configuration.
    pub fn new(config: TrackerConfig) -> Result<Self> {
        config.validate()?;
        let kalman_filter = Arc::new(KalmanFilter::new(&config.filter, config.time_step));
        let predictor = TrajectoryPredictor::new(config.prediction.clone());
        Ok(Self {
            tracks: Vec::new(),
            next_id: 1,
            frame_index: 0,
            config,
            kalman_filter,
            predictor,
            stats: TrackerStats::default(),
        })
    }

    /// Process one frame of detections and return a snapshot of all live tracks.
    pub fn update(&mut self, detections: Vec<Detection>) -> Vec<TrackSnapshot> {
        self.frame_index += 1;
        let frame_index = self.frame_index;
        let timestamp = self.timestamp();

        let detections = self.accept_detections(detections);

        // Step 1: advance every estimator to the current frame.
        #[cfg(feature = "parallel")]
        self.tracks.par_iter_mut().for_each(Track::predict);
        #[cfg(not(feature = "parallel"))]
        self.tracks.iter_mut().for_each(Track::predict);

        // Step 2: associate detections with predicted boxes.
        let track_rects: Vec<Rect> = self.tracks.iter().map(Track::rect).collect();
        let det_rects: Vec<Rect> = detections.iter().map(|d| d.bbox).collect();
        let association = &self.config.association;
        let costs = matching::cost_matrix(
            &track_rects,
            &det_rects,
            association.metric,
            association.centroid_scale,
        );
        let AssignmentResult {
            matches,
            unmatched_tracks,
            unmatched_detections,
        } = matching::linear_assignment(&costs, association.max_cost);

        tracing::trace!(
            frame = frame_index,
            tracks = self.tracks.len(),
            detections = detections.len(),
            matched = matches.len(),
            "associated frame"
        );

        // Step 3: matched tracks absorb their detection.
        let lifecycle = &self.config.lifecycle;
        for (itrack, idet) in matches {
            let track = &mut self.tracks[itrack];
            if let Err(err) = track.mark_hit(&detections[idet], frame_index, timestamp, lifecycle) {
                tracing::warn!(
                    track_id = track.id(),
                    error = %err,
                    "update failed, coasting track"
                );
                track.mark_miss(frame_index, timestamp, lifecycle);
            }
        }
        for itrack in unmatched_tracks {
            self.tracks[itrack].mark_miss(frame_index, timestamp, lifecycle);
        }

        // Step 4: age, re-evaluate status, retire dead tracks.
        for track in self.tracks.iter_mut() {
            track.increment_age();
            let previous = track.advance_status(lifecycle);
            if previous != track.status() {
                tracing::debug!(
                    track_id = track.id(),
                    from = %previous,
                    to = %track.status(),
                    hits = track.hits(),
                    misses = track.misses(),
                    "track status changed"
                );
            }
        }
        let before = self.tracks.len();
        self.tracks.retain(|t| t.status() != TrackStatus::Removed);
        self.stats.tracks_removed += (before - self.tracks.len()) as u64;

        // Step 5: births from unmatched detections.
        for idet in unmatched_detections {
            let id = self.next_id;
            self.next_id += 1;
            self.tracks.push(Track::new(
                id,
                &detections[idet],
                Arc::clone(&self.kalman_filter),
                frame_index,
                timestamp,
                lifecycle.history_capacity,
            ));
            self.stats.tracks_created += 1;
            tracing::debug!(track_id = id, frame = frame_index, "track created");
        }

        // Step 6: forecasts, from scratch every frame.
        let predictor = &self.predictor;
        #[cfg(feature = "parallel")]
        self.tracks
            .par_iter_mut()
            .for_each(|t| t.set_prediction(predictor.predict_track(t)));
        #[cfg(not(feature = "parallel"))]
        self.tracks
            .iter_mut()
            .for_each(|t| t.set_prediction(predictor.predict_track(t)));

        for prediction in self.tracks.iter().filter_map(Track::prediction) {
            self.stats.record_prediction(prediction.confidence);
        }
        self.stats.frames_processed += 1;

        self.snapshot()
    }

    /// Drop malformed and low-confidence detections, logging each rejection.
    fn accept_detections(&mut self, detections: Vec<Detection>) -> Vec<Detection> {
        let min_confidence = self.config.association.min_detection_confidence;
        let frame = self.frame_index;
        let mut accepted = Vec::with_capacity(detections.len());
        for (index, det) in detections.into_iter().enumerate() {
            if let Err(err) = det.validate() {
                tracing::warn!(frame, index, error = %err, "dropping detection");
                self.stats.detections_rejected += 1;
                continue;
            }
            if det.score < min_confidence {
                tracing::debug!(
                    frame,
                    index,
                    score = det.score,
                    "detection below confidence threshold"
                );
                continue;
            }
            accepted.push(det);
        }
        accepted
    }

    fn timestamp(&self) -> f64 {
        (self.frame_index - 1) as f64 * self.config.time_step
    }

    /// Copy of every live track, ordered by id.
    pub fn snapshot(&self) -> Vec<TrackSnapshot> {
        self.tracks.iter().map(TrackSnapshot::from).collect()
    }

    /// Read access to the live tracks, ordered by id.
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track(&self, id: u64) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id() == id)
    }

    /// Number of frames processed so far.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn stats(&self) -> &TrackerStats {
        &self.stats
    }
}
