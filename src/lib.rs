//! # skytrack-rs
//!
//! Real-time tracking of airborne objects from per-frame detections.
//!
//! The crate is split into three layers:
//!
//! - [`tracker`]: per-track Kalman state estimation, IoU-based optimal
//!   association and the track lifecycle (`ACQUIRING → TRACKING → LOCKED`).
//! - [`prediction`]: trajectory forecasting that blends a least-squares fit of
//!   the track history with the filter velocity into an impact point and
//!   time-to-impact.
//! - [`integration`]: glue for detector backends and snapshot consumers.
//!
//! ## Example
//!
//! ```rust,ignore
//! use skytrack_rs::{Detection, TrackManager, TrackerConfig};
//!
//! let mut manager = TrackManager::new(TrackerConfig::default())?;
//! let detections = vec![Detection::from_center(640.0, 360.0, 40.0, 20.0, 0.9)];
//! for track in manager.update(detections) {
//!     println!("{} {:?} {:?}", track.id, track.status, track.prediction);
//! }
//! ```

pub mod error;
pub mod integration;
pub mod prediction;
pub mod tracker;

pub use error::{Result, TrackingError};
pub use integration::{
    DetectionBuilder, DetectionSource, DetectorBackend, NullSink, SnapshotSink, TrackerPipeline,
};
pub use prediction::{
    ImpactAxis, ImpactBoundary, Prediction, PredictionMethod, ThreatLevel, TrajectoryPredictor,
};
pub use tracker::{
    AssociationConfig, CostMetric, Detection, FilterConfig, LifecycleConfig, PredictionConfig,
    Rect, Track, TrackManager, TrackSnapshot, TrackStatus, TrackerConfig, TrackerStats,
};
