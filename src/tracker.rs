mod config;
mod kalman_filter;
mod matching;
mod rect;
mod snapshot;
mod track;
mod track_manager;
mod track_state;

pub use config::{
    AssociationConfig, CostMetric, FilterConfig, LifecycleConfig, PredictionConfig, TrackerConfig,
};
pub use kalman_filter::{KalmanFilter, StateEstimator};
pub use matching::{
    AssignmentResult, Detection, cost_matrix, linear_assignment, optimal_assignment,
};
pub use rect::{Rect, iou_batch};
pub use snapshot::TrackSnapshot;
pub use track::{HistorySample, Track, TrackHistory};
pub use track_manager::{TrackManager, TrackerStats};
pub use track_state::TrackStatus;
