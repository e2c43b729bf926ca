//! Tracker configuration.
//!
//! Every threshold and noise parameter the core uses lives here. All structs
//! implement `Default` with the tuned values and deserialize with
//! `#[serde(default)]`, so a partial JSON/TOML document only needs to name the
//! fields it overrides. [`TrackerConfig::validate`] rejects out-of-range values
//! before any frame is processed.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackingError};
use crate::prediction::{ImpactBoundary, MAX_TRAJECTORY_STEPS};

/// Top-level configuration for the [`TrackManager`](crate::TrackManager).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Fixed time between consecutive frames, in the same unit as
    /// velocities and time-to-impact (seconds by default).
    pub time_step: f64,
    pub filter: FilterConfig,
    pub association: AssociationConfig,
    pub lifecycle: LifecycleConfig,
    pub prediction: PredictionConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            time_step: 1.0 / 30.0,
            filter: FilterConfig::default(),
            association: AssociationConfig::default(),
            lifecycle: LifecycleConfig::default(),
            prediction: PredictionConfig::default(),
        }
    }
}

/// Kalman filter noise parameters, expressed as standard deviations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Process noise on position and size components, per step (px).
    pub process_std_position: f64,
    /// Process noise on velocity components, per step (px / time unit).
    pub process_std_velocity: f64,
    /// Measurement noise on the observed center and size (px).
    pub measurement_std: f64,
    /// Initial uncertainty of position and size at track birth (px).
    pub initial_std_position: f64,
    /// Initial uncertainty of velocity at track birth (px / time unit).
    pub initial_std_velocity: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            process_std_position: 1.0,
            process_std_velocity: 10.0,
            measurement_std: 2.0,
            initial_std_position: 10.0,
            initial_std_velocity: 100.0,
        }
    }
}

/// Distance used to build the association cost matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostMetric {
    /// `1 - IoU`, falling back to centroid distance for degenerate boxes.
    #[default]
    Iou,
    /// Normalized centroid distance for every pair.
    Centroid,
}

/// Detection filtering and association parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssociationConfig {
    /// Detections scoring below this are ignored for the frame.
    pub min_detection_confidence: f64,
    pub metric: CostMetric,
    /// Matched pairs with a cost above this are rejected.
    pub max_cost: f64,
    /// Pixel distance that maps to the maximum centroid cost of 1.0.
    pub centroid_scale: f64,
}

impl Default for AssociationConfig {
    fn default() -> Self {
        Self {
            min_detection_confidence: 0.5,
            metric: CostMetric::Iou,
            max_cost: 0.7,
            centroid_scale: 100.0,
        }
    }
}

/// Track birth, promotion, demotion and death thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Cumulative hits needed for `ACQUIRING -> TRACKING`.
    pub confirm_hits: u32,
    /// Consecutive misses an `ACQUIRING` track survives.
    pub acquiring_miss_tolerance: u32,
    /// Cumulative hits needed for `TRACKING -> LOCKED`.
    pub lock_hits: u32,
    /// Smoothed confidence needed for `TRACKING -> LOCKED`.
    pub lock_confidence: f64,
    /// Consecutive misses after which a `LOCKED` track drops to `TRACKING`.
    pub lock_miss_tolerance: u32,
    /// Consecutive misses a confirmed track survives before removal.
    pub max_misses: u32,
    pub demote_on_low_confidence: bool,
    /// Smoothed confidence below which a confirmed track is demoted one tier.
    pub demote_confidence: f64,
    /// Weight of the newest detection score in the confidence EMA.
    pub confidence_smoothing: f64,
    /// Multiplier applied to confidence on every missed frame.
    pub miss_confidence_decay: f64,
    /// Maximum number of samples kept in a track history.
    pub history_capacity: usize,
    /// Append the coasted (predicted) position to the history on a miss.
    pub record_coasted_positions: bool,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            confirm_hits: 3,
            acquiring_miss_tolerance: 1,
            lock_hits: 10,
            lock_confidence: 0.75,
            lock_miss_tolerance: 3,
            max_misses: 30,
            demote_on_low_confidence: true,
            demote_confidence: 0.3,
            confidence_smoothing: 0.3,
            miss_confidence_decay: 0.95,
            history_capacity: 30,
            record_coasted_positions: false,
        }
    }
}

/// Trajectory forecasting parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionConfig {
    /// History samples required before a forecast is produced.
    pub min_history: usize,
    /// Confidence assigned to the filter velocity in the blend.
    pub filter_confidence: f64,
    /// Speeds below this are treated as stationary.
    pub speed_epsilon: f64,
    pub boundary: ImpactBoundary,
    /// Forecast horizon for the sampled trajectory and the no-crossing fallback.
    pub horizon: f64,
    /// Time between consecutive points of the sampled trajectory.
    pub trajectory_step: f64,
    /// Time-to-impact below which a forecast is rated `High`.
    pub high_threat_tti: f64,
    /// Time-to-impact below which a forecast is rated `Medium`.
    pub medium_threat_tti: f64,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            min_history: 5,
            filter_confidence: 0.8,
            speed_epsilon: 1e-6,
            boundary: ImpactBoundary::default(),
            horizon: 5.0,
            trajectory_step: 0.1,
            high_threat_tti: 3.0,
            medium_threat_tti: 10.0,
        }
    }
}

fn ensure(condition: bool, message: impl Into<String>) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(TrackingError::InvalidConfig(message.into()))
    }
}

fn is_probability(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}

impl TrackerConfig {
    /// Check every parameter, returning the first violation found.
    pub fn validate(&self) -> Result<()> {
        ensure(
            self.time_step.is_finite() && self.time_step > 0.0,
            "time_step must be positive",
        )?;
        self.filter.validate()?;
        self.association.validate()?;
        self.lifecycle.validate()?;
        self.prediction.validate()?;
        ensure(
            self.lifecycle.history_capacity >= self.prediction.min_history,
            format!(
                "history_capacity ({}) must be at least min_history ({})",
                self.lifecycle.history_capacity, self.prediction.min_history
            ),
        )
    }
}

impl FilterConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("process_std_position", self.process_std_position),
            ("process_std_velocity", self.process_std_velocity),
            ("measurement_std", self.measurement_std),
            ("initial_std_position", self.initial_std_position),
            ("initial_std_velocity", self.initial_std_velocity),
        ] {
            ensure(
                value.is_finite() && value > 0.0,
                format!("{name} must be positive, got {value}"),
            )?;
        }
        Ok(())
    }
}

impl AssociationConfig {
    pub fn validate(&self) -> Result<()> {
        ensure(
            is_probability(self.min_detection_confidence),
            "min_detection_confidence must be within [0, 1]",
        )?;
        ensure(is_probability(self.max_cost), "max_cost must be within [0, 1]")?;
        ensure(
            self.centroid_scale.is_finite() && self.centroid_scale > 0.0,
            "centroid_scale must be positive",
        )
    }
}

impl LifecycleConfig {
    pub fn validate(&self) -> Result<()> {
        ensure(self.confirm_hits >= 1, "confirm_hits must be at least 1")?;
        ensure(
            self.lock_hits >= self.confirm_hits,
            "lock_hits must not be lower than confirm_hits",
        )?;
        ensure(
            is_probability(self.lock_confidence),
            "lock_confidence must be within [0, 1]",
        )?;
        ensure(
            is_probability(self.demote_confidence),
            "demote_confidence must be within [0, 1]",
        )?;
        ensure(
            self.demote_confidence <= self.lock_confidence,
            "demote_confidence must not exceed lock_confidence",
        )?;
        ensure(
            self.confidence_smoothing > 0.0 && self.confidence_smoothing <= 1.0,
            "confidence_smoothing must be within (0, 1]",
        )?;
        ensure(
            is_probability(self.miss_confidence_decay),
            "miss_confidence_decay must be within [0, 1]",
        )?;
        ensure(self.history_capacity >= 1, "history_capacity must be at least 1")
    }
}

impl PredictionConfig {
    pub fn validate(&self) -> Result<()> {
        ensure(
            self.min_history >= 2,
            "min_history must be at least 2 to fit a velocity",
        )?;
        ensure(
            is_probability(self.filter_confidence),
            "filter_confidence must be within [0, 1]",
        )?;
        ensure(
            self.speed_epsilon.is_finite() && self.speed_epsilon >= 0.0,
            "speed_epsilon must be non-negative",
        )?;
        ensure(
            self.horizon.is_finite() && self.horizon > 0.0,
            "horizon must be positive",
        )?;
        ensure(
            self.trajectory_step.is_finite() && self.trajectory_step > 0.0,
            "trajectory_step must be positive",
        )?;
        ensure(
            self.horizon / self.trajectory_step <= MAX_TRAJECTORY_STEPS as f64,
            format!(
                "horizon / trajectory_step must not exceed {MAX_TRAJECTORY_STEPS} samples"
            ),
        )?;
        ensure(
            self.high_threat_tti >= 0.0 && self.high_threat_tti <= self.medium_threat_tti,
            "threat thresholds must satisfy 0 <= high_threat_tti <= medium_threat_tti",
        )?;
        self.boundary.validate()
    }
}
