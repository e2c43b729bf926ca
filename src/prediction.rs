//! Trajectory forecasting for live tracks.
//!
//! A forecast blends an ordinary least-squares fit of the track history with
//! the Kalman filter velocity, then extrapolates to a configured impact
//! boundary to obtain the impact point and time-to-impact.

mod impact;
mod regression;
mod trajectory_predictor;

pub use impact::{Crossing, ImpactAxis, ImpactBoundary};
pub use regression::{LinearFit, RegressionEstimate, fit_history, fit_line};
pub use trajectory_predictor::{
    MAX_TRAJECTORY_STEPS, Prediction, PredictionMethod, ThreatLevel, TrajectoryPredictor,
};
