use serde::{Deserialize, Serialize};

use crate::prediction::regression::{self, RegressionEstimate};
use crate::tracker::{PredictionConfig, Track, TrackHistory};

/// Upper bound on the number of steps in a sampled trajectory.
pub const MAX_TRAJECTORY_STEPS: usize = 10_000;

/// Which velocity sources contributed to a forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionMethod {
    /// Regression and filter velocities, confidence-weighted.
    Blended,
    /// Regression unavailable; filter velocity only.
    FilterOnly,
}

/// Urgency tier derived from time-to-impact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatLevel {
    Low,
    Medium,
    High,
}

impl ThreatLevel {
    pub fn from_time_to_impact(tti: Option<f64>, config: &PredictionConfig) -> Self {
        match tti {
            Some(t) if t < config.high_threat_tti => ThreatLevel::High,
            Some(t) if t < config.medium_threat_tti => ThreatLevel::Medium,
            _ => ThreatLevel::Low,
        }
    }
}

/// Forecast for a single track, recomputed from scratch every frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub method: PredictionMethod,
    /// Blended velocity (px / time unit).
    pub velocity: [f64; 2],
    /// Magnitude of `velocity`, zero below the stationary epsilon.
    pub speed: f64,
    pub impact_point: [f64; 2],
    /// Absent when the object is stationary or never reaches the boundary.
    pub time_to_impact: Option<f64>,
    /// Forecast confidence in [0, 1].
    pub confidence: f64,
    /// Weight of the regression velocity in the blend; the filter gets the rest.
    pub regression_weight: f64,
    /// Regression R², when a fit was possible.
    pub fit_quality: Option<f64>,
    pub threat: ThreatLevel,
    /// Sampled future positions from the current position over the horizon.
    pub trajectory: Vec<[f64; 2]>,
}

/// Produces [`Prediction`]s from track history and filter state.
#[derive(Debug, Clone, Default)]
pub struct TrajectoryPredictor {
    config: PredictionConfig,
}

impl TrajectoryPredictor {
    pub fn new(config: PredictionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PredictionConfig {
        &self.config
    }

    /// Forecast for a live track, extrapolating from its filtered position.
    pub fn predict_track(&self, track: &Track) -> Option<Prediction> {
        self.predict(
            track.history(),
            track.position(),
            track.velocity(),
            track.confidence(),
        )
    }

    /// Forecast from explicit inputs. `None` while the history is shorter
    /// than `min_history`.
    pub fn predict(
        &self,
        history: &TrackHistory,
        position: [f64; 2],
        filter_velocity: [f64; 2],
        track_confidence: f64,
    ) -> Option<Prediction> {
        if history.len() < self.config.min_history {
            return None;
        }

        let filter_velocity = if filter_velocity.iter().all(|v| v.is_finite()) {
            filter_velocity
        } else {
            [0.0, 0.0]
        };
        let filter_confidence = self.config.filter_confidence;
        let regression = regression::fit_history(history);

        let (method, velocity, regression_weight) = match regression {
            Some(RegressionEstimate {
                velocity: reg_velocity,
                r_squared,
            }) => {
                let total = r_squared + filter_confidence;
                let w = if total > 0.0 { r_squared / total } else { 0.0 };
                let blended = [
                    w * reg_velocity[0] + (1.0 - w) * filter_velocity[0],
                    w * reg_velocity[1] + (1.0 - w) * filter_velocity[1],
                ];
                (PredictionMethod::Blended, blended, w)
            }
            None => (PredictionMethod::FilterOnly, filter_velocity, 0.0),
        };

        let fit_quality = regression.map(|r| r.r_squared);
        let source_quality = regression_weight * fit_quality.unwrap_or(0.0)
            + (1.0 - regression_weight) * filter_confidence;
        let agreement = regression
            .map(|r| self.agreement(r.velocity, filter_velocity))
            .unwrap_or(1.0);
        let confidence =
            (source_quality * agreement * track_confidence.clamp(0.0, 1.0)).clamp(0.0, 1.0);

        let raw_speed = norm(velocity);
        let (speed, impact_point, time_to_impact) = if raw_speed < self.config.speed_epsilon
            || raw_speed == 0.0
        {
            (0.0, position, None)
        } else {
            match self.config.boundary.crossing(position, velocity) {
                Some(crossing) => (raw_speed, crossing.point, Some(crossing.time)),
                None => (raw_speed, advance(position, velocity, self.config.horizon), None),
            }
        };

        let trajectory = if speed == 0.0 {
            vec![position]
        } else {
            self.sample_trajectory(position, velocity)
        };

        Some(Prediction {
            method,
            velocity,
            speed,
            impact_point,
            time_to_impact,
            confidence,
            regression_weight,
            fit_quality,
            threat: ThreatLevel::from_time_to_impact(time_to_impact, &self.config),
            trajectory,
        })
    }

    /// 1 when both velocities agree, falling to 0 as their difference reaches
    /// the larger magnitude.
    fn agreement(&self, a: [f64; 2], b: [f64; 2]) -> f64 {
        let scale = norm(a).max(norm(b));
        if scale < self.config.speed_epsilon || scale == 0.0 {
            return 1.0;
        }
        let diff = norm([a[0] - b[0], a[1] - b[1]]);
        (1.0 - diff / scale).clamp(0.0, 1.0)
    }

    fn sample_trajectory(&self, position: [f64; 2], velocity: [f64; 2]) -> Vec<[f64; 2]> {
        let steps = ((self.config.horizon / self.config.trajectory_step).round() as usize)
            .min(MAX_TRAJECTORY_STEPS);
        (0..=steps)
            .map(|k| advance(position, velocity, k as f64 * self.config.trajectory_step))
            .collect()
    }
}

fn norm(v: [f64; 2]) -> f64 {
    v[0].hypot(v[1])
}

fn advance(position: [f64; 2], velocity: [f64; 2], t: f64) -> [f64; 2] {
    [position[0] + velocity[0] * t, position[1] + velocity[1] * t]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prediction::ImpactBoundary;
    use crate::tracker::HistorySample;
    use approx::assert_relative_eq;

    fn linear_history(n: usize, vx: f64, vy: f64) -> TrackHistory {
        (0..n)
            .map(|i| HistorySample {
                frame_index: i as u64,
                x: vx * i as f64,
                y: vy * i as f64,
                timestamp: i as f64,
            })
            .collect()
    }

    fn predictor() -> TrajectoryPredictor {
        TrajectoryPredictor::new(PredictionConfig {
            boundary: ImpactBoundary::Frame {
                width: 100.0,
                height: 100.0,
            },
            ..PredictionConfig::default()
        })
    }

    #[test]
    fn test_insufficient_history_is_absent() {
        let p = predictor();
        let history = linear_history(4, 10.0, 0.0);
        assert!(p.predict(&history, [30.0, 0.0], [10.0, 0.0], 0.9).is_none());
    }

    #[test]
    fn test_weights_sum_to_one_and_favor_better_source() {
        let p = predictor();
        let history = linear_history(5, 10.0, 0.0);
        let pred = p.predict(&history, [40.0, 0.0], [0.0, 0.0], 1.0).unwrap();
        // R² = 1, filter confidence 0.8
        assert_relative_eq!(pred.regression_weight, 1.0 / 1.8, epsilon = 1e-12);
        assert_relative_eq!(pred.velocity[0], 10.0 / 1.8, epsilon = 1e-9);
        assert_eq!(pred.method, PredictionMethod::Blended);
    }

    #[test]
    fn test_disagreement_lowers_confidence() {
        let p = predictor();
        let history = linear_history(5, 10.0, 0.0);
        let agree = p.predict(&history, [40.0, 0.0], [10.0, 0.0], 1.0).unwrap();
        let disagree = p.predict(&history, [40.0, 0.0], [-10.0, 0.0], 1.0).unwrap();
        assert!(agree.confidence > disagree.confidence);
        assert_relative_eq!(agree.confidence, 1.0 / 1.8 + 0.8 * 0.8 / 1.8, epsilon = 1e-9);
        assert_eq!(disagree.confidence, 0.0);
    }

    #[test]
    fn test_stationary_has_no_tti() {
        let p = predictor();
        let history = linear_history(5, 0.0, 0.0);
        let pred = p.predict(&history, [50.0, 50.0], [0.0, 0.0], 0.9).unwrap();
        assert_eq!(pred.speed, 0.0);
        assert_eq!(pred.time_to_impact, None);
        assert_eq!(pred.impact_point, [50.0, 50.0]);
        assert_eq!(pred.threat, ThreatLevel::Low);
        assert_eq!(pred.trajectory, vec![[50.0, 50.0]]);
    }

    #[test]
    fn test_degenerate_regression_falls_back_to_filter() {
        let p = predictor();
        let history: TrackHistory = (0..5)
            .map(|i| HistorySample {
                frame_index: i,
                x: i as f64,
                y: 0.0,
                timestamp: 0.0,
            })
            .collect();
        let pred = p.predict(&history, [40.0, 50.0], [10.0, 0.0], 1.0).unwrap();
        assert_eq!(pred.method, PredictionMethod::FilterOnly);
        assert_eq!(pred.velocity, [10.0, 0.0]);
        assert_eq!(pred.fit_quality, None);
        assert_relative_eq!(pred.time_to_impact.unwrap(), 6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_receding_from_plane_uses_horizon() {
        let p = TrajectoryPredictor::new(PredictionConfig {
            boundary: ImpactBoundary::Plane {
                axis: crate::prediction::ImpactAxis::X,
                position: 0.0,
            },
            ..PredictionConfig::default()
        });
        let history = linear_history(5, 10.0, 0.0);
        let pred = p.predict(&history, [40.0, 0.0], [10.0, 0.0], 1.0).unwrap();
        assert_eq!(pred.time_to_impact, None);
        assert_relative_eq!(pred.impact_point[0], 40.0 + 10.0 * 5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_trajectory_sampling() {
        let p = predictor();
        let history = linear_history(5, 10.0, 0.0);
        let pred = p.predict(&history, [40.0, 0.0], [10.0, 0.0], 1.0).unwrap();
        // horizon 5.0 at 0.1 steps, both ends included
        assert_eq!(pred.trajectory.len(), 51);
        assert_eq!(pred.trajectory[0], [40.0, 0.0]);
        assert_relative_eq!(pred.trajectory[50][0], 90.0, epsilon = 1e-9);
    }

    #[test]
    fn test_trajectory_sampling_is_bounded() {
        let p = TrajectoryPredictor::new(PredictionConfig {
            horizon: 1e30,
            trajectory_step: 1e-3,
            ..PredictionConfig::default()
        });
        let history = linear_history(5, 10.0, 0.0);
        let pred = p.predict(&history, [40.0, 0.0], [10.0, 0.0], 1.0).unwrap();
        assert_eq!(pred.trajectory.len(), MAX_TRAJECTORY_STEPS + 1);
    }

    #[test]
    fn test_threat_levels() {
        let c = PredictionConfig::default();
        assert_eq!(ThreatLevel::from_time_to_impact(Some(1.0), &c), ThreatLevel::High);
        assert_eq!(ThreatLevel::from_time_to_impact(Some(5.0), &c), ThreatLevel::Medium);
        assert_eq!(ThreatLevel::from_time_to_impact(Some(50.0), &c), ThreatLevel::Low);
        assert_eq!(ThreatLevel::from_time_to_impact(None, &c), ThreatLevel::Low);
    }
}
