//! Kalman filter for bounding box tracking using ndarray and a nalgebra-based inverse.
//!
//! State is `[cx, cy, w, h, vx, vy, vw, vh]` under a constant-velocity model,
//! the measurement is the observed `[cx, cy, w, h]`.

use std::sync::Arc;

use ndarray::{Array1, Array2};

use crate::error::{Result, TrackingError};
use crate::tracker::config::FilterConfig;
use crate::tracker::rect::Rect;

const NDIM: usize = 4;

/// Immutable motion and observation model shared by all state estimators.
#[derive(Debug, Clone)]
pub struct KalmanFilter {
    motion_mat: Array2<f64>,
    update_mat: Array2<f64>,
    process_cov: Array2<f64>,
    measurement_cov: Array2<f64>,
    initial_std: [f64; 2 * NDIM],
}

impl Default for KalmanFilter {
    fn default() -> Self {
        Self::new(&FilterConfig::default(), 1.0)
    }
}

fn diagonal(std: &[f64]) -> Array2<f64> {
    let mut cov = Array2::zeros((std.len(), std.len()));
    for (i, s) in std.iter().enumerate() {
        cov[[i, i]] = s * s;
    }
    cov
}

impl KalmanFilter {
    pub fn new(config: &FilterConfig, dt: f64) -> Self {
        let mut motion_mat = Array2::eye(2 * NDIM);
        for i in 0..NDIM {
            motion_mat[[i, NDIM + i]] = dt;
        }

        let mut update_mat = Array2::zeros((NDIM, 2 * NDIM));
        for i in 0..NDIM {
            update_mat[[i, i]] = 1.0;
        }

        let qp = config.process_std_position;
        let qv = config.process_std_velocity;
        let r = config.measurement_std;
        let p0 = config.initial_std_position;
        let v0 = config.initial_std_velocity;

        Self {
            motion_mat,
            update_mat,
            process_cov: diagonal(&[qp, qp, qp, qp, qv, qv, qv, qv]),
            measurement_cov: diagonal(&[r; NDIM]),
            initial_std: [p0, p0, p0, p0, v0, v0, v0, v0],
        }
    }

    /// Create the initial mean and covariance from a first measurement.
    /// Velocities start at zero.
    pub fn initiate(&self, measurement: [f64; 4]) -> (Array1<f64>, Array2<f64>) {
        let mut mean = Array1::zeros(2 * NDIM);
        for i in 0..NDIM {
            mean[i] = measurement[i];
        }
        (mean, diagonal(&self.initial_std))
    }

    pub fn predict(
        &self,
        mean: &Array1<f64>,
        covariance: &Array2<f64>,
    ) -> (Array1<f64>, Array2<f64>) {
        let new_mean = self.motion_mat.dot(mean);
        let new_covariance =
            self.motion_mat.dot(covariance).dot(&self.motion_mat.t()) + &self.process_cov;

        (new_mean, new_covariance)
    }

    pub fn project(
        &self,
        mean: &Array1<f64>,
        covariance: &Array2<f64>,
    ) -> (Array1<f64>, Array2<f64>) {
        let mean_proj = self.update_mat.dot(mean);
        let covariance_proj =
            self.update_mat.dot(covariance).dot(&self.update_mat.t()) + &self.measurement_cov;

        (mean_proj, covariance_proj)
    }

    pub fn update(
        &self,
        mean: &Array1<f64>,
        covariance: &Array2<f64>,
        measurement: [f64; 4],
    ) -> Result<(Array1<f64>, Array2<f64>)> {
        let (projected_mean, projected_cov) = self.project(mean, covariance);

        let measurement_arr = Array1::from_vec(measurement.to_vec());
        let innovation = measurement_arr - projected_mean;

        // K = P * H^T * S^-1
        let s_inv = invert_4x4(&projected_cov).ok_or_else(|| {
            TrackingError::NumericDegeneracy("innovation covariance is singular".to_string())
        })?;

        let pht = covariance.dot(&self.update_mat.t()); // 8x4
        let kalman_gain = pht.dot(&s_inv); // 8x4

        let new_mean = mean + &kalman_gain.dot(&innovation);
        let new_covariance = covariance - &kalman_gain.dot(&projected_cov).dot(&kalman_gain.t());

        if new_mean.iter().any(|v| !v.is_finite()) {
            return Err(TrackingError::NumericDegeneracy(
                "posterior mean is not finite".to_string(),
            ));
        }

        Ok((new_mean, new_covariance))
    }
}

/// Invert a 4x4 matrix using nalgebra (pure Rust).
fn invert_4x4(m: &Array2<f64>) -> Option<Array2<f64>> {
    let nm = nalgebra::Matrix4::from_fn(|i, j| m[[i, j]]);
    let inv = nm.try_inverse()?;
    Some(Array2::from_shape_fn((4, 4), |(i, j)| inv[(i, j)]))
}

/// Per-track recursive estimator.
///
/// Owns the mean and covariance of exactly one track; the model is shared.
#[derive(Debug, Clone)]
pub struct StateEstimator {
    filter: Arc<KalmanFilter>,
    mean: Array1<f64>,
    covariance: Array2<f64>,
}

impl StateEstimator {
    pub fn new(filter: Arc<KalmanFilter>, measurement: [f64; 4]) -> Self {
        let (mean, covariance) = filter.initiate(measurement);
        Self {
            filter,
            mean,
            covariance,
        }
    }

    /// Advance the state one time step.
    pub fn predict(&mut self) {
        let (mean, covariance) = self.filter.predict(&self.mean, &self.covariance);
        self.mean = mean;
        self.covariance = covariance;
    }

    /// Fuse a `[cx, cy, w, h]` measurement. On error the prior is kept.
    pub fn update(&mut self, measurement: [f64; 4]) -> Result<()> {
        let (mean, covariance) = self
            .filter
            .update(&self.mean, &self.covariance, measurement)?;
        self.mean = mean;
        self.covariance = covariance;
        Ok(())
    }

    pub fn position(&self) -> [f64; 2] {
        [self.mean[0], self.mean[1]]
    }

    pub fn velocity(&self) -> [f64; 2] {
        [self.mean[NDIM], self.mean[NDIM + 1]]
    }

    /// Current box estimate.
    pub fn rect(&self) -> Rect {
        Rect::from_center(self.mean[0], self.mean[1], self.mean[2], self.mean[3])
    }

    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    pub fn covariance(&self) -> &Array2<f64> {
        &self.covariance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn estimator(measurement: [f64; 4]) -> StateEstimator {
        let filter = Arc::new(KalmanFilter::new(&FilterConfig::default(), 1.0));
        StateEstimator::new(filter, measurement)
    }

    #[test]
    fn test_initiate() {
        let kf = KalmanFilter::default();
        let (mean, cov) = kf.initiate([100.0, 200.0, 30.0, 10.0]);
        assert_eq!(mean[0], 100.0);
        assert_eq!(mean[3], 10.0);
        assert_eq!(mean[4], 0.0);
        assert_relative_eq!(cov[[4, 4]], 100.0 * 100.0);
    }

    #[test]
    fn test_predict_coasts_on_velocity() {
        let mut est = estimator([0.0, 0.0, 10.0, 10.0]);
        est.predict();
        assert_eq!(est.position(), [0.0, 0.0]);
        let before = est.covariance()[[0, 0]];
        est.predict();
        assert!(est.covariance()[[0, 0]] > before);
    }

    #[test]
    fn test_update_learns_velocity() {
        let mut est = estimator([0.0, 0.0, 10.0, 10.0]);
        for step in 1..=20 {
            est.predict();
            est.update([step as f64 * 5.0, 0.0, 10.0, 10.0]).unwrap();
        }
        let [vx, vy] = est.velocity();
        assert_relative_eq!(vx, 5.0, epsilon = 0.5);
        assert_relative_eq!(vy, 0.0, epsilon = 0.5);
        assert_relative_eq!(est.position()[0], 100.0, epsilon = 2.0);
    }

    #[test]
    fn test_update_moves_toward_measurement() {
        let mut est = estimator([0.0, 0.0, 10.0, 10.0]);
        est.predict();
        est.update([10.0, 0.0, 10.0, 10.0]).unwrap();
        let x = est.position()[0];
        assert!(x > 0.0 && x <= 10.0);
        assert_eq!(est.rect().width, est.mean()[2]);
    }

    #[test]
    fn test_singular_innovation_rejected() {
        let kf = KalmanFilter::default();
        let mean = Array1::zeros(8);
        let mut cov = Array2::zeros((8, 8));
        // Cancel out measurement noise on the first axis.
        cov[[0, 0]] = -4.0;
        let result = kf.update(&mean, &cov, [1.0, 1.0, 1.0, 1.0]);
        assert!(matches!(result, Err(TrackingError::NumericDegeneracy(_))));
    }

    #[test]
    fn test_invert_identity() {
        let inv = invert_4x4(&Array2::eye(4)).unwrap();
        assert_eq!(inv, Array2::<f64>::eye(4));
    }
}
