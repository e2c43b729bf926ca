//! Ordinary least-squares velocity estimate over a track history.

use crate::tracker::TrackHistory;

/// Below this the time spread (or positional spread) is treated as zero.
const DEGENERATE_EPSILON: f64 = 1e-12;

/// Straight-line fit `v(t) = intercept + slope * t`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    /// Residual sum of squares.
    pub ss_res: f64,
    /// Total sum of squares around the mean.
    pub ss_tot: f64,
}

impl LinearFit {
    /// Coefficient of determination; a constant series fits perfectly.
    pub fn r_squared(&self) -> f64 {
        if self.ss_tot <= DEGENERATE_EPSILON {
            1.0
        } else {
            (1.0 - self.ss_res / self.ss_tot).clamp(0.0, 1.0)
        }
    }
}

/// Fit `values` against `times`. `None` when fewer than two points are given,
/// the lengths differ, or all times coincide.
pub fn fit_line(times: &[f64], values: &[f64]) -> Option<LinearFit> {
    if times.len() != values.len() || times.len() < 2 {
        return None;
    }

    let n = times.len() as f64;
    let t_mean = times.iter().sum::<f64>() / n;
    let v_mean = values.iter().sum::<f64>() / n;

    let mut s_tt = 0.0;
    let mut s_tv = 0.0;
    let mut ss_tot = 0.0;
    for (&t, &v) in times.iter().zip(values) {
        s_tt += (t - t_mean) * (t - t_mean);
        s_tv += (t - t_mean) * (v - v_mean);
        ss_tot += (v - v_mean) * (v - v_mean);
    }

    if !s_tt.is_finite() || s_tt <= DEGENERATE_EPSILON {
        return None;
    }

    let slope = s_tv / s_tt;
    let intercept = v_mean - slope * t_mean;
    let ss_res = times
        .iter()
        .zip(values)
        .map(|(&t, &v)| {
            let residual = v - (intercept + slope * t);
            residual * residual
        })
        .sum();

    Some(LinearFit {
        slope,
        intercept,
        ss_res,
        ss_tot,
    })
}

/// Velocity and fit quality from a 2D position history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegressionEstimate {
    pub velocity: [f64; 2],
    /// Pooled 2D coefficient of determination in [0, 1].
    pub r_squared: f64,
}

/// Fit x(t) and y(t) independently over the history, with time measured from
/// the oldest sample.
pub fn fit_history(history: &TrackHistory) -> Option<RegressionEstimate> {
    let t0 = history.iter().next()?.timestamp;
    let times: Vec<f64> = history.iter().map(|s| s.timestamp - t0).collect();
    let xs: Vec<f64> = history.iter().map(|s| s.x).collect();
    let ys: Vec<f64> = history.iter().map(|s| s.y).collect();

    let fit_x = fit_line(&times, &xs)?;
    let fit_y = fit_line(&times, &ys)?;

    let ss_tot = fit_x.ss_tot + fit_y.ss_tot;
    let ss_res = fit_x.ss_res + fit_y.ss_res;
    let r_squared = if ss_tot <= DEGENERATE_EPSILON {
        1.0
    } else {
        (1.0 - ss_res / ss_tot).clamp(0.0, 1.0)
    };

    let velocity = [fit_x.slope, fit_y.slope];
    if velocity.iter().any(|v| !v.is_finite()) {
        return None;
    }

    Some(RegressionEstimate {
        velocity,
        r_squared,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::HistorySample;
    use approx::assert_relative_eq;

    fn history(points: &[(f64, f64, f64)]) -> TrackHistory {
        points
            .iter()
            .enumerate()
            .map(|(i, &(x, y, t))| HistorySample {
                frame_index: i as u64,
                x,
                y,
                timestamp: t,
            })
            .collect()
    }

    #[test]
    fn test_fit_line_exact() {
        let fit = fit_line(&[0.0, 1.0, 2.0, 3.0], &[1.0, 3.0, 5.0, 7.0]).unwrap();
        assert_relative_eq!(fit.slope, 2.0, epsilon = 1e-12);
        assert_relative_eq!(fit.intercept, 1.0, epsilon = 1e-12);
        assert_relative_eq!(fit.r_squared(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_fit_line_degenerate_times() {
        assert!(fit_line(&[2.0, 2.0, 2.0], &[1.0, 2.0, 3.0]).is_none());
        assert!(fit_line(&[1.0], &[1.0]).is_none());
        assert!(fit_line(&[1.0, 2.0], &[1.0]).is_none());
    }

    #[test]
    fn test_fit_line_noisy_quality_drops() {
        let fit = fit_line(&[0.0, 1.0, 2.0, 3.0, 4.0], &[0.0, 5.0, -5.0, 5.0, 0.0]).unwrap();
        assert!(fit.r_squared() < 0.2);
    }

    #[test]
    fn test_fit_history_horizontal_motion() {
        let h = history(&[
            (0.0, 0.0, 0.0),
            (10.0, 0.0, 1.0),
            (20.0, 0.0, 2.0),
            (30.0, 0.0, 3.0),
            (40.0, 0.0, 4.0),
        ]);
        let est = fit_history(&h).unwrap();
        assert_relative_eq!(est.velocity[0], 10.0, epsilon = 1e-9);
        assert_relative_eq!(est.velocity[1], 0.0, epsilon = 1e-9);
        assert_relative_eq!(est.r_squared, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_fit_history_uses_relative_time() {
        let h = history(&[(0.0, 0.0, 1000.0), (2.0, 4.0, 1001.0), (4.0, 8.0, 1002.0)]);
        let est = fit_history(&h).unwrap();
        assert_relative_eq!(est.velocity[0], 2.0, epsilon = 1e-9);
        assert_relative_eq!(est.velocity[1], 4.0, epsilon = 1e-9);
    }

    #[test]
    fn test_fit_history_stationary() {
        let h = history(&[(5.0, 5.0, 0.0), (5.0, 5.0, 1.0), (5.0, 5.0, 2.0)]);
        let est = fit_history(&h).unwrap();
        assert_eq!(est.velocity, [0.0, 0.0]);
        assert_eq!(est.r_squared, 1.0);
    }
}
