//! Impact boundary geometry.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackingError};

/// Velocity components at or below this never reach a boundary.
const AXIS_EPSILON: f64 = 1e-12;

/// Orientation of an impact plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactAxis {
    /// Vertical line `x = position`.
    X,
    /// Horizontal line `y = position`.
    Y,
}

/// Where forecast trajectories are considered to impact.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImpactBoundary {
    /// The image frame `[0, width] x [0, height]`; impact is the first edge crossed.
    Frame { width: f64, height: f64 },
    /// A single line in the image plane.
    Plane { axis: ImpactAxis, position: f64 },
}

impl Default for ImpactBoundary {
    fn default() -> Self {
        ImpactBoundary::Frame {
            width: 1280.0,
            height: 720.0,
        }
    }
}

/// Point and time at which an extrapolated trajectory meets the boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Crossing {
    pub point: [f64; 2],
    pub time: f64,
}

impl ImpactBoundary {
    pub fn validate(&self) -> Result<()> {
        let ok = match *self {
            ImpactBoundary::Frame { width, height } => {
                width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0
            }
            ImpactBoundary::Plane { position, .. } => position.is_finite(),
        };
        if ok {
            Ok(())
        } else {
            Err(TrackingError::InvalidConfig(format!(
                "invalid impact boundary {self:?}"
            )))
        }
    }

    /// Extrapolate `position + velocity * t` for `t >= 0` to the boundary.
    ///
    /// Returns `None` when the motion never reaches it (stationary, parallel
    /// to a plane, or moving away from one). The crossing point is clamped to
    /// the boundary.
    pub fn crossing(&self, position: [f64; 2], velocity: [f64; 2]) -> Option<Crossing> {
        match *self {
            ImpactBoundary::Frame { width, height } => {
                let limits = [width, height];
                let time = (0..2)
                    .filter(|&axis| velocity[axis].abs() > AXIS_EPSILON)
                    .map(|axis| {
                        let edge = if velocity[axis] > 0.0 { limits[axis] } else { 0.0 };
                        ((edge - position[axis]) / velocity[axis]).max(0.0)
                    })
                    .fold(None, |best: Option<f64>, t| Some(best.map_or(t, |b| b.min(t))))?;

                let point = [
                    (position[0] + velocity[0] * time).clamp(0.0, width),
                    (position[1] + velocity[1] * time).clamp(0.0, height),
                ];
                Some(Crossing { point, time })
            }
            ImpactBoundary::Plane { axis, position: plane } => {
                let (along, across) = match axis {
                    ImpactAxis::X => (0, 1),
                    ImpactAxis::Y => (1, 0),
                };
                if velocity[along].abs() <= AXIS_EPSILON {
                    return None;
                }
                let time = (plane - position[along]) / velocity[along];
                if time < 0.0 {
                    return None;
                }
                let mut point = [0.0; 2];
                point[along] = plane;
                point[across] = position[across] + velocity[across] * time;
                Some(Crossing { point, time })
            }
        }
    }
}
