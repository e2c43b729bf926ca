use serde::{Deserialize, Serialize};

/// Bounding box representation with format conversion utilities.
///
/// Stored as TLWH (top-left x, top-left y, width, height) in pixel
/// coordinates. Detectors and the filter mostly speak center/size, so the
/// center-based constructors are the common entry point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Top-left x coordinate
    pub x: f64,
    /// Top-left y coordinate
    pub y: f64,
    /// Width of the bounding box
    pub width: f64,
    /// Height of the bounding box
    pub height: f64,
}

impl Rect {
    /// Create a new Rect from top-left coordinates and dimensions (TLWH format).
    #[inline]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a Rect from TLBR format (top-left x, top-left y, bottom-right x, bottom-right y).
    #[inline]
    pub fn from_tlbr(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
        }
    }

    /// Create a Rect from its center point and size.
    #[inline]
    pub fn from_center(cx: f64, cy: f64, width: f64, height: f64) -> Self {
        Self {
            x: cx - width / 2.0,
            y: cy - height / 2.0,
            width,
            height,
        }
    }

    /// Convert to TLBR format: (x1, y1, x2, y2).
    #[inline]
    pub fn to_tlbr(&self) -> [f64; 4] {
        [self.x, self.y, self.x + self.width, self.y + self.height]
    }

    /// Convert to center format: (center_x, center_y, width, height).
    ///
    /// This is the measurement layout consumed by the Kalman filter.
    #[inline]
    pub fn to_cxcywh(&self) -> [f64; 4] {
        let (cx, cy) = self.center();
        [cx, cy, self.width, self.height]
    }

    /// Get the center point of the bounding box.
    #[inline]
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Get the area of the bounding box.
    #[inline]
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// True when every coordinate is finite and both dimensions are positive.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
            && self.width > 0.0
            && self.height > 0.0
    }

    /// Calculate Intersection over Union (IoU) with another bounding box.
    pub fn iou(&self, other: &Rect) -> f64 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.x + self.width).min(other.x + other.width);
        let y2 = (self.y + self.height).min(other.y + other.height);

        let inter_width = (x2 - x1).max(0.0);
        let inter_height = (y2 - y1).max(0.0);
        let inter_area = inter_width * inter_height;

        let union_area = self.area() + other.area() - inter_area;

        if union_area > 0.0 {
            inter_area / union_area
        } else {
            0.0
        }
    }

    /// Euclidean distance between the two box centers.
    pub fn centroid_distance(&self, other: &Rect) -> f64 {
        let (ax, ay) = self.center();
        let (bx, by) = other.center();
        (ax - bx).hypot(ay - by)
    }
}

use ndarray::Array2;

/// Calculate IoU matrix between two sets of bounding boxes.
///
/// Returns a matrix of shape (M, N) where M is the length of `boxes_a`
/// and N is the length of `boxes_b`.
pub fn iou_batch(boxes_a: &[Rect], boxes_b: &[Rect]) -> Array2<f64> {
    let mut ious = Array2::zeros((boxes_a.len(), boxes_b.len()));
    for (i, a) in boxes_a.iter().enumerate() {
        for (j, b) in boxes_b.iter().enumerate() {
            ious[[i, j]] = a.iou(b);
        }
    }
    ious
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_conversions() {
        let rect = Rect::new(10.0, 20.0, 30.0, 40.0);

        assert_eq!(rect.to_tlbr(), [10.0, 20.0, 40.0, 60.0]);
        assert_eq!(rect.to_cxcywh(), [25.0, 40.0, 30.0, 40.0]);
        assert_eq!(Rect::from_tlbr(10.0, 20.0, 40.0, 60.0), rect);
        assert_eq!(Rect::from_center(25.0, 40.0, 30.0, 40.0), rect);
    }

    #[test]
    fn test_iou() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 5.0, 10.0, 10.0);

        // Intersection 25, union 175
        let iou = a.iou(&b);
        assert!((iou - 25.0 / 175.0).abs() < 1e-12);
    }

    #[test]
    fn test_iou_no_overlap() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(20.0, 20.0, 10.0, 10.0);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_iou_degenerate_box() {
        let a = Rect::new(0.0, 0.0, 0.0, 0.0);
        assert_eq!(a.iou(&a), 0.0);
        assert!(!a.is_valid());
    }

    #[test]
    fn test_is_valid_rejects_nan() {
        assert!(!Rect::new(f64::NAN, 0.0, 1.0, 1.0).is_valid());
        assert!(!Rect::new(0.0, 0.0, -1.0, 1.0).is_valid());
        assert!(Rect::new(0.0, 0.0, 1.0, 1.0).is_valid());
    }

    #[test]
    fn test_centroid_distance() {
        let a = Rect::from_center(0.0, 0.0, 4.0, 4.0);
        let b = Rect::from_center(3.0, 4.0, 2.0, 2.0);
        assert!((a.centroid_distance(&b) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_iou_batch_shape() {
        let a = [Rect::new(0.0, 0.0, 10.0, 10.0)];
        let b = [Rect::new(0.0, 0.0, 10.0, 10.0), Rect::new(50.0, 50.0, 1.0, 1.0)];
        let m = iou_batch(&a, &b);
        assert_eq!(m.dim(), (1, 2));
        assert!((m[[0, 0]] - 1.0).abs() < 1e-12);
        assert_eq!(m[[0, 1]], 0.0);
    }
}
