//! Builder for creating Detection objects from various input formats.

use crate::error::Result;
use crate::tracker::{Detection, Rect};

/// Builder for creating validated `Detection` objects from various input formats.
#[derive(Debug, Clone, Default)]
pub struct DetectionBuilder {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    score: f64,
    class_label: Option<String>,
}

impl DetectionBuilder {
    /// Create a new detection builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set bounding box in TLBR format (x1, y1, x2, y2).
    pub fn tlbr(mut self, x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        self.x1 = x1;
        self.y1 = y1;
        self.x2 = x2;
        self.y2 = y2;
        self
    }

    /// Set bounding box in XYWH format (center_x, center_y, width, height).
    pub fn xywh(mut self, cx: f64, cy: f64, w: f64, h: f64) -> Self {
        self.x1 = cx - w / 2.0;
        self.y1 = cy - h / 2.0;
        self.x2 = cx + w / 2.0;
        self.y2 = cy + h / 2.0;
        self
    }

    /// Set bounding box in TLWH format (left, top, width, height).
    pub fn tlwh(mut self, x: f64, y: f64, w: f64, h: f64) -> Self {
        self.x1 = x;
        self.y1 = y;
        self.x2 = x + w;
        self.y2 = y + h;
        self
    }

    /// Set the confidence score.
    pub fn score(mut self, score: f64) -> Self {
        self.score = score;
        self
    }

    /// Set the class label.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.class_label = Some(label.into());
        self
    }

    /// Build the final `Detection`, rejecting malformed geometry or scores.
    pub fn build(self) -> Result<Detection> {
        let detection = Detection {
            bbox: Rect::from_tlbr(self.x1, self.y1, self.x2, self.y2),
            score: self.score,
            class_label: self.class_label,
        };
        detection.validate()?;
        Ok(detection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TrackingError;

    #[test]
    fn test_detection_builder() {
        let det = DetectionBuilder::new()
            .tlbr(10.0, 20.0, 50.0, 80.0)
            .score(0.95)
            .label("aircraft")
            .build()
            .unwrap();

        assert_eq!(det.score, 0.95);
        assert_eq!(det.bbox.center(), (30.0, 50.0));
        assert_eq!(det.class_label.as_deref(), Some("aircraft"));
    }

    #[test]
    fn test_formats_agree() {
        let a = DetectionBuilder::new().xywh(30.0, 50.0, 40.0, 60.0).score(0.5).build();
        let b = DetectionBuilder::new().tlwh(10.0, 20.0, 40.0, 60.0).score(0.5).build();
        assert_eq!(a, b);
    }

    #[test]
    fn test_inverted_box_rejected() {
        let result = DetectionBuilder::new().tlbr(50.0, 20.0, 10.0, 80.0).score(0.9).build();
        assert!(matches!(result, Err(TrackingError::MalformedDetection(_))));
    }
}
