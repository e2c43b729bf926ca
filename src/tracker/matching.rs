//! Matching utilities for multi-object tracking.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackingError};
use crate::tracker::config::CostMetric;
use crate::tracker::rect::{Rect, iou_batch};

/// Detection input for the tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Bounding box in pixel coordinates
    pub bbox: Rect,
    /// Detection confidence score in [0, 1]
    pub score: f64,
    /// Optional class label reported by the detector
    pub class_label: Option<String>,
}

impl Detection {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64, score: f64) -> Self {
        Self::from_rect(Rect::from_tlbr(x1, y1, x2, y2), score)
    }

    pub fn from_center(cx: f64, cy: f64, width: f64, height: f64, score: f64) -> Self {
        Self::from_rect(Rect::from_center(cx, cy, width, height), score)
    }

    pub fn from_rect(bbox: Rect, score: f64) -> Self {
        Self {
            bbox,
            score,
            class_label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.class_label = Some(label.into());
        self
    }

    /// Reject non-finite coordinates, non-positive sizes and scores outside [0, 1].
    pub fn validate(&self) -> Result<()> {
        if !self.bbox.is_valid() {
            return Err(TrackingError::MalformedDetection(format!(
                "invalid box geometry {:?}",
                self.bbox
            )));
        }
        if !(0.0..=1.0).contains(&self.score) {
            return Err(TrackingError::MalformedDetection(format!(
                "score {} outside [0, 1]",
                self.score
            )));
        }
        Ok(())
    }
}

/// Build the track x detection association cost matrix.
///
/// With [`CostMetric::Iou`] the cost is `1 - IoU`, except for pairs where
/// either box is degenerate, which use the normalized centroid distance
/// `min(distance / centroid_scale, 1)`. Costs are always within [0, 1].
pub fn cost_matrix(
    track_boxes: &[Rect],
    det_boxes: &[Rect],
    metric: CostMetric,
    centroid_scale: f64,
) -> Array2<f64> {
    let centroid_cost =
        |t: &Rect, d: &Rect| (t.centroid_distance(d) / centroid_scale).clamp(0.0, 1.0);

    match metric {
        CostMetric::Iou => {
            let mut dists = iou_batch(track_boxes, det_boxes);
            for (i, t) in track_boxes.iter().enumerate() {
                for (j, d) in det_boxes.iter().enumerate() {
                    dists[[i, j]] = if t.is_valid() && d.is_valid() {
                        1.0 - dists[[i, j]]
                    } else {
                        centroid_cost(t, d)
                    };
                }
            }
            // Non-finite centers would poison the solver.
            dists.mapv_inplace(|c| if c.is_finite() { c } else { 1.0 });
            dists
        }
        CostMetric::Centroid => {
            Array2::from_shape_fn((track_boxes.len(), det_boxes.len()), |(i, j)| {
                let c = centroid_cost(&track_boxes[i], &det_boxes[j]);
                if c.is_finite() { c } else { 1.0 }
            })
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssignmentResult {
    pub matches: Vec<(usize, usize)>,
    pub unmatched_tracks: Vec<usize>,
    pub unmatched_detections: Vec<usize>,
}

const PADDING_COST: f64 = 1e6;
const TIE_EPSILON: f64 = 1e-9;
const RELAX_EPSILON: f64 = 1e-12;
const UNOWNED: usize = usize::MAX;

/// Minimum-cost one-to-one assignment over the full matrix.
///
/// Returns `min(rows, cols)` `(row, col)` pairs sorted by row. Among
/// equal-cost solutions the one whose column sequence, read in row order, is
/// lexicographically smallest wins. `None` when the solver fails.
pub fn optimal_assignment(cost_matrix: &Array2<f64>) -> Option<Vec<(usize, usize)>> {
    let (num_rows, num_cols) = cost_matrix.dim();
    if num_rows == 0 || num_cols == 0 {
        return Some(Vec::new());
    }

    let size = num_rows.max(num_cols);
    let mut padded = Array2::<f64>::from_elem((size, size), PADDING_COST);
    for i in 0..num_rows {
        for j in 0..num_cols {
            padded[[i, j]] = cost_matrix[[i, j]];
        }
    }

    let mut row_to_col = if size == 1 {
        vec![0]
    } else {
        match lapjv::lapjv(&padded) {
            Ok((row_to_col, _)) => row_to_col,
            Err(err) => {
                tracing::warn!(
                    error = ?err,
                    rows = num_rows,
                    cols = num_cols,
                    "assignment solver failed"
                );
                return None;
            }
        }
    };

    canonicalize_ties(cost_matrix, &mut row_to_col);

    Some(
        row_to_col
            .iter()
            .enumerate()
            .filter(|&(row, &col)| row < num_rows && col < num_cols)
            .map(|(row, &col)| (row, col))
            .collect(),
    )
}

/// Rewrite an optimal assignment into the lexicographically smallest optimal
/// one: row by row, each real row takes the lowest column it can reach
/// through an alternating cycle of zero extra cost over the rows not yet
/// fixed. Padding cells cost the same in every full assignment, so they are
/// scored as zero here.
fn canonicalize_ties(cost_matrix: &Array2<f64>, row_to_col: &mut [usize]) {
    let (num_rows, num_cols) = cost_matrix.dim();
    let n = row_to_col.len();
    let cost = |row: usize, col: usize| {
        if row < num_rows && col < num_cols {
            cost_matrix[[row, col]]
        } else {
            0.0
        }
    };

    for row in 0..num_rows {
        let current = row_to_col[row];
        let mut owner = vec![UNOWNED; n];
        for later in (row + 1)..n {
            owner[row_to_col[later]] = later;
        }
        if (0..current).all(|col| owner[col] == UNOWNED) {
            continue;
        }

        // dist[c]: extra cost of moving the owner of column c onward until
        // some row takes over `current`.
        let open: Vec<usize> = (0..n).filter(|&col| owner[col] != UNOWNED).collect();
        let step = |from: usize, to: usize| cost(owner[from], to) - cost(owner[from], from);
        let mut dist = vec![f64::INFINITY; n];
        let mut next = vec![current; n];
        for &col in &open {
            dist[col] = step(col, current);
        }
        for _ in 0..open.len() {
            let mut changed = false;
            for &from in &open {
                for &to in &open {
                    if from == to {
                        continue;
                    }
                    let candidate = step(from, to) + dist[to];
                    if candidate < dist[from] - RELAX_EPSILON {
                        dist[from] = candidate;
                        next[from] = to;
                        changed = true;
                    }
                }
            }
            if !changed {
                break;
            }
        }

        for col in (0..current).filter(|&col| owner[col] != UNOWNED) {
            let delta = cost(row, col) - cost(row, current) + dist[col];
            if delta.is_nan() || delta > TIE_EPSILON {
                continue;
            }
            if let Some(path) = handover_path(col, current, &next) {
                row_to_col[row] = col;
                for hop in path.windows(2) {
                    row_to_col[owner[hop[0]]] = hop[1];
                }
                break;
            }
        }
    }
}

/// Columns visited from `start` to `target` following `next`; `None` if the
/// walk revisits a column.
fn handover_path(start: usize, target: usize, next: &[usize]) -> Option<Vec<usize>> {
    let mut seen = vec![false; next.len()];
    let mut path = vec![start];
    let mut col = start;
    seen[col] = true;
    while col != target {
        col = next[col];
        if seen[col] {
            return None;
        }
        seen[col] = true;
        path.push(col);
    }
    Some(path)
}

/// Optimal assignment followed by gating: pairs whose cost exceeds `thresh`
/// are split back into an unmatched track and an unmatched detection.
pub fn linear_assignment(cost_matrix: &Array2<f64>, thresh: f64) -> AssignmentResult {
    let (num_rows, num_cols) = cost_matrix.dim();

    let Some(pairs) = optimal_assignment(cost_matrix) else {
        return AssignmentResult {
            matches: vec![],
            unmatched_tracks: (0..num_rows).collect(),
            unmatched_detections: (0..num_cols).collect(),
        };
    };

    let mut matches = vec![];
    let mut track_matched = vec![false; num_rows];
    let mut detection_matched = vec![false; num_cols];

    for (row, col) in pairs {
        if cost_matrix[[row, col]] <= thresh {
            matches.push((row, col));
            track_matched[row] = true;
            detection_matched[col] = true;
        }
    }

    let unmatched = |mask: &[bool]| -> Vec<usize> {
        mask.iter()
            .enumerate()
            .filter_map(|(i, &m)| if m { None } else { Some(i) })
            .collect()
    };

    AssignmentResult {
        unmatched_tracks: unmatched(&track_matched),
        unmatched_detections: unmatched(&detection_matched),
        matches,
    }
}
