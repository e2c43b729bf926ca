//! Association tests: optimality against brute force, partition invariants,
//! and the separable-pairs scenario.

use ndarray::Array2;
use proptest::prelude::*;
use skytrack_rs::tracker::{cost_matrix, linear_assignment, optimal_assignment};
use skytrack_rs::{CostMetric, Rect};

/// Minimum total cost over every one-to-one matching of size min(rows, cols).
fn brute_force_min_cost(costs: &Array2<f64>) -> f64 {
    let (rows, cols) = costs.dim();
    fn search(
        costs: &Array2<f64>,
        row: usize,
        used: &mut Vec<bool>,
        remaining: usize,
        acc: f64,
        best: &mut f64,
    ) {
        if remaining == 0 {
            *best = best.min(acc);
            return;
        }
        let (rows, cols) = costs.dim();
        if row == rows {
            return;
        }
        // Rows may be skipped only when there are more rows than columns.
        if rows - row > remaining {
            search(costs, row + 1, used, remaining, acc, best);
        }
        for col in 0..cols {
            if !used[col] {
                used[col] = true;
                search(costs, row + 1, used, remaining - 1, acc + costs[[row, col]], best);
                used[col] = false;
            }
        }
    }

    let mut best = f64::INFINITY;
    let size = rows.min(cols);
    if size == 0 {
        return 0.0;
    }
    search(costs, 0, &mut vec![false; cols], size, 0.0, &mut best);
    best
}

/// Lexicographically smallest optimal matching, by enumerating every
/// permutation of the square padding. Padding costs zero and every padding
/// column reads as `cols` when comparing.
fn brute_force_canonical(costs: &Array2<f64>) -> Vec<(usize, usize)> {
    fn permutations(items: Vec<usize>) -> Vec<Vec<usize>> {
        if items.len() <= 1 {
            return vec![items];
        }
        let mut out = Vec::new();
        for i in 0..items.len() {
            let mut rest = items.clone();
            let head = rest.remove(i);
            for mut tail in permutations(rest) {
                tail.insert(0, head);
                out.push(tail);
            }
        }
        out
    }

    let (rows, cols) = costs.dim();
    let size = rows.max(cols);
    let total = |perm: &[usize]| -> f64 {
        (0..rows)
            .filter(|&r| perm[r] < cols)
            .map(|r| costs[[r, perm[r]]])
            .sum()
    };
    let key = |perm: &[usize]| -> Vec<usize> { (0..rows).map(|r| perm[r].min(cols)).collect() };

    let perms = permutations((0..size).collect());
    let best = perms.iter().map(|p| total(p)).fold(f64::INFINITY, f64::min);
    let canonical = perms
        .iter()
        .filter(|p| total(p) <= best + 1e-9)
        .map(|p| key(p))
        .min()
        .unwrap();
    canonical
        .into_iter()
        .enumerate()
        .filter(|&(_, c)| c < cols)
        .collect()
}

fn tied_matrix_strategy() -> impl Strategy<Value = Array2<f64>> {
    (1usize..=4, 1usize..=4).prop_flat_map(|(rows, cols)| {
        prop::collection::vec((0u8..3).prop_map(|v| f64::from(v) * 0.5), rows * cols)
            .prop_map(move |values| Array2::from_shape_vec((rows, cols), values).unwrap())
    })
}

fn matrix_strategy() -> impl Strategy<Value = Array2<f64>> {
    (1usize..=4, 1usize..=4).prop_flat_map(|(rows, cols)| {
        prop::collection::vec(0.0f64..1.0, rows * cols)
            .prop_map(move |values| Array2::from_shape_vec((rows, cols), values).unwrap())
    })
}

proptest! {
    #[test]
    fn prop_assignment_is_optimal(costs in matrix_strategy()) {
        let pairs = optimal_assignment(&costs).unwrap();
        let (rows, cols) = costs.dim();
        prop_assert_eq!(pairs.len(), rows.min(cols));

        let total: f64 = pairs.iter().map(|&(r, c)| costs[[r, c]]).sum();
        prop_assert!(total <= brute_force_min_cost(&costs) + 1e-9);
    }

    #[test]
    fn prop_assignment_partitions_inputs(costs in matrix_strategy(), gate in 0.0f64..1.0) {
        let (rows, cols) = costs.dim();
        let result = linear_assignment(&costs, gate);

        prop_assert!(result.matches.len() <= rows.min(cols));

        let mut track_seen = vec![0; rows];
        let mut det_seen = vec![0; cols];
        for &(r, c) in &result.matches {
            prop_assert!(costs[[r, c]] <= gate);
            track_seen[r] += 1;
            det_seen[c] += 1;
        }
        for &r in &result.unmatched_tracks {
            track_seen[r] += 1;
        }
        for &c in &result.unmatched_detections {
            det_seen[c] += 1;
        }
        prop_assert!(track_seen.iter().all(|&n| n == 1));
        prop_assert!(det_seen.iter().all(|&n| n == 1));
    }

    #[test]
    fn prop_ties_resolve_to_lexicographic_minimum(costs in tied_matrix_strategy()) {
        let pairs = optimal_assignment(&costs).unwrap();
        prop_assert_eq!(pairs, brute_force_canonical(&costs));
    }

    #[test]
    fn prop_assignment_is_reproducible(costs in matrix_strategy()) {
        prop_assert_eq!(optimal_assignment(&costs), optimal_assignment(&costs));
    }
}

#[test]
fn test_separable_pairs_not_swapped() {
    // Two tracks far apart from each other; each detection overlaps one track.
    let tracks = [
        Rect::new(0.0, 0.0, 100.0, 100.0),
        Rect::new(500.0, 500.0, 100.0, 100.0),
    ];
    // IoU 0.9 with track 0 and 0.85 with track 1 (same height, narrower width).
    let dets = [
        Rect::new(500.0, 500.0, 85.0, 100.0),
        Rect::new(0.0, 0.0, 90.0, 100.0),
    ];
    assert!((tracks[0].iou(&dets[1]) - 0.9).abs() < 1e-9);
    assert!((tracks[1].iou(&dets[0]) - 0.85).abs() < 1e-9);
    assert_eq!(tracks[0].iou(&tracks[1]), 0.0);

    let costs = cost_matrix(&tracks, &dets, CostMetric::Iou, 100.0);
    let result = linear_assignment(&costs, 0.7);

    let mut matches = result.matches.clone();
    matches.sort();
    assert_eq!(matches, vec![(0, 1), (1, 0)]);
    assert!(result.unmatched_tracks.is_empty());
    assert!(result.unmatched_detections.is_empty());
}

#[test]
fn test_equal_costs_prefer_lowest_indices() {
    let costs = Array2::from_elem((3, 3), 0.4);
    let pairs = optimal_assignment(&costs).unwrap();
    assert_eq!(pairs, vec![(0, 0), (1, 1), (2, 2)]);
}

#[test]
fn test_distant_pairs_gated_out() {
    let tracks = [Rect::new(0.0, 0.0, 10.0, 10.0)];
    let dets = [Rect::new(300.0, 300.0, 10.0, 10.0)];
    let costs = cost_matrix(&tracks, &dets, CostMetric::Iou, 100.0);
    let result = linear_assignment(&costs, 0.7);
    assert!(result.matches.is_empty());
    assert_eq!(result.unmatched_tracks, vec![0]);
    assert_eq!(result.unmatched_detections, vec![0]);
}
