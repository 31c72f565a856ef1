use crate::bbox::{BBox, Ltrb};

use munkres::{solve_assignment, WeightMatrix};
use ndarray::{Array2, ArrayView2};
use tracing::{trace, warn};

/// Cost of pairing a real row or column with a padding one.
const PADDING_COST: f32 = 1.0;

/// Result of matching predicted track boxes against detections.
///
/// Indices refer to the slices handed to [`associate`]; `matches` holds
/// `(track, detection, iou)` ordered by track index.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Association {
    pub matches: Vec<(usize, usize, f32)>,
    pub unmatched_tracks: Vec<usize>,
    pub unmatched_detections: Vec<usize>,
}

impl Association {
    fn unmatched(rows: usize, cols: usize) -> Self {
        Self {
            matches: Vec::new(),
            unmatched_tracks: (0..rows).collect(),
            unmatched_detections: (0..cols).collect(),
        }
    }
}

/// Pairwise IoU, rows are tracks and columns are detections.
pub fn iou_matrix(tracks: &[BBox<Ltrb>], detections: &[BBox<Ltrb>]) -> Array2<f32> {
    Array2::from_shape_fn((tracks.len(), detections.len()), |(i, j)| {
        tracks[i].iou(&detections[j])
    })
}

/// Minimum total cost assignment over `1 - iou`, gated by `iou_threshold`.
///
/// Rectangular inputs are padded to square, padding rows and columns never
/// produce a match.
pub fn assign(iou: ArrayView2<'_, f32>, iou_threshold: f32) -> Association {
    let (rows, cols) = iou.dim();

    if rows == 0 || cols == 0 {
        return Association::unmatched(rows, cols);
    }

    let n = rows.max(cols);
    let mut weights = WeightMatrix::from_fn(n, |(r, c)| {
        if r < rows && c < cols {
            let v = iou[[r, c]];

            if v.is_finite() {
                1.0 - v.clamp(0.0, 1.0)
            } else {
                PADDING_COST
            }
        } else {
            PADDING_COST
        }
    });

    let solution = match solve_assignment(&mut weights) {
        Ok(solution) => solution,
        Err(err) => {
            warn!(?err, rows, cols, "assignment could not be solved");
            return Association::unmatched(rows, cols);
        }
    };

    let mut track_matched = vec![false; rows];
    let mut det_matched = vec![false; cols];
    let mut matches = Vec::with_capacity(rows.min(cols));

    for pos in solution {
        if pos.row >= rows || pos.column >= cols {
            continue;
        }

        let score = iou[[pos.row, pos.column]];
        if score >= iou_threshold {
            track_matched[pos.row] = true;
            det_matched[pos.column] = true;
            matches.push((pos.row, pos.column, score));
        }
    }

    matches.sort_by_key(|&(t, _, _)| t);

    let unmatched_tracks: Vec<usize> = (0..rows).filter(|&i| !track_matched[i]).collect();
    let unmatched_detections: Vec<usize> = (0..cols).filter(|&j| !det_matched[j]).collect();

    trace!(
        matched = matches.len(),
        unmatched_tracks = unmatched_tracks.len(),
        unmatched_detections = unmatched_detections.len(),
        "association solved"
    );

    Association {
        matches,
        unmatched_tracks,
        unmatched_detections,
    }
}

/// Matches predicted track boxes to detection boxes.
#[inline]
pub fn associate(
    predicted: &[BBox<Ltrb>],
    detections: &[BBox<Ltrb>],
    iou_threshold: f32,
) -> Association {
    let iou = iou_matrix(predicted, detections);

    assign(iou.view(), iou_threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn empty_inputs() {
        let b = BBox::ltrb(0.0, 0.0, 10.0, 10.0);

        let a = associate(&[], &[b, b], 0.3);
        assert!(a.matches.is_empty());
        assert!(a.unmatched_tracks.is_empty());
        assert_eq!(a.unmatched_detections, vec![0, 1]);

        let a = associate(&[b, b, b], &[], 0.3);
        assert!(a.matches.is_empty());
        assert_eq!(a.unmatched_tracks, vec![0, 1, 2]);
        assert!(a.unmatched_detections.is_empty());

        assert_eq!(associate(&[], &[], 0.3), Association::default());
    }

    #[test]
    fn minimizes_total_cost_not_greedy() {
        // greedy on row 0 would take column 0 and leave row 1 with 0.1
        let iou = arr2(&[[0.9, 0.8], [0.8, 0.1]]);
        let a = assign(iou.view(), 0.3);

        assert_eq!(a.matches, vec![(0, 1, 0.8), (1, 0, 0.8)]);
        assert!(a.unmatched_tracks.is_empty());
        assert!(a.unmatched_detections.is_empty());
    }

    #[test]
    fn gating_moves_both_sides_to_unmatched() {
        let iou = arr2(&[[0.9, 0.0], [0.0, 0.1]]);
        let a = assign(iou.view(), 0.3);

        assert_eq!(a.matches, vec![(0, 0, 0.9)]);
        assert_eq!(a.unmatched_tracks, vec![1]);
        assert_eq!(a.unmatched_detections, vec![1]);
    }

    #[test]
    fn rectangular_more_tracks() {
        let iou = arr2(&[[0.0], [0.7], [0.4]]);
        let a = assign(iou.view(), 0.3);

        assert_eq!(a.matches, vec![(1, 0, 0.7)]);
        assert_eq!(a.unmatched_tracks, vec![0, 2]);
        assert!(a.unmatched_detections.is_empty());
    }

    #[test]
    fn rectangular_more_detections() {
        let iou = arr2(&[[0.2, 0.5, 0.6]]);
        let a = assign(iou.view(), 0.3);

        assert_eq!(a.matches, vec![(0, 2, 0.6)]);
        assert!(a.unmatched_tracks.is_empty());
        assert_eq!(a.unmatched_detections, vec![0, 1]);
    }

    #[test]
    fn deterministic_on_ties() {
        let iou = arr2(&[[0.5, 0.5], [0.5, 0.5]]);
        let first = assign(iou.view(), 0.3);

        for _ in 0..10 {
            assert_eq!(assign(iou.view(), 0.3), first);
        }
        assert_eq!(first.matches.len(), 2);
    }

    #[test]
    fn boxes_match_by_overlap() {
        let tracks = [
            BBox::ltrb(0.0, 0.0, 10.0, 10.0),
            BBox::ltrb(100.0, 100.0, 120.0, 120.0),
        ];
        let dets = [
            BBox::ltrb(101.0, 101.0, 121.0, 121.0),
            BBox::ltrb(1.0, 0.0, 11.0, 10.0),
            BBox::ltrb(500.0, 500.0, 510.0, 510.0),
        ];
        let a = associate(&tracks, &dets, 0.3);

        let pairs: Vec<_> = a.matches.iter().map(|&(t, d, _)| (t, d)).collect();
        assert_eq!(pairs, vec![(0, 1), (1, 0)]);
        assert_eq!(a.unmatched_detections, vec![2]);
    }
}
