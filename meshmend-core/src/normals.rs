/// Normal validation and per-vertex normal recomputation
use std::fmt;

use log::{debug, info};
use nalgebra::Vector3;

use crate::index::IndexBuffer;

/// Smallest acceptable mean normal length.
pub const MIN_MEAN_LENGTH: f32 = 0.2;
/// Largest acceptable mean normal length.
pub const MAX_MEAN_LENGTH: f32 = 3.0;

/// Why supplied normals were thrown away.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RejectReason {
    Missing,
    CountMismatch { expected: usize, actual: usize },
    MeanLength(f32),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::Missing => write!(f, "normals missing"),
            RejectReason::CountMismatch { expected, actual } => {
                write!(f, "normals have {actual} values, expected {expected}")
            }
            RejectReason::MeanLength(mean) => {
                write!(f, "normals look suspicious (avg length {mean})")
            }
        }
    }
}

/// Outcome of normal validation.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalDecision {
    Accepted(Vec<f32>),
    NeedsRecompute(RejectReason),
}

impl NormalDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, NormalDecision::Accepted(_))
    }
}

/// Accept supplied normals only when they line up with the vertices and look
/// roughly unit length on average.
pub fn validate(raw: Option<Vec<f32>>, vertex_count: usize) -> NormalDecision {
    let normals = match raw {
        Some(normals) => normals,
        None => return NormalDecision::NeedsRecompute(RejectReason::Missing),
    };

    let expected = vertex_count * 3;
    if normals.len() != expected {
        return NormalDecision::NeedsRecompute(RejectReason::CountMismatch {
            expected,
            actual: normals.len(),
        });
    }

    let mean = mean_length(&normals);
    debug!("avg normal length {mean}");
    if !mean.is_finite() || !(MIN_MEAN_LENGTH..=MAX_MEAN_LENGTH).contains(&mean) {
        info!("normals look suspicious (avg length {mean}), recomputing");
        return NormalDecision::NeedsRecompute(RejectReason::MeanLength(mean));
    }

    NormalDecision::Accepted(normals)
}

/// Mean Euclidean length of the normal triples; NaN when there are none.
pub fn mean_length(normals: &[f32]) -> f32 {
    let count = normals.len() / 3;
    let sum: f64 = normals
        .chunks_exact(3)
        .map(|n| f64::from(Vector3::new(n[0], n[1], n[2]).norm()))
        .sum();
    (sum / count as f64) as f32
}

/// Derive smooth per-vertex normals from triangle faces.
///
/// Face normals are area weighted (unnormalized cross products) and summed
/// into each corner. Triangles referencing a vertex past the end of
/// `positions` are skipped; untouched vertices keep a zero normal.
pub fn compute_vertex_normals(positions: &[f32], indices: &IndexBuffer) -> Vec<f32> {
    let vertex_count = positions.len() / 3;
    let mut accum = vec![Vector3::<f32>::zeros(); vertex_count];

    let point = |i: usize| Vector3::new(positions[i * 3], positions[i * 3 + 1], positions[i * 3 + 2]);

    for [a, b, c] in indices.triangles() {
        let (a, b, c) = (a as usize, b as usize, c as usize);
        if a >= vertex_count || b >= vertex_count || c >= vertex_count {
            continue;
        }
        let (pa, pb, pc) = (point(a), point(b), point(c));
        let face = (pb - pa).cross(&(pc - pa));
        accum[a] += face;
        accum[b] += face;
        accum[c] += face;
    }

    accum
        .into_iter()
        .flat_map(|n| {
            let n = n.try_normalize(f32::EPSILON).unwrap_or_else(Vector3::zeros);
            [n.x, n.y, n.z]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_and_mismatched() {
        assert_eq!(
            validate(None, 3),
            NormalDecision::NeedsRecompute(RejectReason::Missing)
        );
        assert_eq!(
            validate(Some(vec![0.0, 0.0, 1.0]), 2),
            NormalDecision::NeedsRecompute(RejectReason::CountMismatch {
                expected: 6,
                actual: 3
            })
        );
    }

    #[test]
    fn test_band() {
        let unit = vec![0.0, 0.0, 1.0, 0.0, 1.0, 0.0];
        assert_eq!(validate(Some(unit.clone()), 2), NormalDecision::Accepted(unit));

        let zeros = vec![0.0; 6];
        assert!(matches!(
            validate(Some(zeros), 2),
            NormalDecision::NeedsRecompute(RejectReason::MeanLength(m)) if m == 0.0
        ));

        let huge = vec![0.0, 0.0, 10.0, 0.0, 10.0, 0.0];
        assert!(!validate(Some(huge), 2).is_accepted());

        let nan = vec![f32::NAN, 0.0, 1.0, 0.0, 1.0, 0.0];
        assert!(!validate(Some(nan), 2).is_accepted());
    }

    #[test]
    fn test_recompute_single_triangle() {
        let positions = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let indices = IndexBuffer::from_values(vec![0, 1, 2]);
        let normals = compute_vertex_normals(&positions, &indices);
        assert_eq!(normals.len(), 9);
        for n in normals.chunks_exact(3) {
            assert!((n[2] - 1.0).abs() < 1e-6);
            assert!(n[0].abs() < 1e-6 && n[1].abs() < 1e-6);
        }
    }

    #[test]
    fn test_recompute_skips_out_of_range() {
        let positions = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let indices = IndexBuffer::from_values(vec![1, 2, 3]);
        let normals = compute_vertex_normals(&positions, &indices);
        assert!(normals.iter().all(|&v| v == 0.0));
    }
}
