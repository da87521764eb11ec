use visage_core::EncodingVector;

/// Euclidean (L2) distance between two vectors.
///
/// Returns `None` when the dimensions differ.
#[must_use]
pub fn euclidean_distance(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.len() != b.len() {
        return None;
    }
    let sum_sq: f64 = a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum();
    Some(sum_sq.sqrt())
}

/// Distance from `probe` to each vector in `known`, in order.
#[must_use]
pub fn face_distances(known: &[EncodingVector], probe: &EncodingVector) -> Vec<Option<f64>> {
    known
        .iter()
        .map(|v| euclidean_distance(v.as_slice(), probe.as_slice()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical() {
        assert_eq!(euclidean_distance(&[0.3, -0.1], &[0.3, -0.1]), Some(0.0));
    }

    #[test]
    fn test_three_four_five() {
        let d = euclidean_distance(&[0.0, 0.0], &[3.0, 4.0]).unwrap();
        assert!((d - 5.0).abs() < 1e-12, "got {d}");
    }

    #[test]
    fn test_symmetric() {
        let a = [0.1, 0.7, -0.2];
        let b = [0.4, -0.3, 0.9];
        assert_eq!(euclidean_distance(&a, &b), euclidean_distance(&b, &a));
    }

    #[test]
    fn test_dimension_mismatch() {
        assert_eq!(euclidean_distance(&[1.0, 0.0], &[1.0, 0.0, 0.0]), None);
    }

    #[test]
    fn test_face_distances_preserves_order() {
        let known = vec![
            EncodingVector::validate(vec![1.0, 0.0]).unwrap(),
            EncodingVector::validate(vec![0.0, 2.0]).unwrap(),
        ];
        let probe = EncodingVector::validate(vec![0.0, 0.0]).unwrap();
        assert_eq!(face_distances(&known, &probe), vec![Some(1.0), Some(2.0)]);
    }
}
