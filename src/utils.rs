use std::collections::HashMap;

use crate::population::Association;

/// Indices where neither `x` nor `y` is missing
pub fn paired_valid_indices(x: &[f64], y: &[f64]) -> Vec<usize> {
    x.iter()
        .zip(y.iter())
        .enumerate()
        .filter(|(_, (a, b))| !a.is_nan() && !b.is_nan())
        .map(|(i, _)| i)
        .collect()
}

pub fn select_indices<T: Copy>(indices: &[usize], data: &[T]) -> Vec<T> {
    indices.iter().map(|i| data[*i]).collect()
}

/// Replaces the values at `indices` with NaN
pub fn mask_indices(indices: &[usize], data: &mut [f64]) {
    for i in indices {
        data[*i] = f64::NAN;
    }
}

/// Groups the markers of each covariate, keeping covariates in the order they were first seen
pub fn group_by_covariate(associations: &[Association]) -> Vec<(&str, Vec<&str>)> {
    let mut positions = HashMap::new();
    let mut groups: Vec<(&str, Vec<&str>)> = Vec::new();
    for assoc in associations {
        let idx = *positions
            .entry(assoc.covariate.as_str())
            .or_insert_with(|| {
                groups.push((assoc.covariate.as_str(), Vec::new()));
                groups.len() - 1
            });
        groups[idx].1.push(assoc.marker.as_str());
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paired_valid_indices() {
        let x = [1.0, f64::NAN, 3.0, 4.0];
        let y = [1.0, 2.0, f64::NAN, 4.0];
        assert_eq!(paired_valid_indices(&x, &y), vec![0, 3]);
    }

    #[test]
    fn test_mask_indices() {
        let mut data = vec![1.0, 2.0, 3.0];
        mask_indices(&[1], &mut data);
        assert_eq!(data[0], 1.0);
        assert!(data[1].is_nan());
        assert_eq!(data[2], 3.0);
    }

    #[test]
    fn test_group_by_covariate_keeps_first_seen_order() {
        let associations = vec![
            Association::new("m1".into(), "4".into()),
            Association::new("m2".into(), "7".into()),
            Association::new("m3".into(), "4".into()),
        ];
        let groups = group_by_covariate(&associations);
        assert_eq!(groups, vec![("4", vec!["m1", "m3"]), ("7", vec!["m2"])]);
    }
}
