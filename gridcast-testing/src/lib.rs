//! Float assertions shared by the unit tests of the workspace members.

use assert_float_eq::*;

/// Asserts element-wise absolute equality, naming the first offending index.
pub fn assert_slice_f64_absolute(expected: &[f64], actual: &[f64], epsilon: f64) {
    assert_eq!(
        expected.len(),
        actual.len(),
        "lengths do not match: {} ≠ {}",
        expected.len(),
        actual.len()
    );
    for (index, (&expected, &actual)) in expected.iter().zip(actual).enumerate() {
        if let Err(err) = expect_float_absolute_eq!(expected, actual, epsilon) {
            panic!("mismatch at index {index}: {err}");
        }
    }
}

/// Asserts that `actual` lies in the closed interval `[min, max]`.
pub fn assert_within(min: f64, max: f64, actual: f64) {
    assert!(
        (min..=max).contains(&actual),
        "{actual} is outside of [{min}, {max}]"
    );
}

/// Asserts that the sequence never decreases.
pub fn assert_monotonic_non_decreasing(values: &[f64]) {
    for (index, pair) in values.windows(2).enumerate() {
        assert!(
            pair[1] >= pair[0],
            "sequence decreases at index {}: {} > {}",
            index + 1,
            pair[0],
            pair[1]
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_within_epsilon() {
        assert_slice_f64_absolute(&[0.1, 0.2], &[0.1, 0.2 + 1e-9], 1e-6);
    }

    #[test]
    #[should_panic(expected = "mismatch at index 1")]
    fn slice_names_offending_index() {
        assert_slice_f64_absolute(&[0.1, 0.2], &[0.1, 0.3], 0.01);
    }

    #[test]
    #[should_panic(expected = "lengths do not match: 1 ≠ 2")]
    fn slice_length_mismatch() {
        assert_slice_f64_absolute(&[0.1], &[0.1, 0.2], 0.01);
    }

    #[test]
    fn within_bounds() {
        assert_within(0.05, 0.95, 0.95);
    }

    #[test]
    #[should_panic(expected = "sequence decreases at index 2")]
    fn monotonic_violation() {
        assert_monotonic_non_decreasing(&[1.0, 2.0, 1.5]);
    }
}
