//! Checked numeric conversions between model, image and pixel coordinate types

use crate::{Error, Result};

/// Convert a buffer index or dimension to an `OpenCV` `i32`
///
/// # Errors
///
/// Returns an error if the value exceeds `i32::MAX`
pub fn usize_to_i32(value: usize) -> Result<i32> {
    value
        .try_into()
        .map_err(|_| Error::InvalidInput(format!("Value {value} too large to fit in i32")))
}

/// Convert an `OpenCV` dimension to a buffer length
///
/// # Errors
///
/// Returns an error if the value is negative
pub fn i32_to_usize(value: i32) -> Result<usize> {
    value
        .try_into()
        .map_err(|_| Error::InvalidInput(format!("Negative dimension {value}")))
}

/// Clamp and convert a model coordinate to an `i32` pixel coordinate.
/// Non-finite values map to `min`.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn f32_to_i32_clamp(value: f32, min: i32, max: i32) -> i32 {
    let (min, max) = if min <= max { (min, max) } else { (max, min) };
    if !value.is_finite() {
        return min;
    }
    (value.clamp(min as f32, max as f32) as i32).clamp(min, max)
}

/// Clamp and convert a landmark coordinate to an `i32` pixel coordinate.
/// Non-finite values map to `min`.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn f64_to_i32_clamp(value: f64, min: i32, max: i32) -> i32 {
    let (min, max) = if min <= max { (min, max) } else { (max, min) };
    if !value.is_finite() {
        return min;
    }
    (value.clamp(f64::from(min), f64::from(max)) as i32).clamp(min, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_usize_to_i32() {
        assert_eq!(usize_to_i32(128).unwrap(), 128);
        assert_eq!(usize_to_i32(i32::MAX as usize).unwrap(), i32::MAX);
        if std::mem::size_of::<usize>() > 4 {
            assert!(usize_to_i32(i32::MAX as usize + 1).is_err());
        }
    }

    #[test]
    fn test_i32_to_usize() {
        assert_eq!(i32_to_usize(640).unwrap(), 640);
        assert!(i32_to_usize(-1).is_err());
    }

    #[test]
    fn test_clamped_conversions() {
        assert_eq!(f32_to_i32_clamp(50.7, 0, 100), 50);
        assert_eq!(f32_to_i32_clamp(-10.0, 0, 100), 0);
        assert_eq!(f32_to_i32_clamp(f32::NAN, 0, 100), 0);
        assert_eq!(f64_to_i32_clamp(639.9, 0, 639), 639);
        assert_eq!(f64_to_i32_clamp(1e12, 0, 479), 479);
        assert_eq!(f64_to_i32_clamp(f64::INFINITY, 0, 479), 0);
        assert_eq!(f64_to_i32_clamp(5.0, 10, 0), 5);
    }

    proptest! {
        #[test]
        fn prop_f64_clamp_within_bounds(value in any::<f64>(), a in any::<i32>(), b in any::<i32>()) {
            let (min, max) = if a <= b { (a, b) } else { (b, a) };
            let result = f64_to_i32_clamp(value, min, max);
            prop_assert!(result >= min && result <= max);
        }

        #[test]
        fn prop_f32_clamp_within_bounds(value in any::<f32>(), a in any::<i32>(), b in any::<i32>()) {
            let (min, max) = if a <= b { (a, b) } else { (b, a) };
            let result = f32_to_i32_clamp(value, min, max);
            prop_assert!(result >= min && result <= max);
        }
    }
}
