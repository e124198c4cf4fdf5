//! Null-safe conversion of numeric payloads.
//!
//! JSON has no representation for NaN or infinities, so every numeric array
//! handed to a boundary consumer goes through [`sanitize`] first.

/// Map NaN and ±infinity to `None`, pass finite values through.
pub fn sanitize<T>(values: &[T]) -> Vec<Option<f64>>
where
    T: Copy + Into<f64>,
{
    values
        .iter()
        .map(|&v| {
            let v: f64 = v.into();
            v.is_finite().then_some(v)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_finite_become_null() {
        let out = sanitize(&[f64::NAN, 1.0, f64::INFINITY, f64::NEG_INFINITY, 2.5]);
        assert_eq!(out, vec![None, Some(1.0), None, None, Some(2.5)]);
    }

    #[test]
    fn test_f32_input() {
        let out = sanitize(&[f32::NAN, -9999.0_f32]);
        assert_eq!(out, vec![None, Some(-9999.0)]);
    }

    #[test]
    fn test_serializes_as_null() {
        let json = serde_json::to_string(&sanitize(&[f64::NAN, 0.5])).unwrap();
        assert_eq!(json, "[null,0.5]");
    }
}
