use crate::errors::LogitTreeError;

/// Validate that a count parameter is at least one.
pub fn validate_positive_count(value: usize, parameter: &str) -> Result<(), LogitTreeError> {
    if value == 0 {
        Err(LogitTreeError::InvalidParameter(
            parameter.to_string(),
            "integer value of at least 1".to_string(),
            value.to_string(),
        ))
    } else {
        Ok(())
    }
}

/// Check that a flat weight vector lines up with the
/// aspatial then spatial feature catalogue.
pub fn validate_weight_alignment(expected: usize, found: usize) -> Result<(), LogitTreeError> {
    if expected != found {
        Err(LogitTreeError::MisalignedWeights { expected, found })
    } else {
        Ok(())
    }
}

const LANES: usize = 16;

/// Sum of absolute values, accumulated as f64 across
/// `LANES` partial sums, returned as f32.
#[inline]
pub fn fast_f64_abs_sum<I: IntoIterator<Item = f32>>(values: I) -> f32 {
    let mut acc = [0.0_f64; LANES];
    for (i, v) in values.into_iter().enumerate() {
        acc[i % LANES] += f64::from(v.abs());
    }
    acc.iter().sum::<f64>() as f32
}

/// Mean of the values, 0 for an empty slice.
pub fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let total: f64 = values.iter().map(|v| f64::from(*v)).sum();
    (total / values.len() as f64) as f32
}
