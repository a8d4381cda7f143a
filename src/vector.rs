//! Slice-level vector math shared by the distance metrics and the hash index

use crate::error::{NnsError, Result};

/// Dot product of two equal-length slices
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// L2 norm (magnitude) of a vector
pub fn norm(v: &[f32]) -> f32 {
    dot(v, v).sqrt()
}

/// Scale `v` to unit length in place.
///
/// Zero vectors are left untouched and reported as an error.
pub fn normalize(v: &mut [f32]) -> Result<()> {
    let n = norm(v);
    if n == 0.0 {
        return Err(NnsError::invalid("vector", "cannot normalize zero vector"));
    }
    for x in v.iter_mut() {
        *x /= n;
    }
    Ok(())
}

/// Parse a vector from a comma-separated string, e.g. `"1.0, 2.0, 3.0"`
pub fn parse_components(s: &str) -> Result<Vec<f32>> {
    s.split(',')
        .map(|x| {
            x.trim().parse::<f32>().map_err(|_| NnsError::Parse {
                line: 1,
                reason: format!("invalid float: {:?}", x.trim()),
            })
        })
        .collect()
}

/// Return an error unless `v` has exactly `expected` components
pub fn check_dimension(expected: usize, v: &[f32]) -> Result<()> {
    if v.len() != expected {
        return Err(NnsError::DimensionMismatch {
            expected,
            actual: v.len(),
        });
    }
    Ok(())
}
