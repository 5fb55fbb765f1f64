//! SIMD cosine similarity
//!
//! Feature vectors are narrowed to `f32` and handed to `trueno`, which picks
//! the widest SIMD backend available at runtime.

use crate::{Error, Result};
use trueno::Vector;

/// Cosine similarity of `a` and `b`
///
/// Zero vectors have similarity 0 with everything.
///
/// # Errors
/// Returns error if the vectors differ in length or the SIMD kernel fails
#[allow(clippy::cast_possible_truncation)]
pub fn cosine(a: &[f64], b: &[f64]) -> Result<f64> {
    if a.len() != b.len() {
        return Err(Error::Evaluation(format!(
            "Cannot compare vectors of length {} and {}",
            a.len(),
            b.len()
        )));
    }
    if a.is_empty() {
        return Ok(0.0);
    }

    let a: Vec<f32> = a.iter().map(|&v| v as f32).collect();
    let b: Vec<f32> = b.iter().map(|&v| v as f32).collect();
    let va = Vector::from_slice(&a);
    let vb = Vector::from_slice(&b);

    let ab = va.dot(&vb).map_err(simd_error)?;
    let aa = va.dot(&va).map_err(simd_error)?;
    let bb = vb.dot(&vb).map_err(simd_error)?;

    let norm = f64::from(aa).sqrt() * f64::from(bb).sqrt();
    if norm == 0.0 {
        return Ok(0.0);
    }
    Ok((f64::from(ab) / norm).clamp(-1.0, 1.0))
}

fn simd_error<E: std::fmt::Debug>(e: E) -> Error {
    Error::Evaluation(format!("SIMD dot product failed: {e:?}"))
}
