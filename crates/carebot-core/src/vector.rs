//! Embedding vector utilities.
//!
//! Vectors travel between the application and the store as JSON arrays of
//! floats and are stored natively as packed little-endian `f32` blobs.

use crate::{Error, Result};

/// Tolerance used when checking that a vector is unit length.
pub const NORM_TOLERANCE: f64 = 1e-6;

/// Dot product of two equal-length vectors.
///
/// For unit vectors this equals cosine similarity. Returns `0.0` when the
/// lengths differ or the vectors are empty.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
  if a.len() != b.len() || a.is_empty() {
    return 0.0;
  }
  a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Euclidean length of `v`, accumulated in `f64`.
pub fn l2_norm(v: &[f32]) -> f64 {
  v.iter().map(|&x| f64::from(x) * f64::from(x)).sum::<f64>().sqrt()
}

/// Scale `v` in place to unit length. Zero vectors are left untouched and
/// reported with `false`.
pub fn normalize(v: &mut [f32]) -> bool {
  let norm = l2_norm(v);
  if norm < f64::from(f32::EPSILON) {
    return false;
  }
  for x in v.iter_mut() {
    *x = (f64::from(*x) / norm) as f32;
  }
  true
}

pub fn is_unit(v: &[f32]) -> bool { (l2_norm(v) - 1.0).abs() <= NORM_TOLERANCE }

// ─── Transport form ──────────────────────────────────────────────────────────

/// Parse a JSON array literal, e.g. `[0.6,0.8]`.
pub fn from_json(s: &str) -> Result<Vec<f32>> {
  serde_json::from_str(s)
    .map_err(|e| Error::Validation(format!("invalid vector literal: {e}")))
}

// ─── Storage form ────────────────────────────────────────────────────────────

/// Encode a vector as little-endian `f32` bytes (`4 × len`).
pub fn to_blob(v: &[f32]) -> Vec<u8> {
  let mut bytes = Vec::with_capacity(v.len() * 4);
  for &x in v {
    bytes.extend_from_slice(&x.to_le_bytes());
  }
  bytes
}

/// Decode bytes written by [`to_blob`]. Trailing partial chunks are ignored.
pub fn from_blob(blob: &[u8]) -> Vec<f32> {
  blob
    .chunks_exact(4)
    .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn dot_of_unit_vectors() {
    assert!((dot(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
    assert!(dot(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
    assert!((dot(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
  }

  #[test]
  fn dot_of_mismatched_lengths_is_zero() {
    assert_eq!(dot(&[1.0, 2.0], &[1.0]), 0.0);
    assert_eq!(dot(&[], &[]), 0.0);
  }

  #[test]
  fn normalize_produces_unit_vector() {
    let mut v = vec![3.0, 4.0];
    assert!(normalize(&mut v));
    assert!((v[0] - 0.6).abs() < 1e-6);
    assert!((v[1] - 0.8).abs() < 1e-6);
    assert!(is_unit(&v));
  }

  #[test]
  fn unit_check_is_tight() {
    let mut v: Vec<f32> = (1..=1536).map(|i| (i % 17) as f32 - 8.0).collect();
    assert!(normalize(&mut v));
    assert!(is_unit(&v));

    let stretched: Vec<f32> = v.iter().map(|x| x * 1.00001).collect();
    assert!(!is_unit(&stretched));
  }

  #[test]
  fn normalize_leaves_zero_vector_alone() {
    let mut v = vec![0.0; 4];
    assert!(!normalize(&mut v));
    assert_eq!(v, vec![0.0; 4]);
  }

  #[test]
  fn json_literal_parses_back() {
    let v = vec![0.25f32, -0.5, 1.0];
    assert_eq!(from_json("[0.25,-0.5,1.0]").unwrap(), v);
    assert!(from_json("not a vector").is_err());
  }

  #[test]
  fn blob_is_four_bytes_per_component() {
    let v = vec![1.0f32, -2.5, 3.125];
    let blob = to_blob(&v);
    assert_eq!(blob.len(), 12);
    assert_eq!(from_blob(&blob), v);
  }
}
