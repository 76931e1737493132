//! Offline feature-hashing embedder.
//!
//! Each lowercase alphanumeric token is hashed with 64-bit FNV-1a into one of
//! `dims` buckets, adding ±1 depending on the top hash bit. The result is
//! L2-normalised. Texts that share words score higher; nothing more is
//! promised. Useful for tests, demos and air-gapped runs.

use carebot_core::{
  provider::{Embedder, ProviderError},
  vector,
};

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv1a(bytes: &[u8]) -> u64 {
  bytes.iter().fold(FNV_OFFSET, |h, &b| (h ^ u64::from(b)).wrapping_mul(FNV_PRIME))
}

#[derive(Debug, Clone)]
pub struct HashEmbedder {
  dims: usize,
}

impl HashEmbedder {
  pub fn new(dims: usize) -> Self { Self { dims: dims.max(1) } }

  /// The embedding of `text`, computed synchronously.
  pub fn vector(&self, text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; self.dims];
    for token in text
      .split(|c: char| !c.is_alphanumeric())
      .filter(|t| !t.is_empty())
    {
      let h = fnv1a(token.to_lowercase().as_bytes());
      let bucket = (h % self.dims as u64) as usize;
      v[bucket] += if h >> 63 == 0 { 1.0 } else { -1.0 };
    }
    if !vector::normalize(&mut v) {
      // No tokens, or every token cancelled out.
      v[0] = 1.0;
    }
    v
  }
}

impl Embedder for HashEmbedder {
  fn model_name(&self) -> &str { "hash" }

  fn dims(&self) -> usize { self.dims }

  async fn embed<'a>(&'a self, text: &'a str) -> Result<Vec<f32>, ProviderError> {
    Ok(self.vector(text))
  }
}
