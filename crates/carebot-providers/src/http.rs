//! Shared request plumbing for the HTTP providers.

use std::time::Duration;

use carebot_core::{provider::ProviderError, vector};

pub(crate) fn client(timeout: Duration) -> Result<reqwest::Client, ProviderError> {
  reqwest::Client::builder()
    .timeout(timeout)
    .build()
    .map_err(|e| ProviderError::Config(e.to_string()))
}

fn transport(e: reqwest::Error, timeout: Duration) -> ProviderError {
  if e.is_timeout() {
    ProviderError::Timeout(timeout)
  } else {
    ProviderError::Transport(e.to_string())
  }
}

/// Send `req` and decode a JSON body. Non-2xx statuses become
/// [`ProviderError::Http`] carrying the response text.
pub(crate) async fn send_json(
  req: reqwest::RequestBuilder,
  timeout: Duration,
) -> Result<serde_json::Value, ProviderError> {
  let resp = req.send().await.map_err(|e| transport(e, timeout))?;
  let status = resp.status();
  if !status.is_success() {
    let body = resp.text().await.unwrap_or_default();
    return Err(ProviderError::Http { status: status.as_u16(), body });
  }
  resp.json().await.map_err(|e| {
    if e.is_timeout() {
      ProviderError::Timeout(timeout)
    } else {
      ProviderError::Malformed(e.to_string())
    }
  })
}

/// Read a JSON array of numbers as `f32`s.
pub(crate) fn floats(value: &serde_json::Value, what: &str) -> Result<Vec<f32>, ProviderError> {
  value
    .as_array()
    .ok_or_else(|| ProviderError::Malformed(format!("{what} is not an array")))?
    .iter()
    .map(|v| {
      v.as_f64()
        .map(|x| x as f32)
        .ok_or_else(|| ProviderError::Malformed(format!("{what} holds a non-number")))
    })
    .collect()
}

/// Check the length of a provider vector and scale it to unit length.
pub(crate) fn finish(mut v: Vec<f32>, dims: usize) -> Result<Vec<f32>, ProviderError> {
  if v.len() != dims {
    return Err(ProviderError::Dimension { expected: dims, actual: v.len() });
  }
  if !vector::normalize(&mut v) {
    return Err(ProviderError::Malformed("zero embedding vector".into()));
  }
  Ok(v)
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
  format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn finish_normalises() {
    let v = finish(vec![3.0, 4.0], 2).unwrap();
    assert!((v[0] - 0.6).abs() < 1e-6 && (v[1] - 0.8).abs() < 1e-6);
  }

  #[test]
  fn finish_rejects_wrong_length_and_zero() {
    assert!(matches!(
      finish(vec![1.0], 2),
      Err(ProviderError::Dimension { expected: 2, actual: 1 })
    ));
    assert!(matches!(finish(vec![0.0, 0.0], 2), Err(ProviderError::Malformed(_))));
  }

  #[test]
  fn join_url_handles_slashes() {
    assert_eq!(join_url("http://h:1/", "/api/embed"), "http://h:1/api/embed");
    assert_eq!(join_url("http://h:1", "v1/embeddings"), "http://h:1/v1/embeddings");
  }

  #[test]
  fn floats_rejects_non_numbers() {
    let v = serde_json::json!([0.5, "x"]);
    assert!(floats(&v, "embedding").is_err());
    assert_eq!(floats(&serde_json::json!([0.5, 1]), "e").unwrap(), [0.5, 1.0]);
  }
}
