//! SQL scalar functions for embedding vectors.
//!
//! - `to_vector(json_text)` casts the JSON array transport form to the
//!   packed blob stored in `medical_records.embedding`.
//! - `vector_dot_product(a, b)` scores two blobs of equal length.

use carebot_core::vector;
use rusqlite::{
  Connection,
  functions::{Context, FunctionFlags},
};

fn flags() -> FunctionFlags {
  FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC
}

fn to_vector(ctx: &Context<'_>) -> rusqlite::Result<Vec<u8>> {
  let text: String = ctx.get(0)?;
  let v = vector::from_json(&text)
    .map_err(|e| rusqlite::Error::UserFunctionError(Box::new(e)))?;
  Ok(vector::to_blob(&v))
}

fn vector_dot_product(ctx: &Context<'_>) -> rusqlite::Result<f64> {
  let a: Vec<u8> = ctx.get(0)?;
  let b: Vec<u8> = ctx.get(1)?;
  if a.len() != b.len() {
    return Err(rusqlite::Error::UserFunctionError(
      format!("vector_dot_product: {} bytes vs {} bytes", a.len(), b.len()).into(),
    ));
  }
  Ok(f64::from(vector::dot(&vector::from_blob(&a), &vector::from_blob(&b))))
}

/// Register both functions on `conn`.
pub fn register(conn: &Connection) -> rusqlite::Result<()> {
  conn.create_scalar_function("to_vector", 1, flags(), to_vector)?;
  conn.create_scalar_function("vector_dot_product", 2, flags(), vector_dot_product)?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn conn() -> Connection {
    let c = Connection::open_in_memory().unwrap();
    register(&c).unwrap();
    c
  }

  #[test]
  fn to_vector_packs_little_endian_floats() {
    let blob: Vec<u8> = conn()
      .query_row("SELECT to_vector('[1.0, 0.5]')", [], |r| r.get(0))
      .unwrap();
    assert_eq!(blob, vector::to_blob(&[1.0, 0.5]));
  }

  #[test]
  fn dot_product_of_cast_vectors() {
    let score: f64 = conn()
      .query_row(
        "SELECT vector_dot_product(to_vector('[0.6, 0.8]'), to_vector('[0.6, 0.8]'))",
        [],
        |r| r.get(0),
      )
      .unwrap();
    assert!((score - 1.0).abs() < 1e-6);
  }

  #[test]
  fn mismatched_lengths_are_an_error() {
    let result: rusqlite::Result<f64> = conn().query_row(
      "SELECT vector_dot_product(to_vector('[1.0]'), to_vector('[1.0, 0.0]'))",
      [],
      |r| r.get(0),
    );
    assert!(result.is_err());
  }

  #[test]
  fn malformed_json_is_an_error() {
    let result: rusqlite::Result<Vec<u8>> =
      conn().query_row("SELECT to_vector('not a vector')", [], |r| r.get(0));
    assert!(result.is_err());
  }
}
