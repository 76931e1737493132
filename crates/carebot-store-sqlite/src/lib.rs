//! SQLite backend for the carebot record store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Embeddings are stored as packed
//! little-endian `f32` blobs; similarity is computed in SQL by a scalar
//! function registered on the connection.

mod encode;
mod schema;
mod store;
mod vector_fn;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
