//! Core types and trait definitions for the carebot patient assistant.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! storage backend (`carebot-store-sqlite`), the model providers
//! (`carebot-providers`) and the HTTP layer (`carebot-api`) all depend on it.

pub mod conversation;
pub mod error;
pub mod keeper;
pub mod provider;
pub mod record;
pub mod retry;
pub mod store;
pub mod topic;
pub mod vector;

pub use error::{Error, Result};
