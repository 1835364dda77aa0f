//! Qdrant implementation of the tender store.

pub mod client;
pub mod filters;
/// Streaming helpers for Qdrant scroll pagination.
pub mod scroller;
mod store;
pub mod types;

pub use client::QdrantClient;
pub use store::{Collections, QdrantStore};
pub use types::{CONTENT_VECTOR, PROFILE_VECTOR, QdrantError, REQUIREMENT_VECTOR, StoredPoint};
