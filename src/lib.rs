#![deny(missing_docs)]

//! Tender ingestion and hybrid matching for public-procurement notices.
//!
//! Uploaded eForms notices and scanned PDFs become canonical [`domain::Tender`] records with a
//! requirement embedding; company profiles are ranked against open tenders by embedding
//! similarity, category overlap and distance.

/// HTTP routing and REST handlers.
pub mod api;
/// Caller-facing operations and production wiring.
pub mod app;
/// Company profile maintenance.
pub mod company;
/// Bid feasibility checks.
pub mod compliance;
/// Environment-driven configuration management.
pub mod config;
/// Canonical records.
pub mod domain;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Address geocoding.
pub mod geocoding;
/// Upload routing and ingestion services.
pub mod ingestion;
/// Structured logging and tracing setup.
pub mod logging;
/// Hybrid matching engine.
pub mod matching;
/// Ingestion and matching counters.
pub mod metrics;
/// Structured eForms notice parsing.
pub mod notice;
/// Scanned-document transcription.
pub mod ocr;
/// Shared HTTP client construction for OpenAI-compatible gateways.
pub mod openrouter;
/// Qdrant-backed persistence.
pub mod qdrant;
/// Persistent store abstraction.
pub mod store;

#[cfg(test)]
mod test_support;
