//! Meter Info Lookup Library
//!
//! Looks up a utility customer's billing record (prepaid or postpaid) by
//! meter or consumer number. Up to three upstream sources are queried and
//! their partially-overlapping responses reconciled into one normalized
//! customer record.
//!
//! # Modules
//!
//! - `api`: API definitions.
//! - `core`: Core business logic.
//! - `integrations`: External service integrations.
//! - `balance`: Amount-owed resolution.
//! - `circuit_breaker`: Circuit breaker for upstream calls.
//! - `config`: Configuration management.
//! - `errors`: Error handling types.
//! - `field_extractor`: Field access over semi-structured payloads.
//! - `handlers`: HTTP request handlers.
//! - `lookup`: Lookup orchestration and the data source trait.
//! - `models`: Core data models.
//! - `normalizer`: Identity field merging per account type.
//! - `recharge`: Recent recharge history extraction.
//! - `services`: HTTP data source for the upstream services.

pub mod api;
pub mod core;
pub mod integrations;

pub mod balance;
pub mod circuit_breaker;
pub mod config;
pub mod errors;
pub mod field_extractor;
pub mod handlers;
pub mod lookup;
pub mod models;
pub mod normalizer;
pub mod recharge;
pub mod services;
