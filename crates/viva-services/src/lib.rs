//! viva-services — external-collaborator adapters.
//!
//! Implements the `QuestionSource`, `Evaluator`, `RewardLedger`, and
//! `NarratorSink` traits from `viva-core`: an HTTP-backed interview service,
//! a local deck source with a key-point heuristic evaluator, an in-memory
//! reward ledger, and mocks for testing.

pub mod config;
pub mod error;
pub mod http;
pub mod ledger;
pub mod local;
pub mod mock;

pub use config::{load_config, load_config_from, ServiceConfig, VivaConfig};
pub use error::ServiceError;
