//! viva-core — Session state machine, countdown clock, and scoring.
//!
//! This crate defines the data model, traits, and session orchestration
//! that the entire viva system builds on.

pub mod clock;
pub mod deck;
pub mod error;
pub mod model;
pub mod report;
pub mod session;
pub mod summary;
pub mod traits;
