//! Integration tests module
//!
//! End-to-end tests for the sourcesift pipeline, including:
//! - Load → classify → probe → dedupe → save over real directories
//! - Probing against mock servers
//! - Stage failures aborting a run

pub mod error_scenarios;
pub mod fixtures;
pub mod pipeline_test;
