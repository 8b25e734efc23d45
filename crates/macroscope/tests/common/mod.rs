//! Shared utilities for macroscope integration tests.
//!
//! - `TestHarness` for isolated runs with `input/` and `output/` directories
//! - fixture builders that synthesize real containers in memory

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::TestHarness;
