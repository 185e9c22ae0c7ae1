//! # Strata Test Utilities
//!
//! Shared testing utilities for all crates:
//! - A grid battlefield and recording media sink
//! - Content fixtures (units, missile types, module folders)
//! - Determinism test harness
//! - Property-based testing strategies

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod arena;
pub mod determinism;
pub mod fixtures;

/// Re-export proptest for convenience.
pub use proptest;
