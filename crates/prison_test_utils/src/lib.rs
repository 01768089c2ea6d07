//! # Prison Test Utilities
//!
//! Shared testing utilities for all crates:
//! - Fixtures for settings, filters and participants
//! - Engine harness with a manual clock and a scripted server
//! - Property-based testing strategies
//! - In-memory transport for driving the worker without a network

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod harness;
pub mod memory;
pub mod strategies;

/// Re-export proptest for convenience.
pub use proptest;
