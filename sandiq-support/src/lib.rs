//! # Sandiq Support
//!
//! Shared utilities for the Sandiq container crates.
//!
//! This crate provides:
//! - Text rendering for diagnostics (resolution chains, type names)

pub mod rendering;
