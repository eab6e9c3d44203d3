//! # Sanduq Support
//!
//! Shared utilities for the Sanduq DI crates.
//!
//! This crate provides:
//! - Text rendering for error messages

pub mod rendering;
