//! Derive macros for Sanduq DI.

pub use sanduq_macros::Service;
