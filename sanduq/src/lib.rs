//! # Sanduq: Dependency Injection Container for Rust
//!
//! Register capabilities in a [`ServiceCollection`], build a
//! [`ServiceProvider`], and resolve them by type. Each capability is
//! Transient, Scoped or Singleton.
//!
//! ```rust
//! use sanduq::prelude::*;
//! use std::sync::Arc;
//!
//! #[derive(Default)]
//! struct RequestLog {
//!     lines: std::sync::Mutex<Vec<String>>,
//! }
//!
//! let mut services = ServiceCollection::new();
//! services.register_type::<Arc<RequestLog>>(Lifetime::Scoped)?;
//! let root = services.build()?;
//!
//! let request = root.new_scope();
//! let log: Arc<RequestLog> = request.resolve()?;
//! log.lines.lock().unwrap().push("GET /".into());
//!
//! let same: Arc<RequestLog> = request.resolve()?;
//! assert!(Arc::ptr_eq(&log, &same));
//! # Ok::<(), SanduqError>(())
//! ```

pub use sanduq_container::*;
pub use sanduq_derive::*;
pub use sanduq_support;

pub mod prelude {
    pub use sanduq_container::prelude::*;
    pub use sanduq_derive::Service;
}
