//! Service modules: groups of related registrations.
//!
//! # Examples
//! ```rust,ignore
//! struct DatabaseModule;
//!
//! impl ServiceModule for DatabaseModule {
//!     fn register(&self, services: &mut ServiceCollection) -> Result<()> {
//!         services
//!             .register_factory::<Arc<Database>, _>(Lifetime::Singleton, |_| {
//!                 Database::connect("postgres://localhost").map(Arc::new).map_err(SanduqError::factory)
//!             })?
//!             .register_type::<Arc<UnitOfWork>>(Lifetime::Scoped)?;
//!         Ok(())
//!     }
//! }
//!
//! services.add_module(&DatabaseModule)?;
//! ```

use crate::collection::ServiceCollection;
use crate::error::Result;

/// A set of registrations added to a collection in one call.
///
/// Split registrations by concern and add each module with
/// [`ServiceCollection::add_module`].
pub trait ServiceModule: Send + Sync {
    /// Registers this module's services into `services`.
    ///
    /// Errors propagate out of `add_module` unchanged.
    fn register(&self, services: &mut ServiceCollection) -> Result<()>;

    /// Human-readable name for logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}
