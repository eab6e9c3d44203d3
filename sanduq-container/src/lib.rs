//! Core container implementation for Sanduq DI.

mod cache;
mod coercion;
pub mod collection;
pub mod error;
mod graph;
pub mod key;
pub mod lifetime;
pub mod module;
pub mod provider;
pub mod registry;
pub mod resolve;
pub mod service;
pub mod settings;

pub use collection::ServiceCollection;
pub use error::{Result, SanduqError};
pub use key::DependencyKey;
pub use lifetime::Lifetime;
pub use module::ServiceModule;
pub use provider::ServiceProvider;
pub use registry::{FactoryFn, Resolver};
pub use resolve::{ResolverExt, must_resolve, resolve};
pub use service::{Instance, Representation, Service};
pub use settings::ContainerSettings;

pub mod prelude {
    pub use crate::collection::ServiceCollection;
    pub use crate::error::{Result, SanduqError};
    pub use crate::key::DependencyKey;
    pub use crate::lifetime::Lifetime;
    pub use crate::module::ServiceModule;
    pub use crate::provider::ServiceProvider;
    pub use crate::registry::Resolver;
    pub use crate::resolve::{ResolverExt, must_resolve, resolve};
    pub use crate::service::{Instance, Representation, Service};
    pub use crate::settings::ContainerSettings;
}
