//! # The Service Collection
//!
//! Registration-time half of the container. Register services, then call
//! [`build()`](ServiceCollection::build) to get a [`ServiceProvider`].
//!
//! # Examples
//! ```rust
//! use sanduq_container::prelude::*;
//! use std::sync::Arc;
//!
//! trait Greeter: Send + Sync {
//!     fn greet(&self) -> String;
//! }
//!
//! struct English;
//! impl Greeter for English {
//!     fn greet(&self) -> String { "hello".into() }
//! }
//!
//! let mut services = ServiceCollection::new();
//! services
//!     .register_coercion::<Arc<dyn Greeter>, Arc<English>>(|g| g as Arc<dyn Greeter>)
//!     .register_func::<Arc<dyn Greeter>, Arc<English>, _>(Lifetime::Singleton, |_| {
//!         Ok(Arc::new(English))
//!     })
//!     .expect("registration failed");
//!
//! let provider = services.build().expect("build failed");
//! let greeter: Arc<dyn Greeter> = provider.resolve().expect("resolve failed");
//! assert_eq!(greeter.greet(), "hello");
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::coercion::Coercions;
use crate::error::{
    InvalidImplementationError, NonTransientValueTypeError, Result, SanduqError, TypeMismatchError,
};
use crate::graph::{DependencyInfo, GraphValidator};
use crate::key::DependencyKey;
use crate::lifetime::Lifetime;
use crate::module::ServiceModule;
use crate::provider::ServiceProvider;
use crate::registry::{FactoryFn, Registration, Registry, Resolver};
use crate::service::{Instance, Representation, Service};
use crate::settings::ContainerSettings;

/// Mutable set of registrations.
///
/// Registration methods return `Result<&mut Self>` so calls chain with
/// `?` or `.unwrap()` between them.
pub struct ServiceCollection {
    registry: Registry,
    coercions: Coercions,
    settings: ContainerSettings,
}

impl ServiceCollection {
    pub fn new() -> Self {
        Self::with_settings(ContainerSettings::default())
    }

    pub fn with_settings(settings: ContainerSettings) -> Self {
        Self {
            registry: Registry::new(),
            coercions: Coercions::new(),
            settings,
        }
    }

    pub fn settings(&self) -> &ContainerSettings {
        &self.settings
    }

    // ── Registration ──

    /// Registers `T`, built with `T::default()`.
    ///
    /// # Errors
    /// [`SanduqError::NonTransientValueType`] if `T` is value-like and
    /// `lifetime` is not Transient.
    pub fn register_type<T: Service + Default>(&mut self, lifetime: Lifetime) -> Result<&mut Self> {
        self.register_func::<T, T, _>(lifetime, default_factory::<T>)
    }

    /// Registers `factory` as the provider of capability `C`.
    ///
    /// The factory produces an `I`, which must be `C` itself or have a
    /// coercion declared with [`register_coercion`](Self::register_coercion).
    ///
    /// # Errors
    /// - [`SanduqError::InvalidImplementation`] if `I` is not assignable to `C`
    /// - [`SanduqError::NonTransientValueType`] if `I` is value-like and
    ///   `lifetime` is not Transient
    /// - [`SanduqError::AlreadyRegistered`] if `C` is registered and
    ///   overriding is disabled
    pub fn register_func<C, I, F>(&mut self, lifetime: Lifetime, factory: F) -> Result<&mut Self>
    where
        C: Service,
        I: Service,
        F: Fn(&dyn Resolver) -> Result<I> + Send + Sync + 'static,
    {
        self.register_func_with_deps::<C, I, F>(lifetime, Vec::new(), factory)
    }

    /// Like [`register_func`](Self::register_func), also declaring the
    /// capabilities `factory` resolves so `build()` can validate them.
    pub fn register_func_with_deps<C, I, F>(
        &mut self,
        lifetime: Lifetime,
        dependencies: Vec<DependencyKey>,
        factory: F,
    ) -> Result<&mut Self>
    where
        C: Service,
        I: Service,
        F: Fn(&dyn Resolver) -> Result<I> + Send + Sync + 'static,
    {
        let key = DependencyKey::of::<C>();
        let implementation = DependencyKey::of::<I>();

        let assign = self.coercions.assign_fn::<C, I>().ok_or_else(|| {
            warn!(capability = %key, implementation = %implementation, "Implementation is not assignable");
            SanduqError::InvalidImplementation(InvalidImplementationError {
                capability: key,
                implementation,
            })
        })?;

        check_representation::<I>(key, lifetime)?;

        let factory: FactoryFn = Arc::new(move |resolver: &dyn Resolver| -> Result<Instance> {
            let value = factory(resolver)?;
            let capability = assign(value).ok_or_else(|| {
                SanduqError::TypeMismatch(TypeMismatchError {
                    requested: key,
                    actual: implementation,
                })
            })?;
            Ok(Instance::new(capability))
        });

        self.registry.register(
            Registration {
                key,
                implementation,
                lifetime,
                factory,
                dependencies,
            },
            self.settings.allow_override,
        )?;
        Ok(self)
    }

    /// Registers a factory that produces `C` directly.
    pub fn register_factory<C, F>(&mut self, lifetime: Lifetime, factory: F) -> Result<&mut Self>
    where
        C: Service,
        F: Fn(&dyn Resolver) -> Result<C> + Send + Sync + 'static,
    {
        self.register_func::<C, C, F>(lifetime, factory)
    }

    /// Declares `I` assignable to `C` through `coerce`.
    ///
    /// ```rust,ignore
    /// services.register_coercion::<Arc<dyn Greeter>, Arc<English>>(|g| g as Arc<dyn Greeter>);
    /// ```
    pub fn register_coercion<C: Service, I: Service>(
        &mut self,
        coerce: impl Fn(I) -> C + Send + Sync + 'static,
    ) -> &mut Self {
        self.coercions.insert::<C, I>(coerce);
        self
    }

    /// Lets `module` register its services into this collection.
    pub fn add_module(&mut self, module: &dyn ServiceModule) -> Result<&mut Self> {
        info!(module = module.name(), "Registering module");
        module.register(self)?;
        Ok(self)
    }

    // ── Queries ──

    /// Returns `true` if `T` has a registration.
    pub fn contains<T: Service>(&self) -> bool {
        self.registry.contains(&DependencyKey::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    // ── Build ──

    /// Builds a root provider from a snapshot of the current registrations.
    ///
    /// Later changes to this collection do not reach the provider.
    ///
    /// # Errors
    /// With `validate_on_build` set:
    /// - [`SanduqError::UnresolvedDependency`] for a declared dependency
    ///   that is not registered
    /// - [`SanduqError::CircularDependency`] for a declared cycle
    /// - [`SanduqError::ScopeMismatch`] for a Singleton that declares a
    ///   Scoped dependency
    #[instrument(skip(self), name = "collection_build")]
    pub fn build(&self) -> Result<ServiceProvider> {
        info!(registered = self.registry.len(), "Building service provider");

        if self.settings.validate_on_build {
            let dep_infos: HashMap<DependencyKey, DependencyInfo> = self
                .registry
                .all_registrations()
                .iter()
                .map(|(key, reg)| {
                    (
                        *key,
                        DependencyInfo {
                            key: *key,
                            dependencies: reg.dependencies.clone(),
                            lifetime: reg.lifetime,
                        },
                    )
                })
                .collect();

            GraphValidator::new(dep_infos).validate()?;
        }

        let provider = ServiceProvider::from_snapshot(self.registry.clone(), self.settings.clone());
        info!(scope_id = provider.scope_id(), "Service provider built");
        Ok(provider)
    }
}

impl Default for ServiceCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ServiceCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceCollection")
            .field("registered", &self.registry.len())
            .field("coercions", &self.coercions)
            .field("settings", &self.settings)
            .finish()
    }
}

fn default_factory<T: Default>(_: &dyn Resolver) -> Result<T> {
    Ok(T::default())
}

/// Caching lifetimes require a reference-like implementation.
fn check_representation<I: Service>(key: DependencyKey, lifetime: Lifetime) -> Result<()> {
    if !lifetime.is_cached() || I::REPRESENTATION == Representation::Reference {
        return Ok(());
    }

    let implementation = DependencyKey::of::<I>();
    warn!(key = %key, implementation = %implementation, lifetime = %lifetime, "Value-like type with caching lifetime");
    Err(SanduqError::NonTransientValueType(NonTransientValueTypeError {
        key,
        implementation,
        lifetime,
    }))
}
