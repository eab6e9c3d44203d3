//! Service registry: the registration records behind a collection.
//!
//! The registry maps [`DependencyKey`] to factory functions that know
//! how to create instances. A provider holds an immutable snapshot of it.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::{AlreadyRegisteredError, SanduqError};
use crate::key::DependencyKey;
use crate::lifetime::Lifetime;
use crate::service::Instance;

/// Type alias for erased factory functions.
///
/// A factory takes the [`Resolver`] (to resolve sub-dependencies) and
/// returns an [`Instance`] holding the capability, or an error.
///
/// `Arc` rather than `Box`: snapshots share factories across threads.
pub type FactoryFn = Arc<dyn Fn(&dyn Resolver) -> Result<Instance, SanduqError> + Send + Sync>;

/// Resolves capability keys to instances.
///
/// This is the only thing a factory gets from the container, so factories
/// can be exercised against a mock resolver in tests. Implementations
/// MUST return instances whose type matches the requested key.
pub trait Resolver: Send + Sync {
    fn resolve_key(&self, key: &DependencyKey) -> Result<Instance, SanduqError>;
}

/// Registration entry for a single capability.
#[derive(Clone)]
pub(crate) struct Registration {
    pub key: DependencyKey,
    /// Concrete type the factory produces before coercion.
    pub implementation: DependencyKey,
    pub lifetime: Lifetime,
    pub factory: FactoryFn,
    /// Capabilities the factory is declared to resolve.
    pub dependencies: Vec<DependencyKey>,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("key", &self.key)
            .field("implementation", &self.implementation)
            .field("lifetime", &self.lifetime)
            .field("dependencies", &self.dependencies)
            .finish()
    }
}

/// Stores all registrations, one per capability.
#[derive(Debug, Clone, Default)]
pub(crate) struct Registry {
    registrations: HashMap<DependencyKey, Registration>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a registration for its key.
    ///
    /// # Errors
    /// Returns [`SanduqError::AlreadyRegistered`] if the key is already
    /// registered and `allow_override` is false.
    pub fn register(&mut self, registration: Registration, allow_override: bool) -> Result<(), SanduqError> {
        let key = registration.key;

        if self.registrations.contains_key(&key) {
            if !allow_override {
                return Err(SanduqError::AlreadyRegistered(AlreadyRegisteredError { key }));
            }
            debug!(key = %key, "Replacing existing registration");
        }

        debug!(
            key = %key,
            implementation = %registration.implementation,
            lifetime = %registration.lifetime,
            "Registered service"
        );
        self.registrations.insert(key, registration);
        Ok(())
    }

    pub fn get(&self, key: &DependencyKey) -> Option<&Registration> {
        self.registrations.get(key)
    }

    pub fn contains(&self, key: &DependencyKey) -> bool {
        self.registrations.contains_key(key)
    }

    /// Returns all registrations (for validation).
    pub fn all_registrations(&self) -> &HashMap<DependencyKey, Registration> {
        &self.registrations
    }

    /// Returns the number of registered capabilities.
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Registered type names closest to `key`, for "did you mean?" hints.
    pub fn suggestions_for(&self, key: &DependencyKey) -> Vec<DependencyKey> {
        let names: Vec<&str> = self.registrations.keys().map(DependencyKey::type_name).collect();
        let similar = sanduq_support::rendering::suggest_similar(key.type_name(), &names, 3);

        similar
            .iter()
            .filter_map(|name| {
                self.registrations
                    .keys()
                    .find(|k| k.type_name() == name.as_str())
                    .copied()
            })
            .collect()
    }
}
