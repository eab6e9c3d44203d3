//! Dependency graph validation.
//!
//! Validates declared dependencies at build time:
//! - Checks that every declared dependency is registered
//! - Detects circular dependencies
//! - Validates lifetime compatibility
//!
//! Only dependencies declared through `register_func_with_deps` are
//! visible here. Factories are opaque closures, so anything they resolve
//! without declaring it is checked at resolve time instead.

use std::collections::{HashMap, HashSet};

use tracing::{debug, instrument, warn};

use crate::error::{CircularDependencyError, NotRegisteredError, SanduqError, ScopeMismatchError};
use crate::key::DependencyKey;
use crate::lifetime::Lifetime;

/// Information about a registration needed for validation.
#[derive(Debug, Clone)]
pub(crate) struct DependencyInfo {
    /// What this factory produces
    pub key: DependencyKey,
    /// What this factory needs
    pub dependencies: Vec<DependencyKey>,
    pub lifetime: Lifetime,
}

/// Validates the dependency graph for correctness.
///
/// # Algorithm
/// Depth-first search over declared edges, keeping the current path
/// to report cycles.
pub(crate) struct GraphValidator {
    dependencies: HashMap<DependencyKey, DependencyInfo>,
    /// Currently being visited (for cycle detection)
    visiting: HashSet<DependencyKey>,
    validated: HashSet<DependencyKey>,
    /// Current DFS path (for error reporting)
    path: Vec<DependencyKey>,
}

impl GraphValidator {
    pub fn new(dependencies: HashMap<DependencyKey, DependencyInfo>) -> Self {
        Self {
            dependencies,
            visiting: HashSet::new(),
            validated: HashSet::new(),
            path: Vec::new(),
        }
    }

    /// Validates the entire dependency graph.
    ///
    /// # Errors
    /// - [`SanduqError::UnresolvedDependency`]: missing dependency
    /// - [`SanduqError::CircularDependency`]: cycle detected
    /// - [`SanduqError::ScopeMismatch`]: lifetime incompatibility
    #[instrument(skip(self), name = "graph_validation")]
    pub fn validate(&mut self) -> Result<(), SanduqError> {
        // Sorted so the reported error does not depend on hash order.
        let mut keys: Vec<DependencyKey> = self.dependencies.keys().copied().collect();
        keys.sort_by_key(|k| k.type_name());

        debug!(registration_count = keys.len(), "Starting dependency graph validation");

        for key in keys {
            if !self.validated.contains(&key) {
                self.validate_key(&key)?;
            }
        }

        debug!("Dependency graph validation passed");
        Ok(())
    }

    fn validate_key(&mut self, key: &DependencyKey) -> Result<(), SanduqError> {
        if self.validated.contains(key) {
            return Ok(());
        }

        if self.visiting.contains(key) {
            let cycle_start = self.path.iter().position(|k| k == key).unwrap_or(0);

            let mut chain: Vec<DependencyKey> = self.path[cycle_start..].to_vec();
            chain.push(*key);

            warn!(cycle = ?chain, "Circular dependency detected");

            return Err(SanduqError::CircularDependency(CircularDependencyError { chain }));
        }

        let info = self.dependencies.get(key).cloned().ok_or_else(|| {
            SanduqError::UnresolvedDependency(NotRegisteredError {
                requested: *key,
                required_by: self.path.last().copied(),
                suggestions: self.find_similar_keys(key),
            })
        })?;

        self.visiting.insert(*key);
        self.path.push(*key);

        for dep_key in &info.dependencies {
            // Lifetimes are compared before recursing so the consumer is
            // still on the path when the error is built.
            if let Some(dep_info) = self.dependencies.get(dep_key) {
                check_lifetime_compatibility(&info, dep_info)?;
            }

            self.validate_key(dep_key)?;
        }

        self.path.pop();
        self.visiting.remove(key);
        self.validated.insert(*key);

        Ok(())
    }

    fn find_similar_keys(&self, target: &DependencyKey) -> Vec<DependencyKey> {
        let names: Vec<&str> = self.dependencies.keys().map(DependencyKey::type_name).collect();

        sanduq_support::rendering::suggest_similar(target.type_name(), &names, 3)
            .iter()
            .filter_map(|name| {
                self.dependencies
                    .keys()
                    .find(|k| k.type_name() == name.as_str())
                    .copied()
            })
            .collect()
    }
}

/// A consumer may not capture a cached instance shorter-lived than itself:
/// - Singleton cannot depend on Scoped
/// - A Transient dependency is a fresh value, owned by whoever asked
fn check_lifetime_compatibility(consumer: &DependencyInfo, dependency: &DependencyInfo) -> Result<(), SanduqError> {
    if dependency.lifetime.is_cached() && consumer.lifetime > dependency.lifetime {
        warn!(
            consumer = %consumer.key,
            consumer_lifetime = %consumer.lifetime,
            dependency = %dependency.key,
            dependency_lifetime = %dependency.lifetime,
            "Scope mismatch detected"
        );

        return Err(SanduqError::ScopeMismatch(ScopeMismatchError {
            consumer: consumer.key,
            consumer_lifetime: consumer.lifetime,
            dependency: dependency.key,
            dependency_lifetime: dependency.lifetime,
        }));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Clock;
    struct Greeter;
    struct UnitOfWork;
    struct Handler;

    fn node<T: 'static>(lifetime: Lifetime, dependencies: &[DependencyKey]) -> DependencyInfo {
        DependencyInfo {
            key: DependencyKey::of::<T>(),
            dependencies: dependencies.to_vec(),
            lifetime,
        }
    }

    fn key<T: 'static>() -> DependencyKey {
        DependencyKey::of::<T>()
    }

    fn validate(nodes: impl IntoIterator<Item = DependencyInfo>) -> Result<(), SanduqError> {
        GraphValidator::new(nodes.into_iter().map(|n| (n.key, n)).collect()).validate()
    }

    #[test]
    fn request_graph_is_valid() {
        let result = validate([
            node::<Clock>(Lifetime::Singleton, &[]),
            node::<Greeter>(Lifetime::Singleton, &[key::<Clock>()]),
            node::<UnitOfWork>(Lifetime::Scoped, &[key::<Greeter>(), key::<Clock>()]),
            node::<Handler>(Lifetime::Transient, &[key::<UnitOfWork>()]),
        ]);

        assert!(result.is_ok());
    }

    #[test]
    fn cycle_reports_closed_chain() {
        let result = validate([
            node::<Greeter>(Lifetime::Transient, &[key::<Clock>()]),
            node::<Clock>(Lifetime::Transient, &[key::<Handler>()]),
            node::<Handler>(Lifetime::Transient, &[key::<Greeter>()]),
        ]);

        match result.unwrap_err() {
            SanduqError::CircularDependency(err) => {
                assert_eq!(err.chain.len(), 4);
                assert_eq!(err.chain.first(), err.chain.last());
            }
            other => panic!("Expected CircularDependency, got: {other:?}"),
        }
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        match validate([node::<Clock>(Lifetime::Singleton, &[key::<Clock>()])]).unwrap_err() {
            SanduqError::CircularDependency(err) => {
                assert_eq!(err.chain, vec![key::<Clock>(), key::<Clock>()]);
            }
            other => panic!("Expected CircularDependency, got: {other:?}"),
        }
    }

    #[test]
    fn missing_dependency_names_requirer_and_suggestions() {
        let result = validate([
            node::<Handler>(Lifetime::Transient, &[key::<std::sync::Arc<Clock>>()]),
            node::<Clock>(Lifetime::Singleton, &[]),
        ]);

        match result.unwrap_err() {
            SanduqError::UnresolvedDependency(err) => {
                assert_eq!(err.requested, key::<std::sync::Arc<Clock>>());
                assert_eq!(err.required_by, Some(key::<Handler>()));
                assert_eq!(err.suggestions, vec![key::<Clock>()]);
            }
            other => panic!("Expected UnresolvedDependency, got: {other:?}"),
        }
    }

    #[test]
    fn singleton_capturing_scoped_is_rejected() {
        let result = validate([
            node::<UnitOfWork>(Lifetime::Scoped, &[]),
            node::<Greeter>(Lifetime::Singleton, &[key::<UnitOfWork>()]),
        ]);

        match result.unwrap_err() {
            SanduqError::ScopeMismatch(err) => {
                assert_eq!(err.consumer, key::<Greeter>());
                assert_eq!(err.consumer_lifetime, Lifetime::Singleton);
                assert_eq!(err.dependency_lifetime, Lifetime::Scoped);
            }
            other => panic!("Expected ScopeMismatch, got: {other:?}"),
        }
    }

    #[test]
    fn transient_dependencies_are_never_captive() {
        let result = validate([
            node::<Handler>(Lifetime::Transient, &[]),
            node::<UnitOfWork>(Lifetime::Scoped, &[key::<Handler>()]),
            node::<Greeter>(Lifetime::Singleton, &[key::<Handler>()]),
        ]);

        assert!(result.is_ok());
    }

    #[test]
    fn shared_dependency_is_visited_once() {
        // Handler -> {Greeter, UnitOfWork} -> Clock
        let result = validate([
            node::<Clock>(Lifetime::Singleton, &[]),
            node::<Greeter>(Lifetime::Singleton, &[key::<Clock>()]),
            node::<UnitOfWork>(Lifetime::Singleton, &[key::<Clock>()]),
            node::<Handler>(Lifetime::Singleton, &[key::<Greeter>(), key::<UnitOfWork>()]),
        ]);

        assert!(result.is_ok());
    }

    #[test]
    fn first_error_follows_type_name_order() {
        struct Alpha;
        struct Beta;

        for _ in 0..8 {
            let result = validate([
                node::<Beta>(Lifetime::Transient, &[key::<Greeter>()]),
                node::<Alpha>(Lifetime::Transient, &[key::<Clock>()]),
            ]);

            match result.unwrap_err() {
                SanduqError::UnresolvedDependency(err) => assert_eq!(err.required_by, Some(key::<Alpha>())),
                other => panic!("Expected UnresolvedDependency, got: {other:?}"),
            }
        }
    }
}
