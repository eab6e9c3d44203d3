//! # The Service Provider
//!
//! The runtime half of the container: resolves capability keys against
//! an immutable snapshot of registrations while honoring lifetimes.
//!
//! # Architecture
//! ```text
//! ServiceCollection ──build()──> ServiceProvider (root)
//!                                    │
//!                               new_scope()
//!                                    │
//!                       ┌────────────┴────────────┐
//!                       ▼                         ▼
//!               ServiceProvider           ServiceProvider
//!          (own Scoped cache, shared Singleton cache and registrations)
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, trace, warn};

use crate::cache::{SharedCache, WaitGraph};
use crate::error::{CircularDependencyError, NotRegisteredError, Result, SanduqError};
use crate::key::DependencyKey;
use crate::lifetime::Lifetime;
use crate::registry::{Registry, Resolver};
use crate::service::{Instance, Service};
use crate::settings::ContainerSettings;

static NEXT_SCOPE_ID: AtomicU64 = AtomicU64::new(1);

/// State shared by a root provider and every scope derived from it.
struct ProviderShared {
    registry: Registry,
    singletons: SharedCache,
    waits: WaitGraph,
    settings: ContainerSettings,
}

/// Resolves services registered in a
/// [`ServiceCollection`](crate::collection::ServiceCollection).
///
/// Cloning a provider yields another handle to the same scope. Use
/// [`new_scope`](ServiceProvider::new_scope) for an independent scope.
#[derive(Clone)]
pub struct ServiceProvider {
    shared: Arc<ProviderShared>,
    scoped: Arc<SharedCache>,
    scope_id: u64,
    parent_scope_id: Option<u64>,
}

impl ServiceProvider {
    pub(crate) fn from_snapshot(registry: Registry, settings: ContainerSettings) -> Self {
        Self {
            shared: Arc::new(ProviderShared {
                registry,
                singletons: SharedCache::new(),
                waits: WaitGraph::new(),
                settings,
            }),
            scoped: Arc::new(SharedCache::new()),
            scope_id: NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed),
            parent_scope_id: None,
        }
    }

    /// Resolves a service by type.
    ///
    /// ```rust,ignore
    /// let greeter: Arc<dyn Greeter> = provider.resolve()?;
    /// ```
    pub fn resolve<T: Service>(&self) -> Result<T> {
        crate::resolve::resolve::<T>(self as &dyn Resolver)
    }

    /// Resolves a service by type, panicking if it cannot be resolved.
    #[track_caller]
    pub fn must_resolve<T: Service>(&self) -> T {
        crate::resolve::must_resolve::<T>(self as &dyn Resolver)
    }

    /// Creates a child scope.
    ///
    /// The child shares this provider's registrations and Singleton cache
    /// but starts with an empty Scoped cache, so Scoped services are
    /// constructed again inside it.
    pub fn new_scope(&self) -> ServiceProvider {
        let scope_id = NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed);
        debug!(scope_id, parent_scope_id = self.scope_id, "Creating new scope");

        ServiceProvider {
            shared: Arc::clone(&self.shared),
            scoped: Arc::new(SharedCache::new()),
            scope_id,
            parent_scope_id: Some(self.scope_id),
        }
    }

    /// Process-unique identifier of this scope.
    #[inline]
    pub fn scope_id(&self) -> u64 {
        self.scope_id
    }

    #[inline]
    pub fn parent_scope_id(&self) -> Option<u64> {
        self.parent_scope_id
    }

    /// Returns `true` for a provider returned by `build()`.
    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent_scope_id.is_none()
    }

    /// Returns `true` if `T` has a registration.
    pub fn contains<T: Service>(&self) -> bool {
        self.shared.registry.contains(&DependencyKey::of::<T>())
    }

    /// Number of registered capabilities.
    pub fn len(&self) -> usize {
        self.shared.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.registry.is_empty()
    }

    /// Resolves `key` as a dependency of the keys in `chain`.
    fn resolve_in_chain(&self, key: &DependencyKey, chain: &[DependencyKey]) -> Result<Instance> {
        // Re-entering a key under construction would block on its own slot.
        if let Some(start) = chain.iter().position(|k| k == key) {
            let mut cycle = chain[start..].to_vec();
            cycle.push(*key);
            warn!(cycle = ?cycle, "Circular dependency detected during resolve");
            return Err(SanduqError::CircularDependency(CircularDependencyError { chain: cycle }));
        }

        let max_depth = self.shared.settings.max_depth;
        if chain.len() > max_depth {
            warn!(key = %key, max_depth, "Resolution depth exceeded");
            return Err(SanduqError::DepthExceeded { key: *key, max_depth });
        }

        let registration = self.shared.registry.get(key).ok_or_else(|| {
            SanduqError::NotRegistered(NotRegisteredError {
                requested: *key,
                required_by: chain.last().copied(),
                suggestions: self.shared.registry.suggestions_for(key),
            })
        })?;

        trace!(key = %key, lifetime = %registration.lifetime, depth = chain.len(), "Resolving");

        let mut path = Vec::with_capacity(chain.len() + 1);
        path.extend_from_slice(chain);
        path.push(*key);
        let context = ResolutionContext { provider: self, chain: path };
        let construct = || (registration.factory)(&context);
        // Another thread builds a key we depend on while waiting on `held`.
        let cycle = |held: DependencyKey| {
            let start = chain.iter().position(|k| *k == held).unwrap_or(0);
            let mut closed = chain[start..].to_vec();
            closed.push(*key);
            if held != *key {
                closed.push(held);
            }
            warn!(cycle = ?closed, "Circular dependency across threads detected during resolve");
            SanduqError::CircularDependency(CircularDependencyError { chain: closed })
        };

        let waits = &self.shared.waits;
        match registration.lifetime {
            Lifetime::Transient => construct(),
            Lifetime::Scoped => self.scoped.get_or_construct(key, waits, construct, cycle),
            Lifetime::Singleton => self.shared.singletons.get_or_construct(key, waits, construct, cycle),
        }
    }
}

impl Resolver for ServiceProvider {
    fn resolve_key(&self, key: &DependencyKey) -> Result<Instance> {
        self.resolve_in_chain(key, &[])
    }
}

impl fmt::Debug for ServiceProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceProvider")
            .field("registered", &self.shared.registry.len())
            .field("scope_id", &self.scope_id)
            .field("parent_scope_id", &self.parent_scope_id)
            .field("scoped", &self.scoped)
            .field("singletons", &self.shared.singletons)
            .finish()
    }
}

// ═══════════════════════════════════════════
// ResolutionContext (the resolver factories see)
// ═══════════════════════════════════════════

/// Resolver handed to factories; remembers which keys are being built.
struct ResolutionContext<'a> {
    provider: &'a ServiceProvider,
    chain: Vec<DependencyKey>,
}

impl Resolver for ResolutionContext<'_> {
    fn resolve_key(&self, key: &DependencyKey) -> Result<Instance> {
        self.provider.resolve_in_chain(key, &self.chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::ServiceCollection;
    use crate::resolve::ResolverExt;
    use std::sync::atomic::AtomicU32;

    #[derive(Default)]
    struct Counter {
        hits: AtomicU32,
    }

    fn counting<T: 'static>(
        calls: &Arc<AtomicU32>,
        make: fn() -> T,
    ) -> impl Fn(&dyn Resolver) -> Result<T> + Send + Sync + 'static {
        let calls = Arc::clone(calls);
        move |_: &dyn Resolver| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(make())
        }
    }

    #[test]
    fn transient_instances_are_distinct() {
        let mut services = ServiceCollection::new();
        services.register_type::<Arc<Counter>>(Lifetime::Transient).unwrap();
        let provider = services.build().unwrap();

        let a: Arc<Counter> = provider.resolve().unwrap();
        let b: Arc<Counter> = provider.resolve().unwrap();
        assert!(!Arc::ptr_eq(&a, &b));

        a.hits.fetch_add(1, Ordering::SeqCst);
        assert_eq!(b.hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn scoped_is_shared_within_scope_only() {
        let mut services = ServiceCollection::new();
        services.register_type::<Arc<Counter>>(Lifetime::Scoped).unwrap();
        let root = services.build().unwrap();

        let a: Arc<Counter> = root.resolve().unwrap();
        let b: Arc<Counter> = root.resolve().unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        let scope = root.new_scope();
        let c: Arc<Counter> = scope.resolve().unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
        assert!(!scope.is_root());
        assert_eq!(scope.parent_scope_id(), Some(root.scope_id()));
    }

    #[test]
    fn singleton_is_shared_across_tree() {
        let calls = Arc::new(AtomicU32::new(0));
        let mut services = ServiceCollection::new();
        services
            .register_factory::<Arc<Counter>, _>(Lifetime::Singleton, counting(&calls, || Arc::new(Counter::default())))
            .unwrap();
        let root = services.build().unwrap();

        let from_child: Arc<Counter> = root.new_scope().new_scope().resolve().unwrap();
        let from_root: Arc<Counter> = root.resolve().unwrap();
        let from_sibling: Arc<Counter> = root.new_scope().resolve().unwrap();

        assert!(Arc::ptr_eq(&from_child, &from_root));
        assert!(Arc::ptr_eq(&from_root, &from_sibling));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cloned_provider_is_same_scope() {
        let mut services = ServiceCollection::new();
        services.register_type::<Arc<Counter>>(Lifetime::Scoped).unwrap();
        let provider = services.build().unwrap();
        let handle = provider.clone();

        let a: Arc<Counter> = provider.resolve().unwrap();
        let b: Arc<Counter> = handle.resolve().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(provider.scope_id(), handle.scope_id());
    }

    #[test]
    fn unregistered_reports_requirer() {
        #[derive(Clone, Debug)]
        struct Repo;
        impl Service for Repo {
            const REPRESENTATION: crate::service::Representation = crate::service::Representation::Value;
        }

        let mut services = ServiceCollection::new();
        services
            .register_factory::<Repo, _>(Lifetime::Transient, |r| {
                let _url: String = r.resolve()?;
                Ok(Repo)
            })
            .unwrap();
        let provider = services.build().unwrap();

        match provider.resolve::<Repo>().unwrap_err() {
            SanduqError::NotRegistered(err) => {
                assert_eq!(err.requested, DependencyKey::of::<String>());
                assert_eq!(err.required_by, Some(DependencyKey::of::<Repo>()));
            }
            other => panic!("Expected NotRegistered, got: {other:?}"),
        }
    }

    #[test]
    fn runtime_cycle_is_detected_without_deadlock() {
        #[derive(Debug)]
        struct Left;
        struct Right;

        let mut services = ServiceCollection::new();
        services
            .register_factory::<Arc<Left>, _>(Lifetime::Singleton, |r| {
                let _right: Arc<Right> = r.resolve()?;
                Ok(Arc::new(Left))
            })
            .unwrap()
            .register_factory::<Arc<Right>, _>(Lifetime::Scoped, |r| {
                let _left: Arc<Left> = r.resolve()?;
                Ok(Arc::new(Right))
            })
            .unwrap();
        let provider = services.build().unwrap();

        match provider.resolve::<Arc<Left>>().unwrap_err() {
            SanduqError::CircularDependency(err) => {
                assert_eq!(
                    err.chain,
                    vec![
                        DependencyKey::of::<Arc<Left>>(),
                        DependencyKey::of::<Arc<Right>>(),
                        DependencyKey::of::<Arc<Left>>(),
                    ]
                );
            }
            other => panic!("Expected CircularDependency, got: {other:?}"),
        }
    }

    #[test]
    fn depth_limit_stops_runaway_chains() {
        #[derive(Clone, Default)]
        struct Level<const N: usize>;
        impl<const N: usize> Service for Level<N> {
            const REPRESENTATION: crate::service::Representation = crate::service::Representation::Value;
        }

        let settings = ContainerSettings::default().max_depth(1);
        let mut services = ServiceCollection::with_settings(settings);
        services
            .register_factory::<Level<0>, _>(Lifetime::Transient, |r| r.resolve::<Level<1>>().map(|_| Level))
            .unwrap()
            .register_factory::<Level<1>, _>(Lifetime::Transient, |r| r.resolve::<Level<2>>().map(|_| Level))
            .unwrap()
            .register_type::<Level<2>>(Lifetime::Transient)
            .unwrap();
        let provider = services.build().unwrap();

        assert!(provider.resolve::<Level<1>>().is_ok());
        assert!(matches!(
            provider.resolve::<Level<0>>(),
            Err(SanduqError::DepthExceeded { max_depth: 1, .. })
        ));
    }

    #[test]
    fn zero_depth_still_resolves_leaf_services() {
        #[derive(Clone, Debug)]
        struct Leaf;
        impl Service for Leaf {
            const REPRESENTATION: crate::service::Representation = crate::service::Representation::Value;
        }

        let mut services = ServiceCollection::with_settings(ContainerSettings::default().max_depth(0));
        services
            .register_factory::<Leaf, _>(Lifetime::Transient, |_| Ok(Leaf))
            .unwrap()
            .register_factory::<String, _>(Lifetime::Transient, |r| r.resolve::<Leaf>().map(|_| "leaf".to_string()))
            .unwrap();
        let provider = services.build().unwrap();

        assert!(provider.resolve::<Leaf>().is_ok());
        match provider.resolve::<String>().unwrap_err() {
            SanduqError::DepthExceeded { key, max_depth } => {
                assert_eq!(key, DependencyKey::of::<Leaf>());
                assert_eq!(max_depth, 0);
            }
            other => panic!("Expected DepthExceeded, got: {other:?}"),
        }
    }

    #[test]
    fn debug_display() {
        let mut services = ServiceCollection::new();
        services.register_type::<u32>(Lifetime::Transient).unwrap();
        let provider = services.build().unwrap();

        let debug = format!("{provider:?}");
        assert!(debug.contains("ServiceProvider"));
        assert!(debug.contains("registered: 1"));
    }
}
