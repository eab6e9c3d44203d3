//! Typed resolution on top of [`Resolver::resolve_key`].
//!
//! Use these inside factory closures:
//!
//! ```rust,ignore
//! services.register_factory::<Arc<UserService>, _>(Lifetime::Scoped, |r| {
//!     let repo: Arc<dyn UserRepo> = r.resolve()?;
//!     Ok(Arc::new(UserService { repo }))
//! })?;
//! ```

use tracing::trace;

use crate::error::{Result, SanduqError};
use crate::key::DependencyKey;
use crate::registry::Resolver;
use crate::service::Service;

/// Resolves a `T` from `resolver`.
///
/// # Errors
/// - [`SanduqError::NilResolver`] if `resolver` is `None`
/// - whatever the resolver returns, unchanged
/// - [`SanduqError::TypeMismatch`] if the resolver hands back an
///   instance that is not a `T`
pub fn resolve<'a, T: Service>(resolver: impl Into<Option<&'a dyn Resolver>>) -> Result<T> {
    let resolver = resolver.into().ok_or(SanduqError::NilResolver)?;
    resolver.resolve::<T>()
}

/// Like [`resolve`], for call sites that treat a missing or mistyped
/// registration as a programming error.
///
/// # Panics
/// Panics with the resolution error's message.
#[track_caller]
pub fn must_resolve<'a, T: Service>(resolver: impl Into<Option<&'a dyn Resolver>>) -> T {
    match resolve::<T>(resolver) {
        Ok(service) => service,
        Err(err) => panic!("{err}"),
    }
}

/// Typed helpers available on every [`Resolver`], including `&dyn Resolver`.
pub trait ResolverExt: Resolver {
    /// Resolves a `T`, checking that the returned instance really is one.
    fn resolve<T: Service>(&self) -> Result<T> {
        let key = DependencyKey::of::<T>();
        trace!(key = %key, "Resolving typed");
        self.resolve_key(&key)?.downcast::<T>()
    }

    /// Resolves a `T`, panicking on failure.
    #[track_caller]
    fn must_resolve<T: Service>(&self) -> T {
        match self.resolve::<T>() {
            Ok(service) => service,
            Err(err) => panic!("{err}"),
        }
    }
}

impl<R: Resolver + ?Sized> ResolverExt for R {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TypeMismatchError;
    use crate::service::{Instance, Representation};
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;

    trait Fooer: Send + Sync {
        fn foo(&self) -> u8;
    }

    struct AssignableToFooer;

    impl Fooer for AssignableToFooer {
        fn foo(&self) -> u8 {
            1
        }
    }

    /// Hands out canned results and remembers what was asked for.
    #[derive(Default)]
    struct MockResolver {
        returns: Mutex<VecDeque<Result<Instance>>>,
        requested: Mutex<Vec<DependencyKey>>,
    }

    impl MockResolver {
        fn returning(result: Result<Instance>) -> Self {
            let mock = Self::default();
            mock.returns.lock().push_back(result);
            mock
        }
    }

    impl Resolver for MockResolver {
        fn resolve_key(&self, key: &DependencyKey) -> Result<Instance> {
            self.requested.lock().push(*key);
            self.returns
                .lock()
                .pop_front()
                .unwrap_or_else(|| panic!("no return values configured"))
        }
    }

    #[derive(Debug, thiserror::Error)]
    #[error("expected error")]
    struct ExpectedError;

    #[test]
    fn requests_the_key_of_t() {
        let fooer: Arc<dyn Fooer> = Arc::new(AssignableToFooer);
        let mock = MockResolver::returning(Ok(Instance::new(fooer)));

        let _ = resolve::<Arc<dyn Fooer>>(&mock as &dyn Resolver);
        assert_eq!(*mock.requested.lock(), vec![DependencyKey::of::<Arc<dyn Fooer>>()]);
    }

    #[test]
    fn returns_errors_from_the_resolver() {
        let mock = MockResolver::returning(Err(SanduqError::factory(ExpectedError)));

        let err = resolve::<i32>(&mock as &dyn Resolver).unwrap_err();
        assert!(err.factory_error::<ExpectedError>().is_some());
    }

    #[test]
    fn mismatched_instance_is_type_mismatch() {
        let mock = MockResolver::returning(Ok(Instance::new(0i32)));

        match resolve::<String>(&mock as &dyn Resolver).unwrap_err() {
            SanduqError::TypeMismatch(TypeMismatchError { requested, actual }) => {
                assert_eq!(requested, DependencyKey::of::<String>());
                assert_eq!(actual, DependencyKey::of::<i32>());
            }
            other => panic!("Expected TypeMismatch, got: {other:?}"),
        }
    }

    #[test]
    fn returns_resolved_value_when_assignable() {
        let expected: Arc<dyn Fooer> = Arc::new(AssignableToFooer);
        let mock = MockResolver::returning(Ok(Instance::new(Arc::clone(&expected))));

        let actual = resolve::<Arc<dyn Fooer>>(&mock as &dyn Resolver).unwrap();
        assert!(Arc::ptr_eq(&actual, &expected));
        assert_eq!(actual.foo(), 1);
    }

    #[test]
    fn missing_resolver_is_nil_resolver() {
        assert!(matches!(resolve::<u8>(None), Err(SanduqError::NilResolver)));
    }

    #[test]
    fn extension_methods_work_on_dyn_resolver() {
        let mock = MockResolver::returning(Ok(Instance::new(String::from("dsn"))));
        let resolver: &dyn Resolver = &mock;

        let value: String = resolver.resolve().unwrap();
        assert_eq!(value, "dsn");
        assert_eq!(String::REPRESENTATION, Representation::Value);
    }

    #[test]
    #[should_panic(expected = "when alloc::string::String was requested")]
    fn must_resolve_panics_on_mismatch() {
        let mock = MockResolver::returning(Ok(Instance::new(7u64)));
        let _: String = must_resolve(&mock as &dyn Resolver);
    }

    #[test]
    #[should_panic(expected = "missing resolver")]
    fn must_resolve_panics_without_resolver() {
        let _: u8 = must_resolve(None);
    }
}
