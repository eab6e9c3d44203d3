//! Error types for Sanduq container operations.
//!
//! Every failure is classified. Payload structs carry the keys involved
//! and render a hint on how to fix the registration.

use std::fmt;

use sanduq_support::rendering::render_chain;

use crate::key::DependencyKey;
use crate::lifetime::Lifetime;

/// Boxed error produced by user factories.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for all Sanduq operations.
#[derive(Debug, thiserror::Error)]
pub enum SanduqError {
    /// A value-like type was registered with a caching lifetime.
    #[error("{}", .0)]
    NonTransientValueType(NonTransientValueTypeError),

    /// The implementation type cannot be assigned to the capability.
    #[error("{}", .0)]
    InvalidImplementation(InvalidImplementationError),

    /// A capability was resolved that has no registration.
    #[error("{}", .0)]
    NotRegistered(NotRegisteredError),

    /// A declared dependency has no registration (found at build time).
    #[error("{}", .0)]
    UnresolvedDependency(NotRegisteredError),

    /// A registration depends on itself, directly or transitively.
    #[error("{}", .0)]
    CircularDependency(CircularDependencyError),

    /// A Singleton registration depends on a Scoped one.
    #[error("{}", .0)]
    ScopeMismatch(ScopeMismatchError),

    /// A resolver returned an instance of the wrong type.
    #[error("{}", .0)]
    TypeMismatch(TypeMismatchError),

    /// A typed resolve was attempted without a resolver.
    #[error("Cannot resolve instances from a missing resolver")]
    NilResolver,

    /// The capability was already registered and overriding is disabled.
    #[error("{}", .0)]
    AlreadyRegistered(AlreadyRegisteredError),

    /// Nested resolution went deeper than the configured limit.
    #[error("Resolution of {key} exceeded the maximum depth of {max_depth}")]
    DepthExceeded { key: DependencyKey, max_depth: usize },

    /// A factory failed; the original error is kept as-is.
    #[error(transparent)]
    Factory(BoxError),
}

impl SanduqError {
    /// Wraps an error raised inside a factory.
    ///
    /// `Display` and `source()` forward to `err`, and the original can be
    /// recovered with [`SanduqError::factory_error`].
    pub fn factory<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        SanduqError::Factory(err.into())
    }

    /// Returns the factory error if this is a [`SanduqError::Factory`]
    /// holding an `E`.
    pub fn factory_error<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            SanduqError::Factory(err) => err.downcast_ref::<E>(),
            _ => None,
        }
    }
}

/// A value-like type registered as Scoped or Singleton.
#[derive(Debug)]
pub struct NonTransientValueTypeError {
    /// The capability being registered
    pub key: DependencyKey,
    /// The value-like type produced for it
    pub implementation: DependencyKey,
    pub lifetime: Lifetime,
}

impl fmt::Display for NonTransientValueTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Value-like types may only be registered as Transient: {} was registered as {}",
            self.implementation, self.lifetime,
        )?;
        if self.implementation != self.key {
            write!(f, " (for {})", self.key)?;
        }
        write!(
            f,
            "\n  Hint: Register Arc<{}> to share one instance",
            self.implementation.short_name(),
        )
    }
}

/// An implementation registered for a capability it cannot be assigned to.
#[derive(Debug)]
pub struct InvalidImplementationError {
    pub capability: DependencyKey,
    pub implementation: DependencyKey,
}

impl fmt::Display for InvalidImplementationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Implementation type {} is not assignable to {}",
            self.implementation, self.capability,
        )?;
        write!(
            f,
            "\n  Hint: Call .register_coercion::<{}, {}>(..) first",
            self.capability.short_name(),
            self.implementation.short_name(),
        )
    }
}

/// Error when a capability was not registered.
#[derive(Debug)]
pub struct NotRegisteredError {
    /// The capability that was requested
    pub requested: DependencyKey,
    /// What required it, if known
    pub required_by: Option<DependencyKey>,
    /// Similar capabilities that ARE registered
    pub suggestions: Vec<DependencyKey>,
}

impl fmt::Display for NotRegisteredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "No implementation registered for {}", self.requested)?;

        if let Some(ref parent) = self.required_by {
            write!(f, "\n  Required by: {parent}")?;
        }

        if !self.suggestions.is_empty() {
            write!(f, "\n  Did you mean one of:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n    - {suggestion}")?;
            }
        }

        write!(
            f,
            "\n  Hint: Did you forget to register {}?",
            self.requested.short_name()
        )
    }
}

/// Error when a dependency cycle is detected.
#[derive(Debug)]
pub struct CircularDependencyError {
    /// The keys forming the cycle; the first key is repeated at the end.
    pub chain: Vec<DependencyKey>,
}

impl fmt::Display for CircularDependencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.chain.iter().map(DependencyKey::short_name).collect();
        write!(f, "Circular dependency detected:\n  {}", render_chain(&names))?;
        write!(
            f,
            "\n  Hint: Break the cycle by resolving one side lazily or restructuring the services"
        )
    }
}

/// Error when a long-lived registration captures a short-lived one.
#[derive(Debug)]
pub struct ScopeMismatchError {
    /// The dependency being injected
    pub dependency: DependencyKey,
    pub dependency_lifetime: Lifetime,
    /// Where it's being injected
    pub consumer: DependencyKey,
    pub consumer_lifetime: Lifetime,
}

impl fmt::Display for ScopeMismatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Scope mismatch: cannot inject {} ({}) into {} ({})",
            self.dependency, self.dependency_lifetime, self.consumer, self.consumer_lifetime,
        )?;
        write!(
            f,
            "\n  A {} service cannot depend on a {} service",
            self.consumer_lifetime, self.dependency_lifetime,
        )?;
        write!(
            f,
            "\n  Hint: Change {} to {} or longer",
            self.dependency.short_name(),
            self.consumer_lifetime,
        )
    }
}

/// A resolver returned something other than what was requested.
#[derive(Debug)]
pub struct TypeMismatchError {
    pub requested: DependencyKey,
    pub actual: DependencyKey,
}

impl fmt::Display for TypeMismatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Resolver returned {} when {} was requested",
            self.actual, self.requested,
        )
    }
}

/// Error when registering a capability that already exists.
#[derive(Debug)]
pub struct AlreadyRegisteredError {
    pub key: DependencyKey,
}

impl fmt::Display for AlreadyRegisteredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Service already registered: {}", self.key)?;
        write!(f, "\n  Hint: Enable allow_override in ContainerSettings to replace it")
    }
}

/// Convenient Result type for Sanduq operations.
pub type Result<T> = std::result::Result<T, SanduqError>;
