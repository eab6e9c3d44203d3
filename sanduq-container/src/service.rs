//! Service representations and the type-erased [`Instance`] box.
//!
//! Every type stored in or handed out by the container implements
//! [`Service`]. Its [`Representation`] states whether a clone of the value
//! aliases the same underlying state, which decides whether the type may
//! be registered with a caching lifetime.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::{SanduqError, TypeMismatchError};
use crate::key::DependencyKey;

/// How copies of a value relate to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Representation {
    /// Clones alias the same state: `Arc<T>`, `&'static T`, handle types.
    Reference,
    /// Clones are independent copies.
    Value,
}

impl fmt::Display for Representation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Representation::Reference => write!(f, "reference-like"),
            Representation::Value => write!(f, "value-like"),
        }
    }
}

/// A type the container can register and resolve.
///
/// Cached lifetimes hand out clones of the stored instance, so only
/// [`Representation::Reference`] types can honor "same instance" for
/// `Scoped` and `Singleton` registrations.
///
/// Implement it by hand or with `#[derive(Service)]`:
///
/// ```
/// use sanduq_container::service::{Representation, Service};
///
/// #[derive(Clone, Default)]
/// struct RequestModel {
///     id: u32,
/// }
///
/// impl Service for RequestModel {
///     const REPRESENTATION: Representation = Representation::Value;
/// }
/// ```
pub trait Service: Clone + Send + Sync + 'static {
    const REPRESENTATION: Representation;
}

impl<T: ?Sized + Send + Sync + 'static> Service for Arc<T> {
    const REPRESENTATION: Representation = Representation::Reference;
}

impl<T: ?Sized + Sync + 'static> Service for &'static T {
    const REPRESENTATION: Representation = Representation::Reference;
}

macro_rules! value_services {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Service for $ty {
                const REPRESENTATION: Representation = Representation::Value;
            }
        )*
    };
}

value_services!(
    (), bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64,
    String,
);

impl<T: Service> Service for Vec<T> {
    const REPRESENTATION: Representation = Representation::Value;
}

impl<T: Service> Service for Option<T> {
    const REPRESENTATION: Representation = Representation::Value;
}

impl<T: Service> Service for Box<T> {
    const REPRESENTATION: Representation = Representation::Value;
}

/// Object-safe view of a [`Service`] value.
trait ErasedService: Send + Sync {
    fn clone_boxed(&self) -> Box<dyn ErasedService>;
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync>;
    fn as_any(&self) -> &(dyn Any + Send + Sync);
}

impl<T: Service> ErasedService for T {
    fn clone_boxed(&self) -> Box<dyn ErasedService> {
        Box::new(self.clone())
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync> {
        self
    }

    fn as_any(&self) -> &(dyn Any + Send + Sync) {
        self
    }
}

/// A type-erased resolved value tagged with the key of its concrete type.
///
/// This is what [`Resolver::resolve_key`](crate::registry::Resolver::resolve_key)
/// returns. Cloning an `Instance` clones the held value, so for
/// reference-like services every clone observes the same object.
pub struct Instance {
    key: DependencyKey,
    representation: Representation,
    value: Box<dyn ErasedService>,
}

impl Instance {
    /// Erases `value`.
    pub fn new<T: Service>(value: T) -> Self {
        Self {
            key: DependencyKey::of::<T>(),
            representation: T::REPRESENTATION,
            value: Box::new(value),
        }
    }

    /// Key of the type actually held.
    #[inline]
    pub fn key(&self) -> DependencyKey {
        self.key
    }

    #[inline]
    pub fn representation(&self) -> Representation {
        self.representation
    }

    /// Returns `true` if the held value is a `T`.
    pub fn is<T: Service>(&self) -> bool {
        self.value.as_any().is::<T>()
    }

    /// Borrows the held value as `T`.
    pub fn downcast_ref<T: Service>(&self) -> Option<&T> {
        self.value.as_any().downcast_ref::<T>()
    }

    /// Unwraps the held value as `T`.
    ///
    /// # Errors
    /// Returns [`SanduqError::TypeMismatch`] if the instance holds a
    /// different type.
    pub fn downcast<T: Service>(self) -> Result<T, SanduqError> {
        let actual = self.key;
        self.value
            .into_any()
            .downcast::<T>()
            .map(|boxed| *boxed)
            .map_err(|_| {
                SanduqError::TypeMismatch(TypeMismatchError {
                    requested: DependencyKey::of::<T>(),
                    actual,
                })
            })
    }
}

impl Clone for Instance {
    fn clone(&self) -> Self {
        Self {
            key: self.key,
            representation: self.representation,
            value: self.value.clone_boxed(),
        }
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("type", &self.key.type_name())
            .field("representation", &self.representation)
            .finish()
    }
}
