//! Assignability between implementation and capability types.
//!
//! Rust has no runtime "is assignable to" check, so the collection keeps
//! explicit evidence: a conversion `I -> C` registered per pair. The
//! conversion is usually an unsizing coercion written as a closure:
//!
//! ```rust,ignore
//! services.register_coercion::<Arc<dyn Greeter>, Arc<EnglishGreeter>>(|g| g);
//! ```
//!
//! A type is always assignable to itself.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use anymap2::Map;
use anymap2::any::Any as MapAny;

/// Converts an implementation value into its capability.
pub(crate) type AssignFn<I, C> = Arc<dyn Fn(I) -> Option<C> + Send + Sync>;

/// One registered conversion, stored under its own type.
struct Coercion<I, C>(Arc<dyn Fn(I) -> C + Send + Sync>);

/// Table of declared `I -> C` conversions, one per pair.
pub(crate) struct Coercions {
    table: Map<dyn MapAny + Send + Sync>,
}

impl Coercions {
    pub fn new() -> Self {
        Self { table: Map::new() }
    }

    /// Declares `I` assignable to `C`. A later declaration for the same
    /// pair replaces the earlier one.
    pub fn insert<C, I>(&mut self, coerce: impl Fn(I) -> C + Send + Sync + 'static)
    where
        C: 'static,
        I: 'static,
    {
        self.table.insert(Coercion::<I, C>(Arc::new(coerce)));
    }

    /// Returns the conversion for `I -> C`, or `None` if `I` is not
    /// assignable to `C`.
    pub fn assign_fn<C, I>(&self) -> Option<AssignFn<I, C>>
    where
        C: Send + Sync + 'static,
        I: Send + Sync + 'static,
    {
        if TypeId::of::<I>() == TypeId::of::<C>() {
            return Some(Arc::new(identity::<I, C>));
        }
        let Coercion(coerce) = self.table.get::<Coercion<I, C>>()?;
        let coerce = Arc::clone(coerce);
        Some(Arc::new(move |value: I| Some(coerce(value))))
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }
}

/// `I` and `C` are the same type; moves the value across.
fn identity<I: 'static, C: 'static>(value: I) -> Option<C> {
    let boxed: Box<dyn Any> = Box::new(value);
    boxed.downcast::<C>().ok().map(|c| *c)
}

impl fmt::Debug for Coercions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coercions")
            .field("declared", &self.len())
            .finish()
    }
}
