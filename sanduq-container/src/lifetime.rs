//! Service lifetimes.
//!
//! A lifetime determines how often a registered factory runs:
//! - [`Lifetime::Singleton`]: once per provider tree
//! - [`Lifetime::Scoped`]: once per provider (each scope gets its own)
//! - [`Lifetime::Transient`]: on every resolve
//!
//! # Ordering
//! Lifetimes are ordered by how long their instances live:
//! `Singleton > Scoped > Transient`.
use std::fmt;

use serde::Deserialize;

/// Defines the instantiation semantics of a registered service.
///
/// # Examples
/// ```
/// use sanduq_container::lifetime::Lifetime;
///
/// assert!(Lifetime::Singleton > Lifetime::Scoped);
/// assert!(Lifetime::Scoped > Lifetime::Transient);
/// assert!(!Lifetime::Transient.is_cached());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifetime {
    /// A new instance is created every time the service is resolved.
    ///
    /// Never cached, so any representation is allowed.
    Transient,

    /// One instance per [`ServiceProvider`](crate::provider::ServiceProvider).
    ///
    /// Resolving twice from the same provider returns the same instance;
    /// a scope created with `new_scope()` builds its own.
    ///
    /// Only reference-like representations may be registered as Scoped.
    Scoped,

    /// One instance for a root provider and every scope derived from it.
    ///
    /// Only reference-like representations may be registered as Singleton.
    Singleton,
}

impl Lifetime {
    /// Returns `true` if resolved instances are cached.
    #[inline]
    pub fn is_cached(&self) -> bool {
        matches!(self, Lifetime::Singleton | Lifetime::Scoped)
    }

    /// Higher means longer lived.
    #[inline]
    fn ordering(&self) -> u8 {
        match self {
            Lifetime::Singleton => 2,
            Lifetime::Scoped => 1,
            Lifetime::Transient => 0,
        }
    }
}

impl PartialOrd for Lifetime {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Lifetime {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.ordering().cmp(&other.ordering())
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifetime::Singleton => write!(f, "Singleton"),
            Lifetime::Scoped => write!(f, "Scoped"),
            Lifetime::Transient => write!(f, "Transient"),
        }
    }
}
