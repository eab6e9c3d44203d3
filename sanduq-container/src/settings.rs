//! Container configuration.

use serde::Deserialize;

/// Tunables for a [`ServiceCollection`](crate::collection::ServiceCollection)
/// and the providers built from it.
///
/// Missing fields fall back to their defaults when deserialized:
///
/// ```
/// use sanduq_container::settings::ContainerSettings;
///
/// let settings = ContainerSettings::default().allow_override(false);
/// assert!(!settings.allow_override);
/// assert_eq!(settings.max_depth, 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ContainerSettings {
    /// Replace an existing registration instead of failing with
    /// `AlreadyRegistered`.
    pub allow_override: bool,
    /// Validate declared dependencies when building a provider.
    pub validate_on_build: bool,
    /// Nested resolutions allowed below a top-level resolve. With `0`,
    /// only factories that resolve nothing succeed.
    pub max_depth: usize,
}

impl ContainerSettings {
    pub const DEFAULT_MAX_DEPTH: usize = 64;

    pub fn allow_override(mut self, allow: bool) -> Self {
        self.allow_override = allow;
        self
    }

    pub fn validate_on_build(mut self, validate: bool) -> Self {
        self.validate_on_build = validate;
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }
}

impl Default for ContainerSettings {
    fn default() -> Self {
        Self {
            allow_override: true,
            validate_on_build: true,
            max_depth: Self::DEFAULT_MAX_DEPTH,
        }
    }
}
