//! Registry construction parameters.

use crate::engine::error::ConfigError;
use crate::engine::types::{COMPONENT_CAP, DEFAULT_ENTITY_CAPACITY};


/// Tunables applied when a `Registry` is created.
///
/// ### Fields
/// * `initial_entity_capacity`: entity slots reserved up front. Purely a
///   performance hint; the allocator grows past it.
/// * `component_capacity`: maximum number of distinct component types the
///   registry will assign ids to. Must be in `1..=COMPONENT_CAP`.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Entity slots reserved up front.
    pub initial_entity_capacity: usize,

    /// Upper bound on registered component types.
    pub component_capacity: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            initial_entity_capacity: DEFAULT_ENTITY_CAPACITY,
            component_capacity: COMPONENT_CAP,
        }
    }
}

impl RegistryConfig {
    /// Checks that the configuration is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.component_capacity == 0 || self.component_capacity > COMPONENT_CAP {
            return Err(ConfigError {
                component_capacity: self.component_capacity,
                max: COMPONENT_CAP,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(RegistryConfig::default().validate().is_ok());
    }

    #[test]
    fn component_capacity_bounds() {
        let zero = RegistryConfig { component_capacity: 0, ..Default::default() };
        assert_eq!(
            zero.validate(),
            Err(ConfigError { component_capacity: 0, max: COMPONENT_CAP })
        );

        let over = RegistryConfig { component_capacity: COMPONENT_CAP + 1, ..Default::default() };
        assert!(over.validate().is_err());

        let exact = RegistryConfig { component_capacity: COMPONENT_CAP, ..Default::default() };
        assert!(exact.validate().is_ok());
    }
}
