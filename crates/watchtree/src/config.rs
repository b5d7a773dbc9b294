//! Digest configuration.
//!
//! Loaded from TOML, e.g.
//!
//! ```toml
//! max_passes = 10
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Tuning for a [`ScopeTree`](crate::ScopeTree)'s digest loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DigestConfig {
    /// Passes allowed before a digest fails with
    /// [`DigestError::Convergence`](crate::DigestError::Convergence).
    pub max_passes: usize,
}

impl DigestConfig {
    pub const DEFAULT_MAX_PASSES: usize = 10;

    pub fn new(max_passes: usize) -> Result<Self, ConfigError> {
        let config = Self { max_passes };
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_passes == 0 {
            return Err(ConfigError::ZeroMaxPasses);
        }
        Ok(())
    }
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            max_passes: Self::DEFAULT_MAX_PASSES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = DigestConfig::from_toml_str("").unwrap();
        assert_eq!(config, DigestConfig::default());
        assert_eq!(config.max_passes, 10);
    }

    #[test]
    fn reads_max_passes() {
        let config = DigestConfig::from_toml_str("max_passes = 3").unwrap();
        assert_eq!(config.max_passes, 3);
    }

    #[test]
    fn rejects_zero_passes() {
        assert!(matches!(
            DigestConfig::from_toml_str("max_passes = 0"),
            Err(ConfigError::ZeroMaxPasses)
        ));
        assert!(matches!(DigestConfig::new(0), Err(ConfigError::ZeroMaxPasses)));
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(matches!(
            DigestConfig::from_toml_str("ttl = 3"),
            Err(ConfigError::Parse(_))
        ));
    }
}
