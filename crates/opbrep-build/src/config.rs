//! Options of a Boolean operation.

use opbrep_math::precision;
use serde::{Deserialize, Serialize};

/// Which point classifier the builder uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierTag {
    /// Pick from the operands at `perform` time.
    #[default]
    Auto,
    /// Ray casting, for any closed solid.
    General,
    /// Closed-form tests for convex solids bounded by planes and cylinders.
    Quadric,
}

/// Options of the builder.
///
/// ```
/// use opbrep_build::BuildConfig;
///
/// let cfg = BuildConfig::from_toml_str("fuzzy = 1e-5\nregularize = true").unwrap();
/// assert!(cfg.regularize);
/// assert!(cfg.use_kparts);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Extra distance under which entities are considered coincident.
    pub fuzzy: f64,
    /// Upper bound for tolerances raised by `end`.
    pub tol_max: f64,
    /// Correct tolerances on several threads.
    pub parallel: bool,
    /// Try the special-case shortcuts before the general merge.
    pub use_kparts: bool,
    /// Point classifier.
    pub classifier: ClassifierTag,
    /// Merge split faces lying on one surface in the result.
    pub regularize: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            fuzzy: 0.0,
            tol_max: 1e-3,
            parallel: false,
            use_kparts: true,
            classifier: ClassifierTag::Auto,
            regularize: false,
        }
    }
}

impl BuildConfig {
    /// Parse a configuration from TOML. Missing keys keep their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Distance under which two points are the same.
    pub fn tolerance(&self) -> f64 {
        precision::CONFUSION + self.fuzzy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_toml() {
        let cfg = BuildConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, BuildConfig::default());
    }

    #[test]
    fn test_parse_all_keys() {
        let cfg = BuildConfig::from_toml_str(
            r#"
            fuzzy = 0.001
            tol_max = 0.01
            parallel = true
            use_kparts = false
            classifier = "quadric"
            regularize = true
            "#,
        )
        .unwrap();
        assert_eq!(cfg.classifier, ClassifierTag::Quadric);
        assert!(cfg.parallel && cfg.regularize && !cfg.use_kparts);
        assert!((cfg.tolerance() - 0.001 - precision::CONFUSION).abs() < 1e-15);
    }

    #[test]
    fn test_rejects_unknown_classifier() {
        assert!(BuildConfig::from_toml_str("classifier = \"mesh\"").is_err());
    }
}
