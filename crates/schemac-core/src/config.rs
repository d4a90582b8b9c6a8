use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("failed to parse feature flags: {0}")]
    Toml(#[from] toml::de::Error),
}

///
/// FeatureFlags
///
/// Named switches read once per run. Passes consume them but never change
/// them. Missing keys take their defaults.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FeatureFlags {
    /// Newer geo-position representation: no derived `.distance` and
    /// `.position` summary fields.
    #[serde(default)]
    pub use_v8_geo_positions: bool,

    #[serde(default)]
    pub allow_array_of_bool_attributes: bool,

    /// Add `rankfeatures` and `summaryfeatures` to every summary class.
    #[serde(default = "default_true")]
    pub implicit_feature_summary_fields: bool,
}

impl FeatureFlags {
    /// Parse flags from a TOML document with flat keys.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            use_v8_geo_positions: false,
            allow_array_of_bool_attributes: false,
            implicit_feature_summary_fields: true,
        }
    }
}

const fn default_true() -> bool {
    true
}
