use crate::error::{HeapGraphError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for the decode pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// What to do when instance values disagree with the class chain
    pub field_count_policy: FieldCountPolicy,

    /// Placeholder for names whose string or class record is missing
    pub unknown_name: String,

    /// Create placeholder vertices for reference targets never dumped
    /// (otherwise their edges are dropped)
    pub materialize_dangling: bool,

    /// Keep resolved field values on vertices (edges are built either way)
    pub keep_field_values: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            field_count_policy: FieldCountPolicy::Fatal,
            unknown_name: "unknown".to_string(),
            materialize_dangling: true,
            keep_field_values: true,
        }
    }
}

impl DecoderConfig {
    /// Abort on any metadata/instance disagreement
    pub fn strict() -> Self {
        Self::default()
    }

    /// Keep going on damaged dumps, recording issues on vertices
    pub fn lenient() -> Self {
        Self {
            field_count_policy: FieldCountPolicy::BestEffort,
            ..Default::default()
        }
    }

    /// Smaller vertices for large dumps
    pub fn for_summary() -> Self {
        Self {
            keep_field_values: false,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.unknown_name.trim().is_empty() {
            return Err(HeapGraphError::invalid_config(
                "unknown_name must not be empty",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldCountPolicy {
    /// Abort the decode with `FieldCountMismatch`
    #[default]
    Fatal,

    /// Keep the consumed prefix and flag the vertex
    BestEffort,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_configs_valid() {
        assert!(DecoderConfig::default().validate().is_ok());
        assert!(DecoderConfig::strict().validate().is_ok());
        assert!(DecoderConfig::lenient().validate().is_ok());
        assert!(DecoderConfig::for_summary().validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let config = DecoderConfig {
            unknown_name: "  ".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: DecoderConfig =
            serde_json::from_str(r#"{"field_count_policy":"best_effort"}"#).unwrap();
        assert_eq!(config.field_count_policy, FieldCountPolicy::BestEffort);
        assert_eq!(config.unknown_name, "unknown");
        assert!(config.materialize_dangling);
    }
}
