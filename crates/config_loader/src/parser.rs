//! Configuration parsing
//!
//! Supports TOML (primary) and JSON formats for both launch descriptors and
//! usecase rules.

use contracts::ContractError;
use serde::de::DeserializeOwned;

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML format (recommended)
    Toml,
    /// JSON format
    Json,
}

impl ConfigFormat {
    /// Infer format from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Toml => "toml",
            Self::Json => "json",
        }
    }
}

/// Parse TOML content
pub fn parse_toml<T: DeserializeOwned>(content: &str) -> Result<T, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse JSON content
pub fn parse_json<T: DeserializeOwned>(content: &str) -> Result<T, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse content according to format
pub fn parse<T: DeserializeOwned>(content: &str, format: ConfigFormat) -> Result<T, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{UsecaseRules, WorkflowDescriptor};

    #[test]
    fn test_parse_toml_rules() {
        let content = r#"
name = "mmd02"
time_delta_seconds = 300
max_distance_km = 5.0
variables = ["ch4", "ch5"]
"#;
        let rules: UsecaseRules = parse_toml(content).unwrap();
        assert_eq!(rules.name, "mmd02");
        assert_eq!(rules.variables.len(), 2);
        assert!(rules.output_path.is_none());
    }

    #[test]
    fn test_parse_json_descriptor() {
        let content = r#"{
            "name": "ingest_bottle_sst",
            "retry_limit": 7,
            "config_root": "/tmp/mms/config",
            "mode": "ingestion",
            "sensors": [{
                "id": "bottle-sst",
                "role": "primary",
                "start": "1978-01-01",
                "end": "2016-12-31",
                "version": "v03.3"
            }],
            "hosts": [{ "name": "localhost", "workers": 1 }]
        }"#;
        let descriptor: WorkflowDescriptor = parse_json(content).unwrap();
        assert_eq!(descriptor.retry_limit, 7);
        assert_eq!(descriptor.hosts[0].max_workers, 1);
        assert_eq!(descriptor.job_timeout_secs, 600);
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let result = parse_toml::<UsecaseRules>("invalid toml [[[");
        assert!(matches!(result, Err(ContractError::ConfigParse { .. })));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("TOML"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("json"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("xml"), None);
    }
}
