//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON launch descriptors and usecase rules
//! - Validate configuration legality
//! - Resolve usecase references against a configuration root
//!
//! # Example
//!
//! ```no_run
//! use config_loader::DescriptorLoader;
//! use std::path::Path;
//!
//! let descriptor = DescriptorLoader::load_from_path(Path::new("usecase02.toml")).unwrap();
//! println!("Run: {}", descriptor.name);
//! ```

mod parser;
mod validator;

pub use contracts::{UsecaseRules, WorkflowDescriptor};
pub use parser::ConfigFormat;

use contracts::{ContractError, RulesLoader};
use std::path::{Path, PathBuf};

/// Launch descriptor loader
///
/// Provides static methods to load descriptors from files or strings.
pub struct DescriptorLoader;

impl DescriptorLoader {
    /// Load descriptor from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<WorkflowDescriptor, ContractError> {
        let format = detect_format(path)?;
        let content = read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load descriptor from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<WorkflowDescriptor, ContractError> {
        let descriptor: WorkflowDescriptor = parser::parse(content, format)?;
        validator::validate_descriptor(&descriptor)?;
        Ok(descriptor)
    }

    /// Serialize descriptor to TOML string
    pub fn to_toml(descriptor: &WorkflowDescriptor) -> Result<String, ContractError> {
        toml::to_string_pretty(descriptor)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize descriptor to JSON string
    pub fn to_json(descriptor: &WorkflowDescriptor) -> Result<String, ContractError> {
        serde_json::to_string_pretty(descriptor)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

/// Usecase rules loader backed by a configuration directory
///
/// A reference is either a file name with extension (`usecase-02.toml`), an
/// absolute path, or a bare name tried as `<name>.toml` then `<name>.json`.
/// Relative references resolve against the configuration root.
#[derive(Debug, Clone)]
pub struct FileRulesLoader {
    config_root: PathBuf,
}

impl FileRulesLoader {
    pub fn new(config_root: impl Into<PathBuf>) -> Self {
        Self {
            config_root: config_root.into(),
        }
    }

    pub fn config_root(&self) -> &Path {
        &self.config_root
    }

    /// Load rules from string
    pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<UsecaseRules, ContractError> {
        let rules: UsecaseRules = parser::parse(content, format)?;
        validator::validate_rules(&rules)?;
        Ok(rules)
    }

    /// Resolve a reference to an existing file
    pub fn resolve(&self, reference: &str) -> Result<PathBuf, ContractError> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(ContractError::config_validation(
                "usecase",
                "usecase reference cannot be empty",
            ));
        }

        let candidate = self.config_root.join(reference);
        if candidate.extension().is_some() {
            if candidate.is_file() {
                return Ok(candidate);
            }
            return Err(ContractError::config_parse(format!(
                "usecase config not found: {}",
                candidate.display()
            )));
        }

        [ConfigFormat::Toml, ConfigFormat::Json]
            .iter()
            .map(|format| candidate.with_extension(format.extension()))
            .find(|path| path.is_file())
            .ok_or_else(|| {
                ContractError::config_parse(format!(
                    "usecase config '{reference}' not found under {}",
                    self.config_root.display()
                ))
            })
    }
}

impl RulesLoader for FileRulesLoader {
    fn load(&self, reference: &str) -> Result<UsecaseRules, ContractError> {
        let path = self.resolve(reference)?;
        let format = detect_format(&path)?;
        let content = read_file(&path)?;
        Self::load_from_str(&content, format)
    }
}

/// Infer configuration format from file extension
fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
    let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
        ContractError::config_parse("cannot determine file format from extension")
    })?;

    ConfigFormat::from_extension(ext)
        .ok_or_else(|| ContractError::config_parse(format!("unsupported config format: .{ext}")))
}

/// Read configuration file content
fn read_file(path: &Path) -> Result<String, ContractError> {
    std::fs::read_to_string(path).map_err(|e| ContractError::ConfigParse {
        message: format!("cannot read {}: {e}", path.display()),
        source: Some(Box::new(e)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{Granularity, RunMode};

    const MATCHUP_TOML: &str = r#"
name = "usecase02_avhrr_m02_n18"
retry_limit = 7
config_root = "/tmp/mms/config"
mode = "matchup"
usecase = "usecase-02.toml"
granularity = "10d"

[[sensors]]
id = "avhrr-m02"
role = "primary"
start = "2006-10-30"
end = "2015-12-31"
version = "v01.2"

[[sensors]]
id = "avhrr-n18"
role = "secondary"
start = "2006-10-30"
end = "2015-12-31"
version = "v01.2"

[[hosts]]
name = "localhost"
workers = 24
"#;

    const RULES_TOML: &str = r#"
name = "mmd02"
time_delta_seconds = 300
max_distance_km = 5.0
variables = ["ch4", "ch5"]
"#;

    #[test]
    fn test_load_from_str_toml() {
        let descriptor = DescriptorLoader::load_from_str(MATCHUP_TOML, ConfigFormat::Toml).unwrap();
        assert_eq!(descriptor.mode, RunMode::Matchup);
        assert_eq!(descriptor.granularity, Granularity::Days(10));
        assert_eq!(descriptor.hosts[0].max_workers, 24);
    }

    #[test]
    fn test_round_trip_toml() {
        let descriptor = DescriptorLoader::load_from_str(MATCHUP_TOML, ConfigFormat::Toml).unwrap();
        let serialized = DescriptorLoader::to_toml(&descriptor).unwrap();
        let back = DescriptorLoader::load_from_str(&serialized, ConfigFormat::Toml).unwrap();
        assert_eq!(back.name, descriptor.name);
        assert_eq!(back.sensors.len(), 2);
        assert_eq!(back.granularity, descriptor.granularity);
    }

    #[test]
    fn test_round_trip_json() {
        let descriptor = DescriptorLoader::load_from_str(MATCHUP_TOML, ConfigFormat::Toml).unwrap();
        let json = DescriptorLoader::to_json(&descriptor).unwrap();
        let back = DescriptorLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(back.hosts, descriptor.hosts);
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let content = MATCHUP_TOML.replace("workers = 24", "workers = 0");
        let result = DescriptorLoader::load_from_str(&content, ConfigFormat::Toml);
        assert!(matches!(
            result,
            Err(ContractError::ConfigValidation { .. })
        ));
    }

    #[test]
    fn test_rules_loader_resolves_bare_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("usecase-02.toml"), RULES_TOML).unwrap();

        let loader = FileRulesLoader::new(dir.path());
        let rules = loader.load("usecase-02").unwrap();
        assert_eq!(rules.name, "mmd02");
        assert_eq!(rules.time_delta_seconds, 300);

        let explicit = loader.load("usecase-02.toml").unwrap();
        assert_eq!(explicit, rules);
    }

    #[test]
    fn test_rules_loader_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("usecase-05.json"),
            r#"{"name":"mmd05","time_delta_seconds":600,"max_distance_km":10.0}"#,
        )
        .unwrap();

        let rules = FileRulesLoader::new(dir.path()).load("usecase-05").unwrap();
        assert!(rules.variables.is_empty());
    }

    #[test]
    fn test_rules_loader_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileRulesLoader::new(dir.path())
            .load("usecase-99.toml")
            .unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("not found"), "got: {err}");
    }

    #[test]
    fn test_rules_loader_unsupported_format() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("usecase-02.xml"), "<use-case-config/>").unwrap();
        let err = FileRulesLoader::new(dir.path())
            .load("usecase-02.xml")
            .unwrap_err();
        assert!(err.to_string().contains("unsupported"), "got: {err}");
    }

    #[test]
    fn test_rules_loader_invalid_rules() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("bad.toml"),
            "name = \"bad\"\ntime_delta_seconds = 0\nmax_distance_km = 5.0\n",
        )
        .unwrap();
        let result = FileRulesLoader::new(dir.path()).load("bad");
        assert!(matches!(
            result,
            Err(ContractError::ConfigValidation { .. })
        ));
    }

    #[test]
    fn test_rules_loader_rejects_oversized_time_delta() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("wide.toml"),
            "name = \"wide\"\ntime_delta_seconds = 10000000000000000\nmax_distance_km = 5.0\n",
        )
        .unwrap();
        let err = FileRulesLoader::new(dir.path()).load("wide").unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("time_delta_seconds"), "got: {err}");
    }
}
