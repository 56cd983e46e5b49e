//! User configuration layered over the built-in rule set

use std::collections::BTreeMap;
use std::path::Path;

use armlint_core::{Severity, SpecKinds};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, EngineError};
use crate::ruleset::RuleSet;

/// Environment variable naming the default config file.
pub const CONFIG_ENV: &str = "ARMLINT_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LintConfig {
    /// Document kind, e.g. `arm` or `data-plane`
    pub kind: Option<String>,
    /// Rule names or ids to skip
    pub disabled_rules: Vec<String>,
    /// Rule name or id to severity
    pub severity_overrides: BTreeMap<String, Severity>,
    /// Maximum reference nesting in composed views
    pub compose_depth: Option<usize>,
}

impl LintConfig {
    /// Read a config file; `.toml` is parsed as TOML, anything else as
    /// YAML (which covers JSON).
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        debug!("Loaded config from {}", path.display());

        let is_toml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        if is_toml {
            Self::from_toml(&text)
        } else {
            Self::from_yaml(&text)
        }
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn spec_kind(&self) -> Result<Option<SpecKinds>, ConfigError> {
        self.kind
            .as_deref()
            .map(str::parse::<SpecKinds>)
            .transpose()
            .map_err(ConfigError::from)
    }

    /// Apply disabled rules and severity overrides to `rules`.
    pub fn apply(&self, rules: RuleSet) -> Result<RuleSet, EngineError> {
        let mut rules = rules.without(&self.disabled_rules);
        for (name, severity) in &self.severity_overrides {
            rules = rules.with_severity(name, *severity)?;
        }
        Ok(rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::builtin_rules;
    use std::io::Write;

    #[test]
    fn test_yaml_config() {
        let config = LintConfig::from_yaml(
            "kind: arm\n\
             disabled_rules: [OperationIdNounVerb]\n\
             severity_overrides:\n  R4001: warning\n\
             compose_depth: 8\n",
        )
        .unwrap();
        assert_eq!(config.spec_kind().unwrap(), Some(SpecKinds::ARM));
        assert_eq!(config.compose_depth, Some(8));

        let rules = config.apply(builtin_rules().unwrap()).unwrap();
        assert!(!rules.contains("OperationIdNounVerb"));
        assert_eq!(rules.get("R4001").unwrap().severity, Severity::Warning);
    }

    #[test]
    fn test_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "kind = \"data-plane\"\ndisabled_rules = [\"R4004\"]").unwrap();

        let config = LintConfig::load(file.path()).unwrap();
        assert_eq!(config.spec_kind().unwrap(), Some(SpecKinds::DATA_PLANE));
        assert_eq!(config.disabled_rules, vec!["R4004"]);
    }

    #[test]
    fn test_json_and_empty_configs() {
        let config = LintConfig::from_yaml(r#"{"severity_overrides": {"R4002": "info"}}"#).unwrap();
        assert_eq!(config.severity_overrides["R4002"], Severity::Info);
        assert_eq!(LintConfig::from_yaml("").unwrap(), LintConfig::default());
    }

    #[test]
    fn test_unknown_override_is_an_error() {
        let config = LintConfig::from_yaml("severity_overrides:\n  R9999: error\n").unwrap();
        assert!(matches!(
            config.apply(builtin_rules().unwrap()),
            Err(EngineError::UnknownRule(_))
        ));
    }

    #[test]
    fn test_bad_kind_is_an_error() {
        let config = LintConfig::from_yaml("kind: cloud\n").unwrap();
        assert!(config.spec_kind().is_err());
    }
}
