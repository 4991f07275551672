//! Check policy loaded from TOML.

use crate::error::ConfigError;
use cfgcat_model::DEFAULT_METAMODEL_VERSION;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CheckConfig {
    /// Duplicate pids across areas are warnings when allowed and interference
    /// errors otherwise.
    pub allow_double_pids: bool,
    /// Pid of the authority owning the areas this instance records dependencies for.
    pub local_authority: Option<String>,
    /// First metamodel version that knows area dependencies.
    pub dependency_metamodel_version: u32,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            allow_double_pids: true,
            local_authority: None,
            dependency_metamodel_version: DEFAULT_METAMODEL_VERSION,
        }
    }
}

impl CheckConfig {
    pub fn from_toml_str(raw: &str, origin: &str) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: origin.to_string(),
            source,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&raw, &path.display().to_string())
    }

    /// Whether dependency tracking applies to a catalog with `metamodel_version`.
    pub fn tracks_dependencies(&self, metamodel_version: u32) -> bool {
        metamodel_version >= self.dependency_metamodel_version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = CheckConfig::from_toml_str("", "inline").expect("empty config parses");
        assert_eq!(config, CheckConfig::default());
        assert!(config.allow_double_pids);
        assert!(config.tracks_dependencies(9));
        assert!(!config.tracks_dependencies(8));
    }

    #[test]
    fn fields_override_defaults() {
        let config = CheckConfig::from_toml_str(
            r#"
allow_double_pids = false
local_authority = "kv.local"
dependency_metamodel_version = 12
"#,
            "inline",
        )
        .expect("config parses");
        assert!(!config.allow_double_pids);
        assert_eq!(config.local_authority.as_deref(), Some("kv.local"));
        assert_eq!(config.dependency_metamodel_version, 12);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = CheckConfig::from_toml_str("allow_dobule_pids = true", "inline")
            .expect_err("typo must be rejected");
        assert!(err.to_string().contains("inline"));
    }
}
