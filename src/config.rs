//! Configuration types for the arrangement stub.

use crate::error::StubError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration for the arrangement stub.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StubConfig {
    /// Config version
    pub version: String,

    /// Response template location
    pub template: TemplateConfig,

    /// General settings
    pub settings: SettingsConfig,
}

impl Default for StubConfig {
    fn default() -> Self {
        Self {
            version: "1".to_string(),
            template: TemplateConfig::default(),
            settings: SettingsConfig::default(),
        }
    }
}

impl StubConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, StubError> {
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content)
            .map_err(|e| StubError::Config(format!("{}: {}", path.display(), e)))
    }
}

/// Response template configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// Template file read on every request. The bundled template is used
    /// when unset.
    pub path: Option<PathBuf>,
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsConfig {
    /// Content-Type stamped on outbound messages
    pub content_type: String,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            content_type: "text/xml; charset=utf-8".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StubConfig::default();
        assert_eq!(config.version, "1");
        assert!(config.template.path.is_none());
        assert_eq!(config.settings.content_type, "text/xml; charset=utf-8");
    }

    #[test]
    fn test_config_serialization() {
        let mut config = StubConfig::default();
        config.template.path = Some(PathBuf::from("/srv/stub/response.xml"));
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: StubConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.template.path, config.template.path);
    }

    #[test]
    fn test_config_from_yaml() {
        let yaml = r#"
version: "1"
template:
  path: "templates/validate-response.xml"
settings:
  content_type: "application/soap+xml"
"#;
        let config: StubConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            config.template.path,
            Some(PathBuf::from("templates/validate-response.xml"))
        );
        assert_eq!(config.settings.content_type, "application/soap+xml");
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: StubConfig = serde_yaml::from_str("version: \"2\"\n").unwrap();
        assert_eq!(config.version, "2");
        assert!(config.template.path.is_none());
        assert_eq!(config.settings.content_type, "text/xml; charset=utf-8");
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "template:\n  path: \"response.xml\"\n").unwrap();

        let config = StubConfig::from_file(&path).unwrap();
        assert_eq!(config.template.path, Some(PathBuf::from("response.xml")));
    }

    #[test]
    fn test_from_file_invalid_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "template: [unclosed").unwrap();

        let err = StubConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, StubError::Config(_)));
    }

    #[test]
    fn test_from_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = StubConfig::from_file(&dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, StubError::Io(_)));
    }
}
