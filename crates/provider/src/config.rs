//! Provider configuration

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default libvirt URI
pub const DEFAULT_URI: &str = "qemu:///system";

/// Environment variable libvirt itself honours for the default URI
pub const URI_ENV: &str = "LIBVIRT_DEFAULT_URI";

/// Provider configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Libvirt connection URI
    pub uri: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            uri: DEFAULT_URI.to_string(),
        }
    }
}

impl ProviderConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply `LIBVIRT_DEFAULT_URI` when it is set and non-empty.
    pub fn with_env_overrides(self) -> Self {
        let uri = std::env::var(URI_ENV).ok();
        self.with_uri_override(uri)
    }

    pub fn with_uri_override(mut self, uri: Option<String>) -> Self {
        if let Some(uri) = uri.filter(|u| !u.is_empty()) {
            self.uri = uri;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = ProviderConfig::load(&tmp.path().join("absent.toml")).unwrap();
        assert_eq!(config, ProviderConfig::default());
        assert_eq!(config.uri, "qemu:///system");
    }

    #[test]
    fn test_save_and_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("provider.toml");

        let config = ProviderConfig {
            uri: "qemu:///session".to_string(),
        };
        config.save(&path).unwrap();

        assert_eq!(ProviderConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_empty_file_uses_default_uri() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("provider.toml");
        std::fs::write(&path, "").unwrap();

        assert_eq!(ProviderConfig::load(&path).unwrap().uri, DEFAULT_URI);
    }

    #[test]
    fn test_uri_override() {
        let config = ProviderConfig::default()
            .with_uri_override(Some("qemu+ssh://admin@host/system".into()));
        assert_eq!(config.uri, "qemu+ssh://admin@host/system");

        let config = config.with_uri_override(Some(String::new()));
        assert_eq!(config.uri, "qemu+ssh://admin@host/system");
    }
}
