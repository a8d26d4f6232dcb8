use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use superres_core::manifest::{Labels, ModelSpec};

pub const HOME_ENV: &str = "SUPERRES_HOME";
pub const CACHE_ENV: &str = "SUPERRES_CACHE";
pub const FORCE_UNSUPPORTED_ENV: &str = "SUPERRES_FORCE_UNSUPPORTED";
pub const AI_DISABLED_ENV: &str = "SUPERRES_AI_DISABLED";

/// Operating systems and CPU architectures the AI model can run on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformRequirement {
    pub operating_systems: Vec<String>,
    pub architectures: Vec<String>,
}

impl Default for PlatformRequirement {
    fn default() -> Self {
        Self {
            operating_systems: vec!["windows".into(), "macos".into(), "linux".into()],
            architectures: vec!["x86_64".into(), "aarch64".into()],
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct ConfigFile {
    model: Option<ModelSpec>,
    platforms: Option<PlatformRequirement>,
    labels: Option<Labels>,
    ai_disabled: bool,
}

#[derive(Debug, Clone)]
pub struct ProvisionConfig {
    pub config_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub model: ModelSpec,
    pub platforms: PlatformRequirement,
    pub labels: Labels,
    /// Policy switch standing in for an OS-level "AI features off" setting.
    pub ai_disabled: bool,
}

impl ProvisionConfig {
    /// Resolve directories from the environment and overlay
    /// `<config_dir>/config.toml` if present.
    pub fn load() -> Result<Self> {
        let config_dir = if let Ok(home) = std::env::var(HOME_ENV) {
            PathBuf::from(home)
        } else {
            dirs::config_dir()
                .context("Could not find config directory")?
                .join("superres")
        };

        let cache_dir = if let Ok(cache) = std::env::var(CACHE_ENV) {
            PathBuf::from(cache)
        } else {
            config_dir.join("cache")
        };

        let mut config = Self::with_dirs(config_dir, cache_dir)?;
        config.ai_disabled |= env_flag(AI_DISABLED_ENV);
        Ok(config)
    }

    /// Build a config rooted at explicit directories, still honouring
    /// `config.toml` inside `config_dir`.
    pub fn with_dirs(config_dir: impl Into<PathBuf>, cache_dir: impl Into<PathBuf>) -> Result<Self> {
        let config_dir = config_dir.into();
        let file = load_file(&config_dir.join("config.toml"))?;

        Ok(Self {
            cache_dir: cache_dir.into(),
            config_dir,
            model: file.model.unwrap_or_default(),
            platforms: file.platforms.unwrap_or_default(),
            labels: file.labels.unwrap_or_default(),
            ai_disabled: file.ai_disabled,
        })
    }

    pub fn settings_path(&self) -> PathBuf {
        self.config_dir.join("settings.toml")
    }

    pub fn model_path(&self) -> PathBuf {
        self.cache_dir.join(&self.model.filename)
    }
}

fn load_file(path: &Path) -> Result<ConfigFile> {
    if !path.exists() {
        return Ok(ConfigFile::default());
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    toml::from_str(&content).with_context(|| format!("Failed to parse {:?}", path))
}

/// `1`, `true`, `yes` and `on` (any case) count as set.
pub fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|value| {
            matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = ProvisionConfig::with_dirs(dir.path(), dir.path().join("cache")).unwrap();

        assert_eq!(config.model, ModelSpec::default());
        assert_eq!(config.platforms, PlatformRequirement::default());
        assert!(!config.ai_disabled);
        assert_eq!(config.settings_path(), dir.path().join("settings.toml"));
        assert_eq!(
            config.model_path(),
            dir.path().join("cache").join(&config.model.filename)
        );
    }

    #[test]
    fn config_file_overrides_model_and_platforms() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("config.toml"),
            r#"
ai_disabled = true

[model]
name = "tiny"
url = "http://127.0.0.1:1/tiny.onnx"
filename = "tiny.onnx"

[platforms]
architectures = ["aarch64"]

[labels]
new = "Neue Größe"
"#,
        )
        .unwrap();

        let config = ProvisionConfig::with_dirs(dir.path(), dir.path()).unwrap();
        assert_eq!(config.model.filename, "tiny.onnx");
        assert_eq!(config.platforms.architectures, vec!["aarch64".to_string()]);
        assert_eq!(
            config.platforms.operating_systems,
            PlatformRequirement::default().operating_systems
        );
        assert_eq!(config.labels.new, "Neue Größe");
        assert_eq!(config.labels.current, "Current size");
        assert!(config.ai_disabled);
    }

    #[test]
    fn broken_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.toml"), "model = [").unwrap();
        assert!(ProvisionConfig::with_dirs(dir.path(), dir.path()).is_err());
    }
}
