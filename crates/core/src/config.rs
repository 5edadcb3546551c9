//! Configuration
//!
//! YAML files in layers (user, then project, then an explicit file),
//! followed by `NLWEB_*` environment overrides. Every field has a default,
//! so a missing file is never an error.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

pub const ENV_ENDPOINT: &str = "NLWEB_ENDPOINT";
pub const ENV_SITE: &str = "NLWEB_SITE";
pub const ENV_STORAGE_FILE: &str = "NLWEB_STORAGE_FILE";

const CONFIG_FILE_NAME: &str = "config.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("missing required setting: {0}")]
    Missing(&'static str),
}

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub client: ClientConfig,
    pub storage: StorageConfig,
    pub summary: SummaryConfig,
    pub render: RenderConfig,
}

/// Answer service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL; requests go to `<endpoint>/ask`
    pub endpoint: Option<String>,

    /// Site the service should answer from
    pub site: Option<String>,

    /// Answer mode sent with each query
    pub mode: String,

    /// Extra sites sent as the `sites` list
    pub sites: Vec<String>,

    /// Send earlier queries of the conversation as `prev`
    pub send_prev: bool,

    /// Connect timeout (ms)
    pub connect_timeout_ms: u64,

    /// Overall request timeout (ms), streaming included; unset means none
    pub request_timeout_ms: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            site: None,
            mode: "answer".to_string(),
            sites: Vec::new(),
            send_prev: false,
            connect_timeout_ms: 10_000,
            request_timeout_ms: None,
        }
    }
}

impl ClientConfig {
    pub fn endpoint(&self) -> Result<&str, ConfigError> {
        self.endpoint
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .ok_or(ConfigError::Missing("client.endpoint"))
    }
}

/// Conversation history settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// History file; defaults to the user data directory
    pub path: Option<PathBuf>,

    /// Conversations kept, newest first
    pub max_conversations: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: None,
            max_conversations: crate::store::MAX_STORED_CONVERSATIONS,
        }
    }
}

impl StorageConfig {
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("nlweb")
                .join("conversations.json")
        })
    }
}

/// Result description cleanup
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    /// Metadata labels stripped from descriptions (`label:`)
    pub strip_fields: Vec<String>,

    /// Shorter cleaned descriptions are dropped
    pub min_description_len: usize,

    /// Longer cleaned descriptions are truncated
    pub max_description_len: usize,

    /// Sentence/word cuts must land after this many characters
    pub boundary_floor: usize,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            strip_fields: ["description", "title", "image", "keywords", "author", "tags", "date"]
                .into_iter()
                .map(String::from)
                .collect(),
            min_description_len: 20,
            max_description_len: 200,
            boundary_floor: 150,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Show the "Searching: ..." note
    pub show_sites: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self { show_sites: true }
    }
}

/// Where a config file lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayer {
    User,
    Project,
}

impl ConfigLayer {
    /// Directory of the layer.
    pub fn path(&self) -> PathBuf {
        match self {
            ConfigLayer::User => dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("nlweb"),
            ConfigLayer::Project => PathBuf::from(".nlweb"),
        }
    }

    pub fn file(&self) -> PathBuf {
        self.path().join(CONFIG_FILE_NAME)
    }
}

/// Builds a [`ChatConfig`] from layered YAML files and the environment.
#[derive(Debug, Default)]
pub struct ChatConfigLoader {
    config: ChatConfig,
    loaded: Vec<PathBuf>,
}

impl ChatConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load user and project layers, then `explicit` if given, then the
    /// environment. An explicit file must exist; layer files may not.
    pub fn load(&mut self, explicit: Option<&Path>) -> Result<&ChatConfig, ConfigError> {
        for layer in [ConfigLayer::User, ConfigLayer::Project] {
            let file = layer.file();
            if file.is_file() {
                self.merge_file(&file)?;
            }
        }
        if let Some(path) = explicit {
            self.merge_file(path)?;
        }
        self.apply_env();
        Ok(&self.config)
    }

    /// Overlay one YAML file. Keys present in the file replace earlier
    /// values section by section.
    pub fn merge_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.merge_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loaded config layer {}", path.display());
        self.loaded.push(path.to_path_buf());
        Ok(())
    }

    fn merge_str(&mut self, raw: &str) -> Result<(), serde_yaml::Error> {
        let overlay: serde_yaml::Value = serde_yaml::from_str(raw)?;
        if overlay.is_null() {
            return Ok(());
        }
        let mut base = serde_yaml::to_value(&self.config)?;
        merge_values(&mut base, overlay);
        self.config = serde_yaml::from_value(base)?;
        Ok(())
    }

    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(endpoint) = non_empty(ENV_ENDPOINT) {
            self.config.client.endpoint = Some(endpoint);
        }
        if let Some(site) = non_empty(ENV_SITE) {
            self.config.client.site = Some(site);
        }
        if let Some(path) = non_empty(ENV_STORAGE_FILE) {
            self.config.storage.path = Some(PathBuf::from(path));
        }
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    pub fn into_config(self) -> ChatConfig {
        self.config
    }

    /// Files merged so far, in order.
    pub fn loaded_files(&self) -> &[PathBuf] {
        &self.loaded
    }
}

fn merge_values(base: &mut serde_yaml::Value, overlay: serde_yaml::Value) {
    match (base, overlay) {
        (serde_yaml::Value::Mapping(base), serde_yaml::Value::Mapping(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = ChatConfig::default();
        assert_eq!(config.client.mode, "answer");
        assert_eq!(config.storage.max_conversations, 50);
        assert_eq!(config.summary.min_description_len, 20);
        assert_eq!(config.summary.max_description_len, 200);
        assert!(config.render.show_sites);
        assert!(matches!(
            config.client.endpoint(),
            Err(ConfigError::Missing("client.endpoint"))
        ));
    }

    #[test]
    fn test_layers_merge_per_key() {
        let temp = TempDir::new().expect("temp dir");
        let first = temp.path().join("first.yaml");
        let second = temp.path().join("second.yaml");
        std::fs::write(
            &first,
            "client:\n  endpoint: https://one.example\n  site: blog\nrender:\n  show_sites: false\n",
        )
        .expect("write first");
        std::fs::write(&second, "client:\n  site: docs\n").expect("write second");

        let mut loader = ChatConfigLoader::new();
        loader.merge_file(&first).expect("merge first");
        loader.merge_file(&second).expect("merge second");
        let config = loader.config();
        assert_eq!(config.client.endpoint.as_deref(), Some("https://one.example"));
        assert_eq!(config.client.site.as_deref(), Some("docs"));
        assert!(!config.render.show_sites);
        assert_eq!(config.client.mode, "answer");
        assert_eq!(loader.loaded_files().len(), 2);
    }

    #[test]
    fn test_invalid_yaml_is_reported() {
        let temp = TempDir::new().expect("temp dir");
        let path = temp.path().join("bad.yaml");
        std::fs::write(&path, "client: [unclosed").expect("write");
        let mut loader = ChatConfigLoader::new();
        assert!(matches!(
            loader.merge_file(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let mut loader = ChatConfigLoader::new();
        let missing = Path::new("/nonexistent/nlweb/config.yaml");
        assert!(matches!(
            loader.merge_file(missing),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_env_overrides() {
        let mut loader = ChatConfigLoader::new();
        loader.apply_env_from(|key| match key {
            ENV_ENDPOINT => Some("https://env.example".to_string()),
            ENV_SITE => Some("  ".to_string()),
            ENV_STORAGE_FILE => Some("/tmp/history.json".to_string()),
            _ => None,
        });
        let config = loader.into_config();
        assert_eq!(config.client.endpoint.as_deref(), Some("https://env.example"));
        assert_eq!(config.client.site, None);
        assert_eq!(
            config.storage.resolved_path(),
            PathBuf::from("/tmp/history.json")
        );
    }

    #[test]
    fn test_empty_file_keeps_defaults() {
        let mut loader = ChatConfigLoader::new();
        loader.merge_str("").expect("empty yaml");
        assert_eq!(loader.config().client.mode, "answer");
    }
}
