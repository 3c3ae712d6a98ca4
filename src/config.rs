use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ScribeConfig {
    pub agent: AgentConfig,
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AgentConfig {
    /// Display name of the agent, used in prompts and the monitoring API.
    pub name: String,
    /// How many chunks the researcher pulls from the knowledge base per tick.
    pub research_chunks: usize,
    /// Seconds to sleep between ticks.
    pub sleep_secs: u64,
    /// Characters per chunk window.
    pub chunk_size: usize,
    /// Characters shared between consecutive chunk windows.
    pub chunk_overlap: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory of source `.txt`/`.md` documents.
    pub corpus_dir: String,
    /// Path of the sqlite chunk-index database.
    pub index_db_path: String,
    /// Directory where journal notes are written.
    pub notes_dir: String,
    /// Directory where per-session life logs are written.
    pub life_log_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub model: String,
    pub cache_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub request_timeout_secs: u64,
}

impl Default for ScribeConfig {
    fn default() -> Self {
        Self {
            agent: AgentConfig::default(),
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            embedding: EmbeddingConfig::default(),
            llm: LlmConfig::default(),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "Scribby".into(),
            research_chunks: 5,
            sleep_secs: 5,
            chunk_size: 512,
            chunk_overlap: 50,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8000,
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let base = default_scribe_dir();
        Self {
            corpus_dir: base.join("corpus").to_string_lossy().into_owned(),
            index_db_path: base.join("index.db").to_string_lossy().into_owned(),
            notes_dir: base.join("notes").to_string_lossy().into_owned(),
            life_log_dir: base.join("life_log").to_string_lossy().into_owned(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        let cache_dir = default_scribe_dir()
            .join("models")
            .to_string_lossy()
            .into_owned();
        Self {
            provider: "local".into(),
            model: "all-MiniLM-L6-v2".into(),
            cache_dir,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".into(),
            model: "phi3:mini".into(),
            request_timeout_secs: 120,
        }
    }
}

/// Returns `~/.scribe/`
pub fn default_scribe_dir() -> PathBuf {
    dirs::home_dir()
        .expect("home directory must exist")
        .join(".scribe")
}

/// Returns the default config file path: `~/.scribe/config.toml`
pub fn default_config_path() -> PathBuf {
    default_scribe_dir().join("config.toml")
}

impl ScribeConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            ScribeConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (SCRIBE_CORPUS, SCRIBE_OLLAMA_URL,
    /// SCRIBE_LOG_LEVEL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("SCRIBE_CORPUS") {
            self.storage.corpus_dir = val;
        }
        if let Ok(val) = std::env::var("SCRIBE_OLLAMA_URL") {
            self.llm.base_url = val;
        }
        if let Ok(val) = std::env::var("SCRIBE_LOG_LEVEL") {
            self.server.log_level = val;
        }
    }

    pub fn corpus_dir(&self) -> PathBuf {
        expand_tilde(&self.storage.corpus_dir)
    }

    pub fn notes_dir(&self) -> PathBuf {
        expand_tilde(&self.storage.notes_dir)
    }

    pub fn life_log_dir(&self) -> PathBuf {
        expand_tilde(&self.storage.life_log_dir)
    }

    /// Resolve the index database path, expanding `~` if needed.
    pub fn resolved_index_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.index_db_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .expect("home directory must exist")
            .join(rest)
    } else {
        PathBuf::from(path)
    }
}
