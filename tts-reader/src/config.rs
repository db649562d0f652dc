//! tts-reader configuration management.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

// Defaults match the reader service's own
const DEFAULT_SERVER_URL: &str = "http://localhost:2022";
const DEFAULT_VOICE: &str = "af_bella";
const DEFAULT_CHAPTER_DELAY_MS: u64 = 2000;
const DEFAULT_FINALIZE_DELAY_MS: u64 = 1000;
const DEFAULT_MAX_UPLOAD_MB: u64 = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Base URL of the reader service
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Voice used for synthesis
    #[serde(default = "default_voice")]
    pub voice: String,

    /// Simulated progress delay per chapter (milliseconds)
    #[serde(default = "default_chapter_delay_ms")]
    pub chapter_delay_ms: u64,

    /// Pause after the last chapter step (milliseconds)
    #[serde(default = "default_finalize_delay_ms")]
    pub finalize_delay_ms: u64,

    /// Whole-request timeout; synthesis of a long book takes a while
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Largest document accepted for upload (MB)
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: u64,

    /// Where downloads go. None means the user's download directory.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

fn default_server_url() -> String {
    DEFAULT_SERVER_URL.to_string()
}

fn default_voice() -> String {
    DEFAULT_VOICE.to_string()
}

fn default_chapter_delay_ms() -> u64 {
    DEFAULT_CHAPTER_DELAY_MS
}

fn default_finalize_delay_ms() -> u64 {
    DEFAULT_FINALIZE_DELAY_MS
}

fn default_request_timeout_secs() -> u64 {
    600
}

fn default_max_upload_mb() -> u64 {
    DEFAULT_MAX_UPLOAD_MB
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            voice: default_voice(),
            chapter_delay_ms: default_chapter_delay_ms(),
            finalize_delay_ms: default_finalize_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            max_upload_mb: default_max_upload_mb(),
            output_dir: None,
        }
    }
}

impl ReaderConfig {
    /// Get the config file path: ~/.config/cli-programs/tts-reader.toml
    pub fn config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("cli-programs")
            .join("tts-reader.toml"))
    }

    /// Load config from file, returning default if file doesn't exist
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        let config: ReaderConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    pub fn chapter_delay(&self) -> Duration {
        Duration::from_millis(self.chapter_delay_ms)
    }

    pub fn finalize_delay(&self) -> Duration {
        Duration::from_millis(self.finalize_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_mb * 1024 * 1024
    }

    /// Resolve the download directory: explicit, configured, then the
    /// platform download dir, then the working directory.
    pub fn resolve_output_dir(&self, explicit: Option<&PathBuf>) -> PathBuf {
        explicit
            .cloned()
            .or_else(|| self.output_dir.clone())
            .or_else(dirs::download_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}
