//! Layered configuration for Quickboard.
//!
//! Values come from `quickboard.toml` (if present), then environment
//! variables (a `.env` file is loaded first), then CLI flags applied by the
//! caller.
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! port = 3141
//! db_path = ".quickboard/board.db"
//! secret_key = "change-me"
//! token_ttl_hours = 24
//!
//! [client]
//! server_url = "http://127.0.0.1:3141"
//! debounce_ms = 1000
//! request_timeout_secs = 10
//! session_file = "/home/me/.config/quickboard/session.json"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE_NAME: &str = "quickboard.toml";

/// Secret used when none is configured. Fine for local use only.
const DEFAULT_SECRET_KEY: &str = "default-secret-key";

/// Board service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    #[serde(default = "default_secret_key")]
    pub secret_key: String,
    /// Lifetime of issued session tokens
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
}

/// Client-side sync settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSettings {
    #[serde(default = "default_server_url")]
    pub server_url: String,
    /// Quiet period after the last edit before the board is saved
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Where the session credential is kept (defaults to the user config dir)
    #[serde(default)]
    pub session_file: Option<PathBuf>,
}

fn default_port() -> u16 {
    3141
}

fn default_db_path() -> PathBuf {
    PathBuf::from(".quickboard/board.db")
}

fn default_secret_key() -> String {
    DEFAULT_SECRET_KEY.to_string()
}

fn default_token_ttl_hours() -> i64 {
    24
}

fn default_server_url() -> String {
    format!("http://127.0.0.1:{}", default_port())
}

fn default_debounce_ms() -> u64 {
    1000
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: default_port(),
            db_path: default_db_path(),
            secret_key: default_secret_key(),
            token_ttl_hours: default_token_ttl_hours(),
        }
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            debounce_ms: default_debounce_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            session_file: None,
        }
    }
}

impl ClientSettings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn session_file(&self) -> PathBuf {
        self.session_file.clone().unwrap_or_else(default_session_file)
    }
}

fn default_session_file() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("quickboard")
        .join("session.json")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuickboardConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub client: ClientSettings,
}

impl QuickboardConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse quickboard.toml")
    }

    /// Load `quickboard.toml` from `dir` if it exists, otherwise defaults,
    /// then apply environment overrides.
    pub fn discover(dir: &Path) -> Result<Self> {
        let _ = dotenvy::dotenv();
        let path = dir.join(CONFIG_FILE_NAME);
        let mut config = if path.exists() {
            Self::load(&path)?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `QUICKBOARD_*` overrides. `lookup` is injectable for tests.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("QUICKBOARD_PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("Invalid QUICKBOARD_PORT '{}'", port))?;
        }
        if let Some(path) = lookup("QUICKBOARD_DB_PATH") {
            self.server.db_path = PathBuf::from(path);
        }
        if let Some(secret) = lookup("QUICKBOARD_SECRET_KEY") {
            self.server.secret_key = secret;
        }
        if let Some(url) = lookup("QUICKBOARD_SERVER_URL") {
            self.client.server_url = url;
        }
        if let Some(ms) = lookup("QUICKBOARD_DEBOUNCE_MS") {
            self.client.debounce_ms = ms
                .parse()
                .with_context(|| format!("Invalid QUICKBOARD_DEBOUNCE_MS '{}'", ms))?;
        }
        if let Some(path) = lookup("QUICKBOARD_SESSION_FILE") {
            self.client.session_file = Some(PathBuf::from(path));
        }
        Ok(())
    }

    /// Warnings about settings that work but are probably unintended.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.server.secret_key == DEFAULT_SECRET_KEY {
            warnings.push(
                "server.secret_key is the built-in default; set QUICKBOARD_SECRET_KEY".to_string(),
            );
        }
        if self.server.token_ttl_hours <= 0 {
            warnings.push("server.token_ttl_hours must be positive".to_string());
        }
        if self.client.debounce_ms == 0 {
            warnings.push("client.debounce_ms = 0 saves after every edit".to_string());
        }
        warnings
    }
}
