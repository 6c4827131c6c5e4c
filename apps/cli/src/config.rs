//! Client configuration management.
//!
//! Configuration is stored as TOML:
//! - Linux: `~/.config/roomcast/client.toml`
//! - Windows: `%APPDATA%/roomcast/client.toml`

use std::path::{Path, PathBuf};

use roomcast_client::SessionOptions;
use roomcast_protocol::constants::{DEFAULT_CHUNK_SIZE, MAX_PAYLOAD_SIZE};
use serde::{Deserialize, Serialize};

/// Environment variable overriding [`Config::username`].
pub const ENV_USERNAME: &str = "ROOMCAST_USERNAME";

/// Environment variable overriding [`Config::server_url`].
pub const ENV_SERVER_URL: &str = "ROOMCAST_SERVER_URL";

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// WebSocket URL of the chat server.
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Name announced at login and used as the transfer sender.
    #[serde(default = "default_username")]
    pub username: String,

    /// Raw bytes per outbound chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Largest file that will be sent.
    #[serde(default = "default_max_payload_size")]
    pub max_payload_size: usize,

    /// Where received payloads are written.
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
}

fn default_server_url() -> String {
    "ws://127.0.0.1:8080/chat".into()
}

fn default_username() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "guest".into())
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_max_payload_size() -> usize {
    MAX_PAYLOAD_SIZE
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("roomcast-downloads")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            username: default_username(),
            chunk_size: default_chunk_size(),
            max_payload_size: default_max_payload_size(),
            download_dir: default_download_dir(),
        }
    }
}

impl Config {
    /// Loads configuration from disk, or creates a default if not found.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&config_path()?)
    }

    fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    /// Applies `ROOMCAST_USERNAME` / `ROOMCAST_SERVER_URL` from `lookup`.
    /// Empty values are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(username) = lookup(ENV_USERNAME).filter(|v| !v.trim().is_empty()) {
            self.username = username;
        }
        if let Some(url) = lookup(ENV_SERVER_URL).filter(|v| !v.trim().is_empty()) {
            self.server_url = url;
        }
    }

    /// Transfer options for the client session.
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            chunk_size: self.chunk_size,
            max_payload: self.max_payload_size,
        }
    }
}

/// Returns the platform-specific configuration file path.
fn config_path() -> anyhow::Result<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        Ok(PathBuf::from(appdata).join("roomcast").join("client.toml"))
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        Ok(PathBuf::from(home)
            .join(".config")
            .join("roomcast")
            .join("client.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert!(config.server_url.starts_with("ws://"));
        assert!(!config.username.is_empty());
        assert_eq!(config.chunk_size, 32 * 1024);
        assert_eq!(config.max_payload_size, 30 * 1024 * 1024);
    }

    #[test]
    fn config_partial_toml() {
        let config: Config = toml::from_str(r#"username = "ana""#).unwrap();
        assert_eq!(config.username, "ana");
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(config.download_dir, PathBuf::from("roomcast-downloads"));
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = Config {
            server_url: "wss://chat.example.org/ws".into(),
            username: "bo".into(),
            chunk_size: 1024,
            max_payload_size: 4096,
            download_dir: PathBuf::from("/srv/audio"),
        };
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn load_creates_default_when_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("client.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn save_and_load() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("client.toml");

        let config = Config {
            username: "SaveTest".into(),
            ..Config::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().username, "SaveTest");
    }

    #[test]
    fn env_overrides() {
        let mut config = Config::default();
        config.apply_env_overrides(|key| match key {
            ENV_USERNAME => Some("cy".into()),
            ENV_SERVER_URL => Some("ws://10.0.0.2:9000/chat".into()),
            _ => None,
        });
        assert_eq!(config.username, "cy");
        assert_eq!(config.server_url, "ws://10.0.0.2:9000/chat");
    }

    #[test]
    fn empty_env_override_is_ignored() {
        let mut config = Config {
            username: "ana".into(),
            ..Config::default()
        };
        config.apply_env_overrides(|_| Some(String::new()));
        assert_eq!(config.username, "ana");
    }

    #[test]
    fn session_options_follow_config() {
        let config = Config {
            chunk_size: 10,
            max_payload_size: 20,
            ..Config::default()
        };
        let options = config.session_options();
        assert_eq!(options.chunk_size, 10);
        assert_eq!(options.max_payload, 20);
    }

    #[test]
    fn config_path_not_empty() {
        let path = config_path().unwrap();
        assert!(path.to_string_lossy().contains("roomcast"));
    }
}
