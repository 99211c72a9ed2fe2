//! # Configuration
//!
//! Server settings are read from a TOML file. Every section and field has a default, so
//! a partial file (or none at all, via [`Config::default`]) is valid.
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0"
//! port = 8000
//! static_dir = "./static"
//!
//! [storage]
//! data_dir = "./data"
//!
//! [game]
//! moves_file = "./data/seeds/moves.json"
//! bosses_file = "./data/seeds/bosses.json"
//! # rng_seed = 42
//!
//! [bot]
//! enabled = false
//! token = ""
//! webapp_url = ""
//! webhook_url = ""                     # public base URL; registered on start when set
//! api_base = "https://api.telegram.org"
//!
//! [logging]
//! level = "info"
//! # file = "bomzh.log"
//! ```
//!
//! Precedence: CLI args > environment (`PORT`, `BOT_TOKEN`, `WEBAPP_URL`, `WEBHOOK_URL`,
//! `DATA_DIR`) > config file > defaults.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::fs;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    /// Directory served for `GET` paths that are not API routes.
    pub static_dir: String,
    /// Largest accepted request body in bytes.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: "0.0.0.0".to_string(),
            port: 8000,
            static_dir: "./static".to_string(),
            max_body_bytes: 64 * 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            data_dir: "./data".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub moves_file: String,
    pub bosses_file: String,
    /// Fixed seed for reproducible battles. Unset means entropy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rng_seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            moves_file: "./data/seeds/moves.json".to_string(),
            bosses_file: "./data/seeds/bosses.json".to_string(),
            rng_seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub enabled: bool,
    /// Bot API token; also the secret path segment of the webhook URL.
    pub token: String,
    /// Public URL of the web client, offered as a button on `/start`.
    pub webapp_url: String,
    /// Public base URL of this server. When set, `<webhook_url>/webhook/<token>` is
    /// registered with the bot API on start.
    pub webhook_url: String,
    pub api_base: String,
    pub api_timeout_secs: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        BotConfig {
            enabled: false,
            token: String::new(),
            webapp_url: String::new(),
            webhook_url: String::new(),
            api_base: "https://api.telegram.org".to_string(),
            api_timeout_secs: 10,
        }
    }
}

impl BotConfig {
    /// The webhook is mounted only when the bot is enabled with a token.
    pub fn webhook_enabled(&self) -> bool {
        self.enabled && !self.token.is_empty()
    }

    /// Registration needs a mounted webhook and a public URL to announce.
    pub fn should_register(&self) -> bool {
        self.webhook_enabled() && !self.webhook_url.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            file: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub game: GameConfig,
    pub bot: BotConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        Ok(config)
    }

    /// Write a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    /// Apply `PORT`, `BOT_TOKEN`, `WEBAPP_URL`, `WEBHOOK_URL` and `DATA_DIR` from the
    /// process environment.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup. Empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(port) = get("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|e| anyhow!("Invalid PORT value {:?}: {}", port, e))?;
        }
        if let Some(token) = get("BOT_TOKEN") {
            self.bot.token = token;
            self.bot.enabled = true;
        }
        if let Some(url) = get("WEBAPP_URL") {
            self.bot.webapp_url = url;
        }
        if let Some(url) = get("WEBHOOK_URL") {
            self.bot.webhook_url = url;
        }
        if let Some(dir) = get("DATA_DIR") {
            self.storage.data_dir = dir;
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.server.bind, self.server.port)
            .parse()
            .map_err(|e| {
                anyhow!(
                    "Invalid listen address {}:{}: {}",
                    self.server.bind,
                    self.server.port,
                    e
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn partial_file_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            port = 9000

            [game]
            rng_seed = 7
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.bind, "0.0.0.0");
        assert_eq!(config.game.rng_seed, Some(7));
        assert_eq!(config.storage, StorageConfig::default());
        assert!(!config.bot.webhook_enabled());
    }

    #[test]
    fn default_config_round_trips_through_toml() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn env_overrides_win_over_file() {
        let mut config = Config::default();
        config
            .apply_overrides(env(&[
                ("PORT", "8443"),
                ("BOT_TOKEN", "123:abc"),
                ("DATA_DIR", "/var/lib/bomzh"),
                ("WEBAPP_URL", ""),
                ("WEBHOOK_URL", "https://bomzh.example"),
            ]))
            .unwrap();
        assert_eq!(config.server.port, 8443);
        assert!(config.bot.webhook_enabled());
        assert!(config.bot.should_register());
        assert_eq!(config.bot.webhook_url, "https://bomzh.example");
        assert_eq!(config.storage.data_dir, "/var/lib/bomzh");
        assert_eq!(config.bot.webapp_url, "");
    }

    #[test]
    fn bad_port_is_rejected() {
        let mut config = Config::default();
        assert!(config.apply_overrides(env(&[("PORT", "eighty")])).is_err());
        assert_eq!(config.server.port, 8000);
    }

    #[tokio::test]
    async fn create_default_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let path = path.to_str().unwrap();
        Config::create_default(path).await.unwrap();
        let loaded = Config::load(path).await.unwrap();
        assert_eq!(loaded, Config::default());
        assert!(loaded.listen_addr().is_ok());
    }
}
