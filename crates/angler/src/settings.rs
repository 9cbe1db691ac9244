//! The settings file.
//!
//! One JSON document, read once when the controller is built. Every section
//! has defaults so a partial file loads, and a missing file is written out
//! with defaults first so the user has something to edit.

use std::path::{Path, PathBuf};
use std::time::Duration;

use angler_modules::{ChatCommandConfig, ClientConfig, EjectionConfig, FishingConfig, WebhookConfig};
use angler_session::{AuthMode, EndpointConfig, RealmSelection};
use serde::{Deserialize, Serialize};

/// Username a fresh settings file ships with. Starting with it is refused.
pub const DEFAULT_USERNAME: &str = "my-minecraft@login.com";

/// Errors reading or writing the settings file.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("settings file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("settings file {} is not valid: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// `server` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Forces a protocol version. `None` uses what the server advertises.
    pub default_protocol: Option<i32>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 25565,
            default_protocol: None,
        }
    }
}

/// `account` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountSettings {
    pub username: String,
    pub online_mode: bool,
}

impl Default for AccountSettings {
    fn default() -> Self {
        Self {
            username: DEFAULT_USERNAME.to_string(),
            online_mode: true,
        }
    }
}

/// `realm` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RealmSettings {
    /// `-1` connects to `server` directly, `0` lists the realms and waits.
    pub id: i64,
    pub accept_tos: bool,
}

impl Default for RealmSettings {
    fn default() -> Self {
        Self {
            id: -1,
            accept_tos: false,
        }
    }
}

/// The whole settings file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub account: AccountSettings,
    pub realm: RealmSettings,
    pub auto_reconnect: bool,
    pub auto_reconnect_secs: u64,
    pub log_count: usize,
    pub client: ClientConfig,
    pub fishing: FishingConfig,
    pub chat_commands: ChatCommandConfig,
    pub webhook: WebhookConfig,
    pub auto_loot_ejection: EjectionConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            account: AccountSettings::default(),
            realm: RealmSettings::default(),
            auto_reconnect: true,
            auto_reconnect_secs: 3,
            log_count: 10,
            client: ClientConfig::default(),
            fishing: FishingConfig::default(),
            chat_commands: ChatCommandConfig::default(),
            webhook: WebhookConfig::default(),
            auto_loot_ejection: EjectionConfig::default(),
        }
    }
}

impl Settings {
    /// Loads `path`, writing a default file there first if none exists.
    ///
    /// # Errors
    /// [`SettingsError::Io`] if the file can't be read or created,
    /// [`SettingsError::Parse`] if it isn't a settings document.
    pub fn load_or_create(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!(path = %path.display(), "settings-created");
            Self::default().save(path)?;
        }
        Self::load(path)
    }

    /// Loads `path`.
    ///
    /// # Errors
    /// See [`load_or_create`](Self::load_or_create).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Writes the settings as pretty JSON.
    ///
    /// # Errors
    /// [`SettingsError::Io`] if the file can't be written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        let path = path.as_ref();
        let io = |source: std::io::Error| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        };
        let json = serde_json::to_string_pretty(self).map_err(|e| io(e.into()))?;
        std::fs::write(path, json).map_err(io)
    }

    /// Returns `true` if the account username was never changed.
    pub fn has_default_credentials(&self) -> bool {
        let username = self.account.username.trim();
        username.is_empty() || username == DEFAULT_USERNAME
    }

    pub fn auth_mode(&self) -> AuthMode {
        AuthMode::from_online_flag(self.account.online_mode)
    }

    pub fn endpoint_config(&self) -> EndpointConfig {
        EndpointConfig {
            host: self.server.host.clone(),
            port: self.server.port,
            realm: RealmSelection::from_id(self.realm.id),
            accept_tos: self.realm.accept_tos,
        }
    }

    /// Pause between two connection attempts.
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.auto_reconnect_secs)
    }
}
