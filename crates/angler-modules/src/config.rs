//! Per-module settings.
//!
//! Each struct is one section of the settings file. Every field has a
//! default so partial files load.

use angler_protocol::Item;
use serde::{Deserialize, Serialize};

/// Which catches are worth announcing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnounceType {
    #[default]
    All,
    AllButFish,
    Enchanted,
    None,
}

impl AnnounceType {
    /// Returns `true` if `item` should be announced.
    pub fn admits(self, item: &Item) -> bool {
        match self {
            Self::All => true,
            Self::AllButFish => !item.is_fish(),
            Self::Enchanted => item.is_enchanted(),
            Self::None => false,
        }
    }
}

/// `client` section: what the bot tells the server about itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub locale: String,
    pub view_distance: u8,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            locale: "en_US".to_string(),
            view_distance: 2,
        }
    }
}

/// `fishing` section.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FishingConfig {
    pub announce_type_chat: AnnounceType,
}

/// `chat_commands` section.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatCommandConfig {
    pub enabled: bool,
    /// Lines said in chat right after joining.
    pub start_text: Vec<String>,
}

/// `webhook.ping_on_enchantment` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PingConfig {
    pub enabled: bool,
    /// Prepended to alerts, e.g. `<@1234>`.
    pub mention: String,
    /// Item names that trigger a ping; empty means any.
    pub items: Vec<String>,
    /// Upper-case enchantment names that trigger a ping; empty means any.
    pub enchantments: Vec<String>,
}

/// Mention value shipped in a fresh settings file.
pub const PLACEHOLDER_MENTION: &str = "<@USER_ID>";

impl Default for PingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            mention: PLACEHOLDER_MENTION.to_string(),
            items: Vec::new(),
            enchantments: Vec::new(),
        }
    }
}

/// `webhook` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    pub enabled: bool,
    pub url: String,
    pub announce_type: AnnounceType,
    pub alert_on_attack: bool,
    pub alert_on_level_update: bool,
    pub alert_on_respawn: bool,
    pub ping_on_enchantment: PingConfig,
}

impl WebhookConfig {
    /// Returns `true` if `url` is one of the placeholders a fresh settings
    /// file ships with.
    pub fn is_placeholder_url(&self) -> bool {
        let url = self.url.trim();
        url.is_empty() || url.eq_ignore_ascii_case("false") || url == "YOURWEBHOOK"
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: "YOURWEBHOOK".to_string(),
            announce_type: AnnounceType::All,
            alert_on_attack: true,
            alert_on_level_update: true,
            alert_on_respawn: true,
            ping_on_enchantment: PingConfig::default(),
        }
    }
}

/// `auto_loot_ejection` section.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EjectionConfig {
    pub enabled: bool,
    /// Item names dropped as soon as they land in the inventory.
    pub items: Vec<String>,
}
