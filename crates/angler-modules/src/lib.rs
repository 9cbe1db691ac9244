//! Feature modules for Angler.
//!
//! Every module implements [`angler_events::Module`] and talks to the rest
//! of the bot only through events:
//!
//! | module                   | reacts to                         | does                              |
//! |--------------------------|-----------------------------------|-----------------------------------|
//! | [`HandshakeModule`]      | `SessionOpened`                   | sends the handshake               |
//! | [`LoginModule`]          | `SessionOpened`, `Kicked`         | logs in, turns kicks into disconnects |
//! | [`ClientDefaultsModule`] | `JoinGame`, `KeepAlive`, health   | client settings, keep-alive, respawn |
//! | [`FishingModule`]        | bobber and inventory events       | the fishing loop, [`LootHistory`] |
//! | [`ChatProxyModule`]      | chat in and out                   | logs chat, sends chat lines       |
//! | [`ChatCommandModule`]    | chat addressed to the bot         | answers commands                  |
//! | [`WebhookModule`]        | catches, health, level, respawn   | posts to a webhook                |
//! | [`EjectionModule`]       | inventory slot updates            | drops unwanted items              |

mod chat_proxy;
mod client_defaults;
mod command;
mod config;
mod ejection;
mod fishing;
mod handshake;
mod inventory;
mod login;
mod loot;
mod webhook;

pub use chat_proxy::{ChatProxyModule, MAX_CHAT_LEN};
pub use client_defaults::ClientDefaultsModule;
pub use command::{ChatCommand, ChatCommandModule, Direction, addressed_command};
pub use config::{
    AnnounceType, ChatCommandConfig, ClientConfig, EjectionConfig, FishingConfig,
    PLACEHOLDER_MENTION, PingConfig, WebhookConfig,
};
pub use ejection::EjectionModule;
pub use fishing::{BITE_THRESHOLD, FishingModule, FishingStage, announcement};
pub use handshake::HandshakeModule;
pub use inventory::{HOTBAR_START, Inventory, PLAYER_INVENTORY, ROD_DURABILITY, rod_durability};
pub use login::LoginModule;
pub use loot::LootHistory;
pub use webhook::{
    DispatchPool, Embed, EmbedFooter, HttpPoster, WEBHOOK_QUEUE, WEBHOOK_USERNAME,
    WEBHOOK_WORKERS, WebhookError, WebhookMessage, WebhookModule, WebhookPoster,
    catch_embed, item_color,
};
