//! Webhook notifications: catches and alerts posted to a chat service.
//!
//! Posting is slow and may fail, and the receive loop must never wait on
//! it. The module only builds [`WebhookMessage`]s and submits them to a
//! [`DispatchPool`]: a bounded queue drained by a fixed number of worker
//! tasks. When the queue is full new messages are dropped with a warning.
//! Workers only ever see finished messages, never module state.
//!
//! The mention ping only looks at its own item and enchantment filters:
//! with both filters empty every catch pings, enchanted or not. The first
//! experience update of a session counts as a level change and is
//! announced; the first health update only sets the baseline.

use std::any::Any;
use std::future::Future;
use std::sync::Arc;

use angler_events::{EventContext, ListenerError, Module, ModuleError, ModuleKey};
use angler_protocol::{Event, EventKind, Item};
use serde::Serialize;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

use crate::{Inventory, PLACEHOLDER_MENTION, ROD_DURABILITY, WebhookConfig, rod_durability};

/// Messages waiting to be posted before new ones are dropped.
pub const WEBHOOK_QUEUE: usize = 64;

/// Concurrent posts.
pub const WEBHOOK_WORKERS: usize = 2;

/// Display name the messages are posted under.
pub const WEBHOOK_USERNAME: &str = "Angler";

// ---------------------------------------------------------------------------
// Message format
// ---------------------------------------------------------------------------

/// One webhook post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookMessage {
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
}

impl WebhookMessage {
    /// A plain text message.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            username: WEBHOOK_USERNAME.to_string(),
            content: Some(content.into()),
            embeds: Vec::new(),
        }
    }

    /// A message carrying one embed.
    pub fn embed(embed: Embed) -> Self {
        Self {
            username: WEBHOOK_USERNAME.to_string(),
            content: None,
            embeds: vec![embed],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Embed {
    pub title: String,
    pub color: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedFooter {
    pub text: String,
}

/// Embed colour for a catch, by item class.
pub fn item_color(item: &Item) -> u32 {
    if item.is_enchanted() {
        return 0x6a01fb;
    }
    match item.name.as_str() {
        "nametag" | "name_tag" => 0xf5e4bc,
        "leather" | "saddle" => 0xda652a,
        "bowl" | "stick" | "fishing_rod" | "leather_boots" | "rotten_flesh"
        | "tripwire_hook" | "bow" => 0x70402e,
        "string" | "bone" => 0xe0e0e2,
        "ink_sac" => 0x2c2c2d,
        "lily_pad" => 0x18661f,
        "bamboo" => 0x21a021,
        _ => 0x3ac8e7,
    }
}

/// The embed posted for a catch. `rod` is the rod in hand, if known.
pub fn catch_embed(item: &Item, bot_name: &str, rod: Option<&Item>) -> Embed {
    let description = item.is_enchanted().then(|| {
        let mut text = String::from("**Enchantments:**\n");
        for enchantment in &item.enchantments {
            text.push_str(&enchantment.name.to_uppercase());
            if enchantment.level > 1 {
                text.push(' ');
                text.push_str(&enchantment.roman_level());
            }
            text.push('\n');
        }
        text
    });
    Embed {
        title: format!("**{}**", item.display_name()),
        color: item_color(item),
        description,
        footer: Some(EmbedFooter {
            text: match rod {
                Some(rod) => format!(
                    "Fishing Rod Durability: {}/{ROD_DURABILITY}  ●  {bot_name}",
                    rod_durability(rod)
                ),
                None => bot_name.to_string(),
            },
        }),
    }
}

/// Formats health with at most two decimals: `7.5`, `3`, `0.33`.
fn format_health(health: f32) -> String {
    let text = format!("{health:.2}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

// ---------------------------------------------------------------------------
// Posting
// ---------------------------------------------------------------------------

/// A post failed.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webhook rejected the message ({status})")]
    Status { status: u16 },
}

/// Delivers a message to a webhook URL.
pub trait WebhookPoster: Send + Sync + 'static {
    fn post(
        &self,
        url: &str,
        message: &WebhookMessage,
    ) -> impl Future<Output = Result<(), WebhookError>> + Send;
}

/// Posts JSON over HTTPS.
#[derive(Debug, Clone, Default)]
pub struct HttpPoster {
    client: reqwest::Client,
}

impl HttpPoster {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WebhookPoster for HttpPoster {
    async fn post(&self, url: &str, message: &WebhookMessage) -> Result<(), WebhookError> {
        let resp = self.client.post(url).json(message).send().await?;
        if !resp.status().is_success() {
            return Err(WebhookError::Status {
                status: resp.status().as_u16(),
            });
        }
        Ok(())
    }
}

/// Bounded fire-and-forget queue with a fixed set of worker tasks.
///
/// Dropping the pool closes the queue; workers finish what is already
/// queued and exit.
pub struct DispatchPool {
    tx: mpsc::Sender<WebhookMessage>,
    workers: Vec<JoinHandle<()>>,
}

impl DispatchPool {
    /// Spawns `workers` tasks posting to `url`. Must be called inside a
    /// tokio runtime.
    pub fn spawn<P: WebhookPoster>(
        poster: Arc<P>,
        url: String,
        queue: usize,
        workers: usize,
    ) -> Self {
        let (tx, rx) = mpsc::channel(queue.max(1));
        let rx = Arc::new(Mutex::new(rx));
        let url: Arc<str> = url.into();
        let workers = (0..workers.max(1))
            .map(|worker| {
                let rx = Arc::clone(&rx);
                let poster = Arc::clone(&poster);
                let url = Arc::clone(&url);
                tokio::spawn(async move {
                    loop {
                        let next = rx.lock().await.recv().await;
                        let Some(message) = next else { break };
                        if let Err(e) = poster.post(&url, &message).await {
                            tracing::warn!(worker, error = %e, "webhook-post-failed");
                        }
                    }
                })
            })
            .collect();
        Self { tx, workers }
    }

    /// Queues a message. Returns `false` if it was dropped.
    pub fn submit(&self, message: WebhookMessage) -> bool {
        match self.tx.try_send(message) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!("webhook-queue-full");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Number of worker tasks.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }
}

// ---------------------------------------------------------------------------
// WebhookModule
// ---------------------------------------------------------------------------

/// Posts catches and alerts to a webhook.
///
/// With a placeholder URL the module still enables but stays inert.
pub struct WebhookModule<P: WebhookPoster = HttpPoster> {
    config: WebhookConfig,
    poster: Arc<P>,
    bot_name: String,
    pool: Option<DispatchPool>,
    health: Option<f32>,
    level: Option<i32>,
    inventory: Inventory,
}

impl WebhookModule<HttpPoster> {
    pub fn new(config: WebhookConfig, bot_name: impl Into<String>) -> Self {
        Self::with_poster(config, bot_name, HttpPoster::new())
    }
}

impl<P: WebhookPoster> WebhookModule<P> {
    pub const KEY: ModuleKey = ModuleKey::new("webhook");

    pub fn with_poster(config: WebhookConfig, bot_name: impl Into<String>, poster: P) -> Self {
        Self {
            config,
            poster: Arc::new(poster),
            bot_name: bot_name.into(),
            pool: None,
            health: None,
            level: None,
            inventory: Inventory::new(),
        }
    }

    /// Returns `true` when nothing will be posted.
    pub fn is_inert(&self) -> bool {
        self.pool.is_none()
    }

    fn submit(&self, message: WebhookMessage) {
        if let Some(pool) = &self.pool {
            pool.submit(message);
        }
    }

    /// `"<mention> "`, or nothing while the mention is still the placeholder.
    fn mention_prefix(&self) -> String {
        let mention = self.config.ping_on_enchantment.mention.trim();
        if mention.is_empty() || mention == PLACEHOLDER_MENTION {
            String::new()
        } else {
            format!("{mention} ")
        }
    }

    fn should_ping(&self, item: &Item) -> bool {
        let ping = &self.config.ping_on_enchantment;
        if !ping.enabled {
            return false;
        }
        let item_matches = ping.items.is_empty() || ping.items.contains(&item.name);
        let enchantment_matches = ping.enchantments.is_empty()
            || item
                .enchantments
                .iter()
                .any(|e| ping.enchantments.contains(&e.name.to_uppercase()));
        item_matches && enchantment_matches
    }
}

impl<P: WebhookPoster> Module for WebhookModule<P> {
    fn key(&self) -> ModuleKey {
        Self::KEY
    }

    fn interests(&self) -> &'static [EventKind] {
        &[
            EventKind::LoginSuccess,
            EventKind::FishCaught,
            EventKind::UpdateHealth,
            EventKind::UpdateExperience,
            EventKind::Respawned,
            EventKind::SetSlot,
            EventKind::HeldItemChange,
        ]
    }

    fn activate(&mut self) -> Result<(), ModuleError> {
        if self.config.is_placeholder_url() {
            tracing::warn!(url = %self.config.url, "webhook-url-not-set");
            return Ok(());
        }
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(ModuleError::ActivationFailed {
                module: Self::KEY,
                reason: "no async runtime for the dispatch pool".into(),
            });
        }
        self.pool = Some(DispatchPool::spawn(
            Arc::clone(&self.poster),
            self.config.url.clone(),
            WEBHOOK_QUEUE,
            WEBHOOK_WORKERS,
        ));
        Ok(())
    }

    fn deactivate(&mut self) {
        self.pool = None;
    }

    fn handle(&mut self, event: &Event, _ctx: &mut EventContext) -> Result<(), ListenerError> {
        match event {
            Event::LoginSuccess { username, .. } => self.bot_name = username.clone(),
            Event::FishCaught { item } => {
                if self.should_ping(item) {
                    self.submit(WebhookMessage::text(
                        self.config.ping_on_enchantment.mention.clone(),
                    ));
                }
                if self.config.announce_type.admits(item) {
                    self.submit(WebhookMessage::embed(catch_embed(
                        item,
                        &self.bot_name,
                        self.inventory.held_rod(),
                    )));
                }
            }
            Event::SetSlot { .. } | Event::HeldItemChange { .. } => self.inventory.observe(event),
            Event::UpdateHealth { health, .. } => {
                if self.config.alert_on_attack && self.health.is_some_and(|h| h > *health) {
                    self.submit(WebhookMessage::text(format!(
                        "{}Damage taken! Health: {}",
                        self.mention_prefix(),
                        format_health(*health)
                    )));
                }
                self.health = Some(*health);
            }
            Event::UpdateExperience { level, .. } => {
                if self.config.alert_on_level_update && self.level != Some(*level) {
                    self.submit(WebhookMessage::text(format!("Level up! Now level {level}")));
                }
                self.level = Some(*level);
            }
            Event::Respawned if self.config.alert_on_respawn => {
                self.submit(WebhookMessage::text(format!(
                    "{}The bot died and respawned",
                    self.mention_prefix()
                )));
            }
            _ => {}
        }
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
