//! Which modules a session runs, in which order.
//!
//! The plan is a table evaluated once per connect. The five core modules
//! always run; the optional ones are gated by their own settings flag.

use angler_events::{Module, ModuleKey};
use angler_modules::{
    ChatCommandModule, ChatProxyModule, ClientDefaultsModule, EjectionModule, FishingModule,
    HandshakeModule, LoginModule, LootHistory, WebhookModule,
};

use crate::Settings;

/// What the constructors get to build from.
pub struct PlanInputs<'a> {
    pub settings: &'a Settings,
    /// Display name of the resolved identity.
    pub username: &'a str,
    /// History carried over from the previous session. Taken by the
    /// fishing module.
    pub loot: LootHistory,
}

/// One row of the plan.
pub struct PlanEntry {
    pub key: ModuleKey,
    pub enabled: fn(&Settings) -> bool,
    pub build: fn(&mut PlanInputs<'_>) -> Box<dyn Module>,
}

fn always(_: &Settings) -> bool {
    true
}

fn chat_commands_enabled(settings: &Settings) -> bool {
    settings.chat_commands.enabled
}

fn webhook_enabled(settings: &Settings) -> bool {
    settings.webhook.enabled
}

fn ejection_enabled(settings: &Settings) -> bool {
    settings.auto_loot_ejection.enabled
}

fn handshake(_: &mut PlanInputs<'_>) -> Box<dyn Module> {
    Box::new(HandshakeModule)
}

fn login(inputs: &mut PlanInputs<'_>) -> Box<dyn Module> {
    Box::new(LoginModule::new(inputs.username))
}

fn client_defaults(inputs: &mut PlanInputs<'_>) -> Box<dyn Module> {
    Box::new(ClientDefaultsModule::new(inputs.settings.client.clone()))
}

fn fishing(inputs: &mut PlanInputs<'_>) -> Box<dyn Module> {
    let loot = std::mem::take(&mut inputs.loot);
    Box::new(FishingModule::new(&inputs.settings.fishing, loot))
}

fn chat_proxy(_: &mut PlanInputs<'_>) -> Box<dyn Module> {
    Box::new(ChatProxyModule)
}

fn chat_command(inputs: &mut PlanInputs<'_>) -> Box<dyn Module> {
    Box::new(ChatCommandModule::new(&inputs.settings.chat_commands, inputs.username))
}

fn webhook(inputs: &mut PlanInputs<'_>) -> Box<dyn Module> {
    Box::new(<WebhookModule>::new(inputs.settings.webhook.clone(), inputs.username))
}

fn ejection(inputs: &mut PlanInputs<'_>) -> Box<dyn Module> {
    Box::new(EjectionModule::new(inputs.settings.auto_loot_ejection.clone()))
}

/// The module plan, in enable order.
pub const MODULE_PLAN: &[PlanEntry] = &[
    PlanEntry { key: HandshakeModule::KEY, enabled: always, build: handshake },
    PlanEntry { key: LoginModule::KEY, enabled: always, build: login },
    PlanEntry { key: ClientDefaultsModule::KEY, enabled: always, build: client_defaults },
    PlanEntry { key: FishingModule::KEY, enabled: always, build: fishing },
    PlanEntry { key: ChatProxyModule::KEY, enabled: always, build: chat_proxy },
    PlanEntry { key: ChatCommandModule::KEY, enabled: chat_commands_enabled, build: chat_command },
    PlanEntry { key: <WebhookModule>::KEY, enabled: webhook_enabled, build: webhook },
    PlanEntry { key: EjectionModule::KEY, enabled: ejection_enabled, build: ejection },
];

/// Builds the modules `settings` asks for, in plan order.
pub fn build_modules(settings: &Settings, username: &str, loot: LootHistory) -> Vec<Box<dyn Module>> {
    let mut inputs = PlanInputs { settings, username, loot };
    MODULE_PLAN
        .iter()
        .filter(|entry| (entry.enabled)(settings))
        .map(|entry| (entry.build)(&mut inputs))
        .collect()
}
