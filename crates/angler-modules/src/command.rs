//! Chat commands: other players talk to the bot by name.
//!
//! A command is a chat line containing `<bot-name>, <command> [args]`,
//! e.g. `<Alex> Angler, look north`. Answers go back out through
//! `ChatOutgoing`.

use std::any::Any;

use angler_events::{EventContext, ListenerError, Module, ModuleKey};
use angler_protocol::{Event, EventKind, Packet};

use crate::{ChatCommandConfig, Inventory, LootHistory};

/// Commands the bot understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatCommand {
    Help,
    Level,
    Empty,
    Bye,
    Stuck,
    DropRod,
    Look,
    Summary,
}

impl ChatCommand {
    pub const ALL: [ChatCommand; 8] = [
        Self::Help,
        Self::Level,
        Self::Empty,
        Self::Bye,
        Self::Stuck,
        Self::DropRod,
        Self::Look,
        Self::Summary,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Help => "help",
            Self::Level => "level",
            Self::Empty => "empty",
            Self::Bye => "bye",
            Self::Stuck => "stuck",
            Self::DropRod => "droprod",
            Self::Look => "look",
            Self::Summary => "summary",
        }
    }

    fn parse(word: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name().eq_ignore_ascii_case(word))
    }
}

/// Compass direction for `look`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Self::North, Self::East, Self::South, Self::West];

    pub fn name(self) -> &'static str {
        match self {
            Self::North => "north",
            Self::East => "east",
            Self::South => "south",
            Self::West => "west",
        }
    }

    pub fn yaw(self) -> f32 {
        match self {
            Self::North => 180.0,
            Self::East => -90.0,
            Self::South => 0.0,
            Self::West => 90.0,
        }
    }

    fn parse(word: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.name().eq_ignore_ascii_case(word))
    }
}

const LOOK_USAGE: &str = "Usage: look <north|east|south|west|yaw> [pitch]";

/// Parses `look` arguments into `(yaw, pitch)`.
fn look_target<'a>(mut args: impl Iterator<Item = &'a str>) -> Option<(f32, f32)> {
    let first = args.next()?;
    let yaw = match Direction::parse(first) {
        Some(direction) => direction.yaw(),
        None => first.parse::<f32>().ok().filter(|y| y.is_finite())?,
    };
    let pitch = match args.next() {
        Some(word) => word.parse::<f32>().ok().filter(|p| p.is_finite())?,
        None => 0.0,
    };
    Some((yaw, pitch.clamp(-90.0, 90.0)))
}

/// Extracts the command text addressed to `bot_name` from a chat line.
///
/// The name must start a word, so `NotAngler, bye` is not addressed to
/// `Angler`. Returns everything after `"<bot_name>, "`, trimmed, or `None`
/// if the line isn't addressed to the bot.
pub fn addressed_command<'a>(message: &'a str, bot_name: &str) -> Option<&'a str> {
    let prefix = format!("{bot_name}, ");
    let mut from = 0;
    while let Some(found) = message[from..].find(&prefix) {
        let start = from + found;
        let starts_word = message[..start]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric() && c != '_');
        if starts_word {
            let rest = message[start + prefix.len()..].trim();
            return (!rest.is_empty()).then_some(rest);
        }
        from = start + prefix.len();
    }
    None
}

/// Answers chat commands and says the configured start text on join.
#[derive(Debug)]
pub struct ChatCommandModule {
    bot_name: String,
    start_text: Vec<String>,
    level: Option<i32>,
    session_loot: LootHistory,
    inventory: Inventory,
}

impl ChatCommandModule {
    pub const KEY: ModuleKey = ModuleKey::new("chat-command");

    pub fn new(config: &ChatCommandConfig, bot_name: impl Into<String>) -> Self {
        Self {
            bot_name: bot_name.into(),
            start_text: config.start_text.clone(),
            level: None,
            session_loot: LootHistory::new(),
            inventory: Inventory::new(),
        }
    }

    fn say(ctx: &mut EventContext, text: impl Into<String>) {
        ctx.emit(Event::ChatOutgoing { text: text.into() });
    }

    fn run<'a>(
        &self,
        command: ChatCommand,
        args: impl Iterator<Item = &'a str>,
        ctx: &mut EventContext,
    ) {
        tracing::info!(command = command.name(), "chat-command");
        match command {
            ChatCommand::Help => {
                let names: Vec<&str> = ChatCommand::ALL.iter().map(|c| c.name()).collect();
                Self::say(ctx, format!("Commands: {}", names.join(", ")));
            }
            ChatCommand::Level => match self.level {
                Some(level) => Self::say(ctx, format!("I am level {level}")),
                None => Self::say(ctx, "I don't know my level yet"),
            },
            ChatCommand::Summary => {
                if self.session_loot.is_empty() {
                    Self::say(ctx, "Nothing caught yet");
                } else {
                    let parts: Vec<String> = self
                        .session_loot
                        .summary()
                        .into_iter()
                        .map(|(name, count)| format!("{count}x {name}"))
                        .collect();
                    Self::say(
                        ctx,
                        format!("Caught {} items: {}", self.session_loot.len(), parts.join(", ")),
                    );
                }
            }
            ChatCommand::Stuck => {
                Self::say(ctx, "Recasting");
                ctx.emit(Event::RecastRequested);
            }
            ChatCommand::Bye => {
                Self::say(ctx, "Bye!");
                ctx.stop("bye command");
            }
            ChatCommand::Empty => {
                let slots = self.inventory.droppable_slots();
                if slots.is_empty() {
                    Self::say(ctx, "My inventory is already empty");
                    return;
                }
                Self::say(ctx, format!("Dropping {} stacks", slots.len()));
                for slot in slots {
                    ctx.send(Packet::DropSlot {
                        slot,
                        whole_stack: true,
                    });
                }
            }
            ChatCommand::DropRod => {
                if self.inventory.held_rod().is_none() {
                    Self::say(ctx, "I'm not holding a rod");
                    return;
                }
                Self::say(ctx, "Dropping my rod");
                ctx.send(Packet::DropSlot {
                    slot: self.inventory.held_slot(),
                    whole_stack: true,
                });
            }
            ChatCommand::Look => match look_target(args) {
                Some((yaw, pitch)) => {
                    Self::say(ctx, format!("Looking at yaw {yaw}, pitch {pitch}"));
                    ctx.send(Packet::PlayerLook { yaw, pitch });
                    ctx.emit(Event::RecastRequested);
                }
                None => Self::say(ctx, LOOK_USAGE),
            },
        }
    }
}

impl Module for ChatCommandModule {
    fn key(&self) -> ModuleKey {
        Self::KEY
    }

    fn interests(&self) -> &'static [EventKind] {
        &[
            EventKind::LoginSuccess,
            EventKind::JoinGame,
            EventKind::ChatReceived,
            EventKind::UpdateExperience,
            EventKind::FishCaught,
            EventKind::SetSlot,
            EventKind::HeldItemChange,
        ]
    }

    fn handle(&mut self, event: &Event, ctx: &mut EventContext) -> Result<(), ListenerError> {
        match event {
            Event::LoginSuccess { username, .. } => self.bot_name = username.clone(),
            Event::JoinGame { .. } => {
                for line in &self.start_text {
                    Self::say(ctx, line.clone());
                }
            }
            Event::UpdateExperience { level, .. } => self.level = Some(*level),
            Event::FishCaught { item } => self.session_loot.record(item.clone()),
            Event::SetSlot { .. } | Event::HeldItemChange { .. } => self.inventory.observe(event),
            Event::ChatReceived { message } => {
                if let Some(text) = addressed_command(message, &self.bot_name) {
                    let mut words = text.split_whitespace();
                    let word = words.next().unwrap_or_default();
                    match ChatCommand::parse(word) {
                        Some(command) => self.run(command, words, ctx),
                        None => Self::say(ctx, format!("Unknown command: {word}")),
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
