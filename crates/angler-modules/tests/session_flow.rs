//! The standard module set wired through a real bus and registry.

use angler_events::{EventBus, ModuleRegistry};
use angler_modules::{
    ChatCommandConfig, ChatCommandModule, ChatProxyModule, ClientConfig,
    ClientDefaultsModule, EjectionConfig, EjectionModule, FishingConfig,
    FishingModule, HandshakeModule, LoginModule, LootHistory,
};
use angler_protocol::{EntityId, Event, FISHING_BOBBER_OBJECT, Item, NextState, Packet};

struct Bot {
    bus: EventBus,
    registry: ModuleRegistry,
}

impl Bot {
    fn new() -> Self {
        let mut bus = EventBus::new();
        let mut registry = ModuleRegistry::new();
        let commands = ChatCommandConfig {
            enabled: true,
            start_text: vec!["Hi all".into()],
        };
        let ejection = EjectionConfig {
            enabled: true,
            items: vec!["rotten_flesh".into()],
        };
        registry.enable(&mut bus, Box::new(HandshakeModule)).unwrap();
        registry.enable(&mut bus, Box::new(LoginModule::new("Angler"))).unwrap();
        registry
            .enable(&mut bus, Box::new(ClientDefaultsModule::new(ClientConfig::default())))
            .unwrap();
        registry
            .enable(
                &mut bus,
                Box::new(FishingModule::new(&FishingConfig::default(), LootHistory::new())),
            )
            .unwrap();
        registry.enable(&mut bus, Box::new(ChatProxyModule)).unwrap();
        registry
            .enable(&mut bus, Box::new(ChatCommandModule::new(&commands, "Angler")))
            .unwrap();
        registry.enable(&mut bus, Box::new(EjectionModule::new(ejection))).unwrap();
        Self { bus, registry }
    }

    fn publish(&mut self, event: Event) -> Vec<Packet> {
        self.bus.publish(event).outbound
    }
}

fn opened() -> Event {
    Event::SessionOpened {
        host: "mc.example".into(),
        port: 25565,
        protocol_version: 340,
    }
}

#[test]
fn test_session_opened_sends_handshake_then_login() {
    let mut bot = Bot::new();

    let packets = bot.publish(opened());

    assert_eq!(
        packets,
        vec![
            Packet::Handshake {
                protocol_version: 340,
                host: "mc.example".into(),
                port: 25565,
                next_state: NextState::Login,
            },
            Packet::LoginStart { username: "Angler".into() },
        ]
    );
}

#[test]
fn test_join_game_settings_cast_and_start_text() {
    let mut bot = Bot::new();

    let packets = bot.publish(Event::JoinGame { entity_id: EntityId(5) });

    assert_eq!(
        packets,
        vec![
            Packet::ClientSettings { locale: "en_US".into(), view_distance: 2 },
            Packet::UseItem,
            Packet::ChatMessage { text: "Hi all".into() },
        ]
    );
}

#[test]
fn test_catch_is_announced_in_chat() {
    let mut bot = Bot::new();
    bot.publish(Event::JoinGame { entity_id: EntityId(5) });
    bot.publish(Event::SpawnObject {
        entity_id: EntityId(50),
        object_type: FISHING_BOBBER_OBJECT,
        owner_id: EntityId(5),
    });
    bot.publish(Event::EntityVelocity { entity_id: EntityId(50), dx: 0, dy: -500, dz: 0 });

    let packets = bot.publish(Event::ItemRetrieved { item: Item::named("salmon") });

    assert_eq!(
        packets,
        vec![Packet::UseItem, Packet::ChatMessage { text: "Caught Salmon".into() }]
    );
    let loot = bot
        .registry
        .with::<FishingModule, _>(|f| f.loot_history().clone())
        .unwrap();
    assert_eq!(loot.items(), &[Item::named("salmon")]);
}

#[test]
fn test_death_respawns_and_recasts() {
    let mut bot = Bot::new();
    bot.publish(Event::JoinGame { entity_id: EntityId(5) });

    let packets = bot.publish(Event::UpdateHealth { health: 0.0, food: 3, saturation: 0.0 });

    assert_eq!(packets, vec![Packet::Respawn, Packet::UseItem]);
}

#[test]
fn test_keep_alive_is_echoed() {
    let mut bot = Bot::new();

    assert_eq!(bot.publish(Event::KeepAlive { id: 99 }), vec![Packet::KeepAlive { id: 99 }]);
}

#[test]
fn test_listed_item_is_ejected() {
    let mut bot = Bot::new();

    let packets = bot.publish(Event::SetSlot {
        window_id: 0,
        slot: 36,
        item: Some(Item::named("rotten_flesh")),
    });

    assert_eq!(packets, vec![Packet::DropSlot { slot: 36, whole_stack: true }]);
}

#[test]
fn test_kick_requests_reconnecting_disconnect() {
    let mut bot = Bot::new();

    let dispatch = bot.bus.publish(Event::Kicked { reason: "Server restarting".into() });

    let request = dispatch.disconnect.unwrap();
    assert!(request.reconnect);
    assert!(!request.invalidate_identity);
}

#[test]
fn test_invalid_session_kick_invalidates_identity() {
    let mut bot = Bot::new();

    let dispatch = bot.bus.publish(Event::Kicked { reason: "Invalid session (Try restarting your game)".into() });

    assert!(dispatch.disconnect.unwrap().invalidate_identity);
}

#[test]
fn test_bye_command_says_goodbye_and_stops() {
    let mut bot = Bot::new();

    let dispatch = bot.bus.publish(Event::ChatReceived { message: "<Alex> Angler, bye".into() });

    assert_eq!(dispatch.outbound, vec![Packet::ChatMessage { text: "Bye!".into() }]);
    assert!(!dispatch.disconnect.unwrap().reconnect);
}

#[test]
fn test_long_chat_line_is_truncated() {
    let mut bot = Bot::new();

    let packets = bot.publish(Event::ChatOutgoing { text: "x".repeat(300) });

    assert_eq!(packets, vec![Packet::ChatMessage { text: "x".repeat(256) }]);
}

#[test]
fn test_look_command_turns_then_recasts() {
    let mut bot = Bot::new();
    bot.publish(Event::JoinGame { entity_id: EntityId(10) });

    let packets = bot.publish(Event::ChatReceived { message: "<Alex> Angler, look north".into() });

    assert_eq!(
        packets,
        vec![
            Packet::PlayerLook { yaw: 180.0, pitch: 0.0 },
            Packet::ChatMessage { text: "Looking at yaw 180, pitch 0".into() },
            Packet::UseItem,
        ]
    );
}

#[test]
fn test_droprod_drops_rod_from_selected_hotbar_slot() {
    let mut bot = Bot::new();
    bot.publish(Event::SetSlot {
        window_id: 0,
        slot: 40,
        item: Some(Item::named("fishing_rod")),
    });
    bot.publish(Event::HeldItemChange { slot: 4 });

    let packets = bot.publish(Event::ChatReceived { message: "<Alex> Angler, droprod".into() });

    assert_eq!(
        packets,
        vec![
            Packet::DropSlot { slot: 40, whole_stack: true },
            Packet::ChatMessage { text: "Dropping my rod".into() },
        ]
    );
}
