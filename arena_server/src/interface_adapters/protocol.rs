// Wire protocol DTOs and conversions for public game server messages.
// HTTP request/response bodies live next to their handlers in `net`.

use crate::domain::entity::{
    Entity, EntityKind, GeneratorType, LocationClass, SessionId, Team,
};
use crate::domain::input::PlayerInput;
use crate::domain::items::{BlockType, ItemKind, ItemStack, Weapon};
use crate::domain::state::{FeedEntry, FeedKind, Phase, TeamTotals, Winner};
use crate::use_cases::{InventoryAction, ServerEvent, ServerState, WorldUpdate};
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Messages the server sends to connected clients over the WebSocket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    // Assigned session for the connection after Join is accepted.
    Identity { session_id: u64 },
    // Snapshot of the room after a batch of ticks.
    WorldUpdate(WorldUpdateDto),
    GameState(ServerStateDto),
    ChatMessage { from: String, text: String },
    Notification { text: String, color: String },
    // Visual only; damage was already applied.
    Explosion { x: f32, y: f32, radius: f32 },
    RematchStarting {
        room_id: String,
        teams: BTreeMap<Team, Vec<String>>,
    },
}

impl ServerMessage {
    /// Point event as seen by one session; notifications aimed at someone else yield `None`.
    pub fn from_event(event: &ServerEvent, viewer: SessionId) -> Option<Self> {
        let msg = match event {
            ServerEvent::Chat { from, text } => ServerMessage::ChatMessage {
                from: from.clone(),
                text: text.clone(),
            },
            ServerEvent::Notification {
                target,
                text,
                color,
            } => {
                if target.is_some_and(|target| target != viewer) {
                    return None;
                }
                ServerMessage::Notification {
                    text: text.clone(),
                    color: color.clone(),
                }
            }
            ServerEvent::Explosion { position, radius } => ServerMessage::Explosion {
                x: position.x,
                y: position.y,
                radius: *radius,
            },
            ServerEvent::RematchStarting { room_id, teams } => ServerMessage::RematchStarting {
                room_id: room_id.to_string(),
                teams: teams.clone(),
            },
        };
        Some(msg)
    }
}

/// Messages the client sends to the server over the WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    // Must be the first message on a connection.
    Join(JoinPayload),
    Input(PlayerInputDto),
    SwitchCharacter,
    ChatMessage { text: String },
    InventoryAction(InventoryActionDto),
    DropItem { slot_index: usize },
    ShopTrade { trade_id: String },
    ReadyForRematch,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JoinPayload {
    #[serde(default)]
    pub username: String,
    // Registered account; its stored username wins over `username`.
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Per-tick input payload sent by the client after joining.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlayerInputDto {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub aim_x: f32,
    pub aim_y: f32,
    pub shoot: bool,
    pub melee: bool,
    pub build: bool,
    pub drop: bool,
    pub selected_slot: Option<usize>,
}

impl From<PlayerInputDto> for PlayerInput {
    fn from(input: PlayerInputDto) -> Self {
        Self {
            up: input.up,
            down: input.down,
            left: input.left,
            right: input.right,
            aim: Vec2::new(input.aim_x, input.aim_y),
            shoot: input.shoot,
            melee: input.melee,
            build: input.build,
            drop: input.drop,
            selected_slot: input.selected_slot,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum InventoryActionDto {
    Select { index: usize },
    Swap { from_index: usize, to_index: usize },
}

impl From<InventoryActionDto> for InventoryAction {
    fn from(action: InventoryActionDto) -> Self {
        match action {
            InventoryActionDto::Select { index } => InventoryAction::Select { index },
            InventoryActionDto::Swap {
                from_index,
                to_index,
            } => InventoryAction::Swap {
                from_index,
                to_index,
            },
        }
    }
}

/// Snapshot of the room sent to clients after each batch of ticks.
#[derive(Debug, Clone, Serialize)]
pub struct WorldUpdateDto {
    pub tick: u64,
    pub width: f32,
    pub height: f32,
    pub phase: Phase,
    pub phase_ends_in_ms: u64,
    pub winner: Option<Winner>,
    pub frozen: bool,
    pub kill_feed: Vec<FeedEntryDto>,
    pub rematch_ready: Vec<u64>,
    pub rematch_countdown: Option<f64>,
    pub team_totals: BTreeMap<Team, TeamTotalsDto>,
    pub entities: Vec<EntityDto>,
}

impl From<WorldUpdate> for WorldUpdateDto {
    fn from(update: WorldUpdate) -> Self {
        Self {
            tick: update.tick,
            width: update.width,
            height: update.height,
            phase: update.phase,
            phase_ends_in_ms: update.phase_ends_in_ms,
            winner: update.winner,
            frozen: update.frozen,
            kill_feed: update.kill_feed.iter().map(FeedEntryDto::from).collect(),
            rematch_ready: update.rematch_ready.iter().map(|s| s.0).collect(),
            rematch_countdown: update.rematch_countdown,
            team_totals: update
                .team_totals
                .iter()
                .map(|(team, totals)| (*team, TeamTotalsDto::from(totals)))
                .collect(),
            entities: update.entities.iter().map(EntityDto::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedEntryDto {
    pub kind: FeedKind,
    pub text: String,
    pub at_ms: u64,
}

impl From<&FeedEntry> for FeedEntryDto {
    fn from(entry: &FeedEntry) -> Self {
        Self {
            kind: entry.kind,
            text: entry.text.clone(),
            at_ms: entry.at_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct TeamTotalsDto {
    pub kills: u32,
    pub gold: u32,
}

impl From<&TeamTotals> for TeamTotalsDto {
    fn from(totals: &TeamTotals) -> Self {
        Self {
            kills: totals.kills,
            gold: totals.gold,
        }
    }
}

/// Flattened entity record; `kind` selects the variant fields.
#[derive(Debug, Clone, Serialize)]
pub struct EntityDto {
    pub id: u64,
    pub x: f32,
    pub y: f32,
    #[serde(flatten)]
    pub kind: EntityKindDto,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityKindDto {
    Player {
        team: Team,
        session_id: u64,
        username: String,
        hp: i32,
        max_hp: i32,
        is_active: bool,
        is_dead: bool,
        respawn_time_ms: i64,
        inventory: Vec<Option<ItemStack>>,
        selected_slot: usize,
        build_mode: bool,
        aim_x: f32,
        aim_y: f32,
        gold: u32,
        kills: u32,
        deaths: u32,
        damage_dealt: u32,
    },
    Bullet {
        owner_id: u64,
        weapon: Weapon,
        vx: f32,
        vy: f32,
    },
    Block {
        block_type: BlockType,
        hp: i32,
        max_hp: i32,
        armed: bool,
    },
    Bed {
        team: Team,
        hp: i32,
        max_hp: i32,
    },
    DroppedItem {
        item: ItemKind,
        count: u32,
    },
    ResourceGenerator {
        generator_type: GeneratorType,
        location: LocationClass,
    },
}

impl From<&Entity> for EntityDto {
    fn from(entity: &Entity) -> Self {
        let kind = match &entity.kind {
            EntityKind::Player(p) => EntityKindDto::Player {
                team: p.team,
                session_id: p.owner.0,
                username: p.username.clone(),
                hp: p.health.hp,
                max_hp: p.health.max_hp,
                is_active: p.is_active,
                is_dead: p.is_dead,
                respawn_time_ms: p.respawn_time_ms,
                inventory: p.inventory.slots().to_vec(),
                selected_slot: p.selected_slot,
                build_mode: p.build_mode,
                aim_x: p.aim.x,
                aim_y: p.aim.y,
                gold: p.gold,
                kills: p.kills,
                deaths: p.deaths,
                damage_dealt: p.damage_dealt,
            },
            EntityKind::Bullet(b) => EntityKindDto::Bullet {
                owner_id: b.owner.0,
                weapon: b.weapon,
                vx: b.velocity.x,
                vy: b.velocity.y,
            },
            EntityKind::Block(b) => EntityKindDto::Block {
                block_type: b.block_type,
                hp: b.health.hp,
                max_hp: b.health.max_hp,
                armed: b.detonate_at_ms.is_some(),
            },
            EntityKind::Bed(b) => EntityKindDto::Bed {
                team: b.team,
                hp: b.health.hp,
                max_hp: b.health.max_hp,
            },
            EntityKind::DroppedItem(d) => EntityKindDto::DroppedItem {
                item: d.item,
                count: d.count,
            },
            EntityKind::ResourceGenerator(g) => EntityKindDto::ResourceGenerator {
                generator_type: g.generator_type,
                location: g.location,
            },
        };
        Self {
            id: entity.id.0,
            x: entity.position.x,
            y: entity.position.y,
            kind,
        }
    }
}

/// Room lifecycle state sent to clients for UI flow.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerStateDto {
    Waiting,
    Running { phase: Phase },
    Ended { winner: Winner },
    RematchCountdown { seconds_left: u32 },
    RematchPending,
}

impl From<ServerState> for ServerStateDto {
    fn from(state: ServerState) -> Self {
        match state {
            ServerState::Waiting => ServerStateDto::Waiting,
            ServerState::Running { phase } => ServerStateDto::Running { phase },
            ServerState::Ended { winner } => ServerStateDto::Ended { winner },
            ServerState::RematchCountdown { seconds_left } => {
                ServerStateDto::RematchCountdown { seconds_left }
            }
            ServerState::RematchRequested { .. } => ServerStateDto::RematchPending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::{BedState, EntityId, Health};
    use serde_json::json;

    #[test]
    fn when_input_omits_fields_then_they_default_to_idle() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"input","data":{"right":true,"aim_x":4.5}}"#)
                .expect("input should parse");
        let ClientMessage::Input(dto) = msg else {
            panic!("expected input");
        };
        let input = PlayerInput::from(dto);
        assert!(input.right && !input.left && !input.shoot);
        assert_eq!(input.aim, Vec2::new(4.5, 0.0));
        assert_eq!(input.selected_slot, None);
    }

    #[test]
    fn when_unit_messages_arrive_without_data_then_they_parse() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"switch_character"}"#).expect("should parse");
        assert!(matches!(msg, ClientMessage::SwitchCharacter));
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"ready_for_rematch"}"#).expect("should parse");
        assert!(matches!(msg, ClientMessage::ReadyForRematch));
    }

    #[test]
    fn when_inventory_swap_arrives_then_indices_are_carried_over() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"type":"inventory_action","data":{"action":"swap","from_index":1,"to_index":4}}"#,
        )
        .expect("should parse");
        let ClientMessage::InventoryAction(action) = msg else {
            panic!("expected inventory action");
        };
        assert_eq!(
            InventoryAction::from(action),
            InventoryAction::Swap {
                from_index: 1,
                to_index: 4
            }
        );
    }

    #[test]
    fn when_notification_targets_another_session_then_it_is_filtered() {
        let event = ServerEvent::Notification {
            target: Some(SessionId(7)),
            text: "Inventory full".to_string(),
            color: "#ff5555".to_string(),
        };
        assert!(ServerMessage::from_event(&event, SessionId(8)).is_none());
        assert!(ServerMessage::from_event(&event, SessionId(7)).is_some());
    }

    #[test]
    fn when_rematch_starting_is_serialized_then_teams_are_keyed_by_name() {
        let mut teams = BTreeMap::new();
        teams.insert(Team::Red, vec!["alice".to_string()]);
        let event = ServerEvent::RematchStarting {
            room_id: "room-2".into(),
            teams,
        };
        let msg = ServerMessage::from_event(&event, SessionId(1)).expect("broadcast event");
        let value = serde_json::to_value(&msg).expect("serialize");
        assert_eq!(
            value,
            json!({
                "type": "rematch_starting",
                "data": { "room_id": "room-2", "teams": { "red": ["alice"] } }
            })
        );
    }

    #[test]
    fn when_bed_is_serialized_then_kind_fields_are_flattened() {
        let entity = Entity {
            id: EntityId(3),
            position: Vec2::new(10.0, 20.0),
            kind: EntityKind::Bed(BedState {
                team: Team::Blue,
                health: Health::full(500),
            }),
        };
        let value = serde_json::to_value(EntityDto::from(&entity)).expect("serialize");
        assert_eq!(
            value,
            json!({"id": 3, "x": 10.0, "y": 20.0, "kind": "bed", "team": "blue", "hp": 500, "max_hp": 500})
        );
    }
}
