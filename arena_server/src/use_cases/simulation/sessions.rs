// Per-connection event handling: join/leave, input routing, character switching,
// inventory actions, chat and cheats.

use super::{COLOR_ERROR, COLOR_INFO, COLOR_SUCCESS, Session, Simulation};
use crate::domain::agent::Agent;
use crate::domain::entity::{EntityKind, PlayerState, SessionId, Team};
use crate::domain::input::{Command, DropDirection, PlayerInput};
use crate::domain::inventory::{INVENTORY_SLOTS, TakeAmount};
use crate::domain::items::ItemKind;
use crate::domain::physics::{BodyDesc, BodyKind, Shape};
use crate::use_cases::types::{GameEvent, InventoryAction, ServerEvent};
use glam::Vec2;
use tracing::{debug, info, warn};

const MAX_CHAT_LEN: usize = 200;

impl Simulation {
    pub fn handle_event(&mut self, event: GameEvent) {
        match event {
            GameEvent::Join {
                session_id,
                username,
            } => self.join(session_id, username),
            GameEvent::Leave { session_id } => self.leave(session_id),
            GameEvent::Input { session_id, input } => self.queue_input(session_id, input),
            GameEvent::SwitchCharacter { session_id } => self.switch_character(session_id),
            GameEvent::Chat { session_id, text } => self.chat(session_id, &text),
            GameEvent::Inventory { session_id, action } => {
                self.inventory_action(session_id, action)
            }
            GameEvent::DropItem {
                session_id,
                slot_index,
            } => self.request_stack_drop(session_id, slot_index),
            GameEvent::ShopTrade {
                session_id,
                trade_id,
            } => self.shop_trade(session_id, &trade_id),
            GameEvent::ReadyForRematch { session_id } => {
                if let Err(err) = self.mark_ready(session_id) {
                    debug!(session_id = session_id.0, ?err, "rematch vote ignored");
                }
            }
        }
    }

    /// Creates the session's two characters next to its team bed.
    pub fn join(&mut self, session_id: SessionId, username: String) {
        if self.sessions.contains_key(&session_id) {
            warn!(session_id = session_id.0, "duplicate join ignored");
            return;
        }

        let team = self.team_for(&username);
        let max_hp = self.tuning.player.max_hp;
        let radius = self.tuning.player.radius;
        let characters = [0, 1].map(|index| {
            let position = self.spawn_point(team, index);
            let mut player = PlayerState::new(team, session_id, username.clone(), max_hp);
            player.is_active = index == 0;
            let id = self.state.spawn(position, EntityKind::Player(player));
            let body = self.physics.create_body(
                id,
                BodyDesc {
                    position,
                    velocity: Vec2::ZERO,
                    shape: Shape::Circle { radius },
                    kind: BodyKind::Dynamic,
                },
            );
            self.agents.insert(id, Agent::player(id, body));
            id
        });

        self.state.rematch_ready.insert(session_id, false);
        self.sessions.insert(
            session_id,
            Session {
                username: username.clone(),
                team,
                characters,
                last_full_notice_ms: None,
            },
        );
        info!(session_id = session_id.0, %username, team = team.name(), "session joined");
        self.notify(
            None,
            format!("{username} joined {} team", team.name()),
            COLOR_INFO,
        );
    }

    /// Tears down both characters immediately.
    pub fn leave(&mut self, session_id: SessionId) {
        let Some(session) = self.sessions.remove(&session_id) else {
            return;
        };
        for id in session.characters {
            self.despawn(id);
        }
        self.state.rematch_ready.remove(&session_id);
        info!(session_id = session_id.0, username = %session.username, "session left");
        self.notify(None, format!("{} left", session.username), COLOR_INFO);
        self.refresh_rematch_readiness();
    }

    /// Rematch seats keep their team; everyone else joins the smaller team.
    fn team_for(&self, username: &str) -> Team {
        if let Some(entry) = self.roster.iter().find(|e| e.username == username) {
            return entry.team;
        }
        let count = |team: Team| self.sessions.values().filter(|s| s.team == team).count();
        if count(Team::Blue) < count(Team::Red) {
            Team::Blue
        } else {
            Team::Red
        }
    }

    fn queue_input(&mut self, session_id: SessionId, input: PlayerInput) {
        let Some(active) = self.active_character(session_id) else {
            return;
        };
        if let Some(agent) = self.agents.get_mut(&active) {
            agent.inputs.push_back(input);
        }
    }

    /// Hands control to the session's other character when it is alive.
    pub fn switch_character(&mut self, session_id: SessionId) {
        let Some(session) = self.sessions.get(&session_id) else {
            return;
        };
        let [first, second] = session.characters;
        let current = self.active_character(session_id);
        let next = match current {
            Some(id) if id == first => second,
            Some(_) => first,
            None => first,
        };
        let next = if self.player(next).is_some_and(|p| p.is_alive()) {
            next
        } else if current.is_none() && self.player(second).is_some_and(|p| p.is_alive()) {
            second
        } else {
            self.notify(Some(session_id), "Your other character is down", COLOR_ERROR);
            return;
        };

        if let Some(current) = current {
            if let Some(player) = self.player_mut(current) {
                player.is_active = false;
            }
            if let Some(agent) = self.agents.get_mut(&current) {
                agent.inputs.clear();
            }
        }
        if let Some(player) = self.player_mut(next) {
            player.is_active = true;
        }
    }

    fn inventory_action(&mut self, session_id: SessionId, action: InventoryAction) {
        let Some(active) = self.active_character(session_id) else {
            return;
        };
        let result = match action {
            InventoryAction::Select { index } => match self.player_mut(active) {
                Some(player) if index < INVENTORY_SLOTS => {
                    player.selected_slot = index;
                    Ok(())
                }
                _ => Err(()),
            },
            InventoryAction::Swap {
                from_index,
                to_index,
            } => self
                .player_mut(active)
                .ok_or(())
                .and_then(|p| p.inventory.swap(from_index, to_index).map_err(|_| ())),
        };
        if result.is_err() {
            self.notify(Some(session_id), "Invalid slot", COLOR_ERROR);
        }
    }

    /// `drop_item` drops the whole stack in the movement direction on the next tick.
    fn request_stack_drop(&mut self, session_id: SessionId, slot_index: usize) {
        if slot_index >= INVENTORY_SLOTS {
            self.notify(Some(session_id), "Invalid slot", COLOR_ERROR);
            return;
        }
        let Some(active) = self.active_character(session_id) else {
            return;
        };
        self.commands.push(Command::DropItem {
            player: active,
            slot: slot_index,
            amount: TakeAmount::Stack,
            direction: DropDirection::Movement,
        });
    }

    fn chat(&mut self, session_id: SessionId, text: &str) {
        let Some(session) = self.sessions.get(&session_id) else {
            return;
        };
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        if let Some(command) = text.strip_prefix("/cheat") {
            let command = command.trim().to_string();
            self.cheat(session_id, &command);
            return;
        }

        let text: String = text.chars().take(MAX_CHAT_LEN).collect();
        self.events.push(ServerEvent::Chat {
            from: session.username.clone(),
            text,
        });
    }

    fn cheat(&mut self, session_id: SessionId, command: &str) {
        if !self.cheats_enabled {
            self.notify(Some(session_id), "Cheats are disabled", COLOR_ERROR);
            return;
        }
        let Some(active) = self.active_character(session_id) else {
            self.notify(Some(session_id), "No active character", COLOR_ERROR);
            return;
        };

        let parts: Vec<&str> = command.split_whitespace().collect();
        let outcome = match parts.as_slice() {
            ["gold", amount] => amount.parse::<u32>().ok().and_then(|amount| {
                let player = self.player_mut(active)?;
                player.gold = player.gold.saturating_add(amount);
                Some(format!("+{amount} gold"))
            }),
            ["give", item, amount] => {
                let item = ItemKind::parse(item);
                let amount = amount.parse::<u32>().ok();
                item.zip(amount).and_then(|(item, amount)| {
                    let player = self.player_mut(active)?;
                    if item.is_currency() {
                        player.gold = player.gold.saturating_add(amount);
                        return Some(format!("+{amount} gold"));
                    }
                    let remainder = player.inventory.add(item, amount);
                    Some(format!("+{} {}", amount - remainder, item.name()))
                })
            }
            ["heal"] => self.player_mut(active).map(|player| {
                player.health.restore();
                "Healed".to_string()
            }),
            _ => None,
        };

        match outcome {
            Some(text) => {
                info!(session_id = session_id.0, command, "cheat applied");
                self.notify(Some(session_id), text, COLOR_SUCCESS);
            }
            None => self.notify(Some(session_id), "Unknown cheat", COLOR_ERROR),
        }
    }
}
