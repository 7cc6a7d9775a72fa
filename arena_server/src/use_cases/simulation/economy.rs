// Economy: block placement, item drops with merging, pickups and the shop.

use super::{COLOR_ERROR, COLOR_GOLD, COLOR_SUCCESS, Simulation};
use crate::domain::entity::{DropState, EntityId, EntityKind, SessionId};
use crate::domain::input::DropDirection;
use crate::domain::inventory::{InventoryError, TakeAmount};
use crate::domain::items::{BlockType, ItemKind};
use crate::domain::rules::{circle_overlaps_rect, snap_to_cell};
use crate::domain::trades::{Cost, TradeError, find_trade};
use glam::Vec2;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceError {
    NoCharacter,
    NotABlock,
    OutOfRange,
    OutOfBounds,
    Occupied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropError {
    NoCharacter,
    Inventory(InventoryError),
}

impl From<InventoryError> for DropError {
    fn from(err: InventoryError) -> Self {
        DropError::Inventory(err)
    }
}

impl Simulation {
    pub(crate) fn place_block(&mut self, player_id: EntityId, target: Vec2) -> Result<EntityId, PlaceError> {
        let world = self.tuning.world;
        let combat = self.tuning.combat;
        let player_radius = self.tuning.player.radius;

        let origin = self.position(player_id).ok_or(PlaceError::NoCharacter)?;
        let player = self
            .player(player_id)
            .filter(|p| p.is_alive())
            .ok_or(PlaceError::NoCharacter)?;
        let slot = player.selected_slot;
        let block_type = player
            .selected_item()
            .and_then(|item| item.block())
            .ok_or(PlaceError::NotABlock)?;

        let cell = snap_to_cell(target, world.cell_size);
        if cell.distance(origin) > combat.place_range {
            return Err(PlaceError::OutOfRange);
        }
        if !self.state.in_bounds(cell, 0.0) {
            return Err(PlaceError::OutOfBounds);
        }

        let half = Vec2::splat(world.cell_size / 2.0);
        let occupied = self.state.entities.iter().any(|e| match &e.kind {
            EntityKind::Block(_) => e.position.distance(cell) < world.cell_size / 2.0,
            EntityKind::Bed(_) => {
                let bed_half = world.bed_half_extents;
                (e.position - cell).abs().cmplt(bed_half + half).all()
            }
            EntityKind::Player(p) => {
                p.is_alive() && circle_overlaps_rect(e.position, player_radius, cell, half)
            }
            _ => false,
        });
        if occupied {
            return Err(PlaceError::Occupied);
        }

        if let Some(player) = self.player_mut(player_id) {
            player
                .inventory
                .take_from_slot(slot, TakeAmount::One)
                .map_err(|_| PlaceError::NotABlock)?;
        }
        let id = self.spawn_block(cell, block_type, Some(player_id));
        if block_type == BlockType::Tnt {
            let detonate_at = self.now_ms() + combat.tnt_fuse_ms;
            if let Some(EntityKind::Block(block)) =
                self.state.entities.get_mut(id).map(|e| &mut e.kind)
            {
                block.detonate_at_ms = Some(detonate_at);
            }
        }
        Ok(id)
    }

    pub(crate) fn drop_from_slot(
        &mut self,
        player_id: EntityId,
        slot: usize,
        amount: TakeAmount,
        direction: DropDirection,
    ) -> Result<EntityId, DropError> {
        let origin = self.position(player_id).ok_or(DropError::NoCharacter)?;
        let movement = self
            .body(player_id)
            .and_then(|body| self.physics.velocity(body))
            .unwrap_or(Vec2::ZERO);
        let player = self
            .player_mut(player_id)
            .filter(|p| p.is_alive())
            .ok_or(DropError::NoCharacter)?;
        let stack = player.inventory.take_from_slot(slot, amount)?;

        let heading = match direction {
            DropDirection::Aim(aim) => aim,
            DropDirection::Movement => movement,
        };
        // Straight down (+y) when there is no heading.
        let heading = heading.try_normalize().unwrap_or(Vec2::Y);
        let position = origin + heading * self.tuning.economy.drop_offset;
        Ok(self.spawn_drop(stack.item, stack.count, position))
    }

    /// Spawns loot in the world, merging into the closest same-kind drop within range.
    pub fn spawn_drop(&mut self, item: ItemKind, count: u32, position: Vec2) -> EntityId {
        let now = self.now_ms();
        let merge_radius = self.tuning.economy.merge_radius;
        let closest = self
            .state
            .entities
            .iter()
            .filter_map(|e| match &e.kind {
                EntityKind::DroppedItem(drop) if drop.item == item => {
                    Some((e.id, e.position.distance(position)))
                }
                _ => None,
            })
            .filter(|(_, distance)| *distance <= merge_radius)
            .min_by(|a, b| a.1.total_cmp(&b.1));

        if let Some((id, _)) = closest {
            if let Some(EntityKind::DroppedItem(drop)) =
                self.state.entities.get_mut(id).map(|e| &mut e.kind)
            {
                drop.count += count;
                drop.spawned_at_ms = now;
                return id;
            }
        }

        self.state.spawn(
            position,
            EntityKind::DroppedItem(DropState {
                item,
                count,
                spawned_at_ms: now,
            }),
        )
    }

    /// Living characters absorb drops in reach. Gold goes to the counter; inventory items
    /// fill what fits and leave the remainder in the world.
    pub(crate) fn collect_pickups(&mut self) {
        let radius = self.tuning.economy.pickup_radius;
        let players: Vec<(EntityId, Vec2, SessionId)> = self
            .state
            .entities
            .players()
            .filter(|(_, p)| p.is_alive())
            .map(|(e, p)| (e.id, e.position, p.owner))
            .collect();
        let drops: Vec<(EntityId, Vec2)> = self
            .state
            .entities
            .iter()
            .filter(|e| matches!(e.kind, EntityKind::DroppedItem(_)))
            .map(|e| (e.id, e.position))
            .collect();

        for (player_id, player_pos, owner) in players {
            for (drop_id, drop_pos) in &drops {
                if drop_pos.distance(player_pos) > radius {
                    continue;
                }
                self.pick_up(player_id, owner, *drop_id);
            }
        }
    }

    fn pick_up(&mut self, player_id: EntityId, owner: SessionId, drop_id: EntityId) {
        let Some(EntityKind::DroppedItem(drop)) =
            self.state.entities.get(drop_id).map(|e| e.kind.clone())
        else {
            return;
        };
        let Some(player) = self.player_mut(player_id) else {
            return;
        };
        let team = player.team;

        if drop.item.is_currency() {
            player.gold = player.gold.saturating_add(drop.count);
            self.state.totals_mut(team).gold += drop.count;
            self.state.entities.remove(drop_id);
            return;
        }

        let remainder = player.inventory.add(drop.item, drop.count);
        let absorbed = drop.count - remainder;
        if remainder == 0 {
            self.state.entities.remove(drop_id);
        } else if absorbed > 0 {
            if let Some(EntityKind::DroppedItem(world_drop)) =
                self.state.entities.get_mut(drop_id).map(|e| &mut e.kind)
            {
                world_drop.count = remainder;
            }
        } else {
            self.notify_inventory_full(owner);
        }
    }

    fn notify_inventory_full(&mut self, session_id: SessionId) {
        let now = self.now_ms();
        let throttle = self.tuning.player.full_inventory_notice_ms;
        let Some(session) = self.sessions.get_mut(&session_id) else {
            return;
        };
        if session
            .last_full_notice_ms
            .is_some_and(|at| now.saturating_sub(at) < throttle)
        {
            return;
        }
        session.last_full_notice_ms = Some(now);
        self.notify(Some(session_id), "Inventory full", COLOR_ERROR);
    }

    pub(crate) fn shop_trade(&mut self, session_id: SessionId, trade_id: &str) {
        match self.execute_trade(session_id, trade_id) {
            Ok(text) => {
                info!(session_id = session_id.0, trade_id, "trade completed");
                self.notify(Some(session_id), text, COLOR_SUCCESS);
            }
            Err(err) => {
                debug!(session_id = session_id.0, trade_id, ?err, "trade rejected");
                let color = if err == TradeError::InsufficientGold {
                    COLOR_GOLD
                } else {
                    COLOR_ERROR
                };
                self.notify(Some(session_id), err.message(), color);
            }
        }
    }

    /// Validates price and room before touching the balance, so a failed trade changes
    /// nothing.
    pub(crate) fn execute_trade(
        &mut self,
        session_id: SessionId,
        trade_id: &str,
    ) -> Result<String, TradeError> {
        let trade = find_trade(trade_id).ok_or(TradeError::UnknownTrade)?;
        let price = match trade.cost {
            Cost::Gold(amount) => amount,
            Cost::Item(_) => return Err(TradeError::UnsupportedCost),
        };
        let active = self
            .active_character(session_id)
            .ok_or(TradeError::NoActiveCharacter)?;
        let player = self
            .player_mut(active)
            .ok_or(TradeError::NoActiveCharacter)?;

        if player.gold < price {
            return Err(TradeError::InsufficientGold);
        }
        let reward = trade.reward;
        if player.inventory.capacity_for(reward.item) < reward.count {
            return Err(TradeError::InventoryFull);
        }

        player.gold -= price;
        player.inventory.add(reward.item, reward.count);
        Ok(format!("Bought {} {}", reward.count, reward.item.name()))
    }
}
