// Combat resolver: shooting, projectile contacts, melee cones, TNT explosions and the
// death pipeline.

use super::{DEAD_BODY_POSITION, Simulation};
use crate::domain::agent::Agent;
use crate::domain::entity::{BulletState, EntityId, EntityKind, NO_RESPAWN, Team};
use crate::domain::items::{BlockType, Weapon};
use crate::domain::physics::{BodyDesc, BodyKind, Shape};
use crate::domain::rules::{explosion_damage, explosion_factor, in_cone};
use crate::domain::state::FeedKind;
use crate::use_cases::types::ServerEvent;
use glam::Vec2;
use tracing::{debug, info};

/// What an applied hit did to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HitOutcome {
    Ignored,
    Damaged,
    Destroyed,
}

impl Simulation {
    pub(crate) fn shoot(&mut self, shooter: EntityId, target: Vec2) {
        let projectile = self.tuning.projectile;
        let player_radius = self.tuning.player.radius;
        let Some(origin) = self.position(shooter) else {
            return;
        };
        let Some(player) = self.player_mut(shooter) else {
            return;
        };
        if player.is_dead {
            return;
        }
        let Some(weapon) = player.selected_item().and_then(|item| item.weapon()) else {
            return;
        };
        if !player.inventory.remove(weapon.ammo(), 1) {
            debug!(entity_id = shooter.0, ?weapon, "out of ammo");
            return;
        }

        let profile = projectile.profile(weapon);
        let direction = (target - origin).try_normalize().unwrap_or(Vec2::X);
        let velocity = direction * profile.speed;
        let position = origin + direction * (player_radius + profile.radius + 1.0);
        let id = self.state.spawn(
            position,
            EntityKind::Bullet(BulletState {
                velocity,
                owner: shooter,
                weapon,
                damage: profile.damage,
            }),
        );
        let body = self.physics.create_body(
            id,
            BodyDesc {
                position,
                velocity,
                shape: Shape::Circle {
                    radius: profile.radius,
                },
                kind: BodyKind::Sensor,
            },
        );
        self.agents.insert(id, Agent::projectile(id, body));
    }

    pub(crate) fn resolve_contacts(&mut self) {
        for contact in self.physics.drain_contacts() {
            // Bodies removed earlier in this pass no longer resolve.
            let (Some(a), Some(b)) = (
                self.physics.entity_of(contact.a),
                self.physics.entity_of(contact.b),
            ) else {
                continue;
            };
            let is_bullet = |id: EntityId| {
                self.state
                    .entities
                    .get(id)
                    .is_some_and(|e| matches!(e.kind, EntityKind::Bullet(_)))
            };
            let (bullet, other) = if is_bullet(a) {
                (a, b)
            } else if is_bullet(b) {
                (b, a)
            } else {
                continue;
            };
            self.resolve_projectile(bullet, other, contact.point);
        }
    }

    fn resolve_projectile(&mut self, bullet_id: EntityId, other: EntityId, point: Vec2) {
        let Some(EntityKind::Bullet(bullet)) =
            self.state.entities.get(bullet_id).map(|e| e.kind.clone())
        else {
            return;
        };
        let Some(other_kind) = self.state.entities.get(other).map(|e| &e.kind) else {
            return;
        };
        if other == bullet.owner {
            return;
        }

        if bullet.weapon == Weapon::Pearl {
            if self.player(bullet.owner).is_some_and(|p| p.is_alive()) {
                debug!(entity_id = bullet.owner.0, x = point.x, y = point.y, "pearl teleport");
                self.teleport(bullet.owner, point);
            }
            self.despawn(bullet_id);
            return;
        }

        let shooter_team = self.player(bullet.owner).map(|p| p.team);
        match other_kind {
            EntityKind::Player(_) => {
                let knockback =
                    bullet.velocity.normalize_or_zero() * self.tuning.projectile.knockback;
                self.hit_player(other, bullet.damage, Some(bullet.owner), knockback);
            }
            EntityKind::Bed(bed) => {
                if shooter_team != Some(bed.team) {
                    self.damage_bed(other, bullet.damage, Some(bullet.owner));
                }
            }
            EntityKind::Block(_) => {
                self.damage_block(other, bullet.damage);
            }
            EntityKind::Bullet(_)
            | EntityKind::DroppedItem(_)
            | EntityKind::ResourceGenerator(_) => return,
        }
        self.despawn(bullet_id);
    }

    pub(crate) fn melee(&mut self, attacker: EntityId, facing: f32) {
        let combat = self.tuning.combat;
        let Some(origin) = self.position(attacker) else {
            return;
        };
        let Some(team) = self
            .player(attacker)
            .filter(|p| p.is_alive())
            .map(|p| p.team)
        else {
            return;
        };
        let structure_radius = combat.melee_radius + combat.melee_structure_bonus;
        let cone = |target: Vec2, radius: f32| {
            in_cone(origin, facing, target, radius, combat.melee_half_angle)
        };

        let mut players = Vec::new();
        let mut beds = Vec::new();
        let mut blocks = Vec::new();
        for entity in self.state.entities.iter() {
            match &entity.kind {
                EntityKind::Player(p)
                    if entity.id != attacker
                        && p.is_alive()
                        && cone(entity.position, combat.melee_radius) =>
                {
                    players.push((entity.id, entity.position));
                }
                EntityKind::Bed(bed)
                    if bed.team != team
                        && !bed.health.is_depleted()
                        && cone(entity.position, structure_radius) =>
                {
                    beds.push(entity.id);
                }
                EntityKind::Block(_) if cone(entity.position, structure_radius) => {
                    blocks.push(entity.id);
                }
                _ => {}
            }
        }

        for (id, position) in players {
            let knockback =
                (position - origin).normalize_or_zero() * combat.melee_knockback;
            self.hit_player(id, combat.melee_damage, Some(attacker), knockback);
        }
        for id in beds {
            self.damage_bed(id, combat.melee_damage, Some(attacker));
        }
        for id in blocks {
            self.damage_block(id, combat.melee_damage);
        }
    }

    /// Damages a living player; credits the attacker and runs the death check.
    pub(crate) fn hit_player(
        &mut self,
        target: EntityId,
        damage: i32,
        attacker: Option<EntityId>,
        knockback: Vec2,
    ) -> HitOutcome {
        let Some(player) = self.player_mut(target) else {
            return HitOutcome::Ignored;
        };
        if player.is_dead {
            return HitOutcome::Ignored;
        }
        let removed = player.health.apply_damage(damage);
        let depleted = player.health.is_depleted();

        if let Some(attacker) = attacker.filter(|a| *a != target) {
            if let Some(source) = self.player_mut(attacker) {
                source.damage_dealt = source.damage_dealt.saturating_add(removed as u32);
            }
        }
        if let Some(body) = self.body(target) {
            self.physics.apply_impulse(body, knockback);
        }

        if depleted {
            self.kill_player(target, attacker, FeedKind::Kill);
            HitOutcome::Destroyed
        } else {
            HitOutcome::Damaged
        }
    }

    /// Death transition; a no-op for characters that are already dead.
    pub(crate) fn kill_player(
        &mut self,
        victim: EntityId,
        killer: Option<EntityId>,
        kind: FeedKind,
    ) -> bool {
        let Some(team) = self.player(victim).filter(|p| p.is_alive()).map(|p| p.team) else {
            return false;
        };
        let respawn_ms = if self.state.entities.bed_alive(team) {
            self.tuning.player.respawn_ms
        } else {
            NO_RESPAWN
        };

        let Some(player) = self.player_mut(victim) else {
            return false;
        };
        player.is_dead = true;
        player.health.hp = 0;
        let was_active = player.is_active;
        player.is_active = false;
        player.deaths += 1;
        player.respawn_time_ms = respawn_ms;
        let owner = player.owner;
        let victim_name = player.username.clone();

        self.teleport(victim, DEAD_BODY_POSITION);
        if let Some(agent) = self.agents.get_mut(&victim) {
            agent.inputs.clear();
        }

        let credited = killer
            .filter(|k| *k != victim)
            .and_then(|k| self.player_mut(k))
            .map(|killer| {
                killer.kills += 1;
                (killer.team, killer.username.clone())
            });
        let now = self.now_ms();
        let (feed_kind, text) = match (&credited, kind) {
            (Some((killer_team, killer_name)), _) => {
                self.state.totals_mut(*killer_team).kills += 1;
                (FeedKind::Kill, format!("{killer_name} eliminated {victim_name}"))
            }
            (None, FeedKind::Environment) => {
                (FeedKind::Environment, format!("{victim_name} fell out of the world"))
            }
            (None, _) => (FeedKind::Environment, format!("{victim_name} died")),
        };
        self.state.kill_feed.push(feed_kind, text, now);

        if was_active {
            let sibling = self
                .sessions
                .get(&owner)
                .and_then(|s| s.characters.into_iter().find(|id| *id != victim));
            if let Some(sibling) = sibling {
                if let Some(other) = self.player_mut(sibling).filter(|p| p.is_alive()) {
                    other.is_active = true;
                }
            }
        }

        info!(
            entity_id = victim.0,
            killer = killer.map(|k| k.0),
            respawn_ms,
            "player died"
        );
        true
    }

    pub(crate) fn damage_bed(
        &mut self,
        bed_id: EntityId,
        damage: i32,
        attacker: Option<EntityId>,
    ) -> HitOutcome {
        let Some(EntityKind::Bed(bed)) = self.state.entities.get_mut(bed_id).map(|e| &mut e.kind)
        else {
            return HitOutcome::Ignored;
        };
        if bed.health.is_depleted() {
            return HitOutcome::Ignored;
        }
        let removed = bed.health.apply_damage(damage);
        let team = bed.team;
        let destroyed = bed.health.is_depleted();

        if let Some(attacker) = attacker {
            if let Some(source) = self.player_mut(attacker) {
                source.damage_dealt = source.damage_dealt.saturating_add(removed as u32);
            }
        }
        if destroyed {
            self.destroy_bed(bed_id, team);
            HitOutcome::Destroyed
        } else {
            HitOutcome::Damaged
        }
    }

    /// Zeroes the bed and removes its body exactly once.
    pub(crate) fn destroy_bed(&mut self, bed_id: EntityId, team: Team) {
        if let Some(EntityKind::Bed(bed)) = self.state.entities.get_mut(bed_id).map(|e| &mut e.kind)
        {
            bed.health.hp = 0;
        }
        let Some(body) = self.body(bed_id) else {
            return;
        };
        self.physics.remove_body(body);
        // Pending respawns of this team are cancelled along with the bed.
        for entity in self.state.entities.iter_mut() {
            if let Some(player) = entity.as_player_mut() {
                if player.team == team && player.is_dead && player.respawn_time_ms > 0 {
                    player.respawn_time_ms = NO_RESPAWN;
                }
            }
        }
        let now = self.now_ms();
        self.state
            .kill_feed
            .push(FeedKind::Bed, format!("{} bed destroyed", team.name()), now);
        info!(team = team.name(), "bed destroyed");
    }

    pub(crate) fn damage_block(&mut self, block_id: EntityId, damage: i32) -> HitOutcome {
        let Some(EntityKind::Block(block)) =
            self.state.entities.get_mut(block_id).map(|e| &mut e.kind)
        else {
            return HitOutcome::Ignored;
        };
        block.health.apply_damage(damage);
        if block.health.is_depleted() {
            self.despawn(block_id);
            HitOutcome::Destroyed
        } else {
            HitOutcome::Damaged
        }
    }

    /// Blows up a TNT block. The block is removed first so it can never detonate twice;
    /// TNT caught in the blast is re-armed to detonate on the next fuse check.
    pub(crate) fn detonate(&mut self, tnt_id: EntityId) {
        let Some(entity) = self.state.entities.get(tnt_id) else {
            return;
        };
        let EntityKind::Block(block) = &entity.kind else {
            return;
        };
        if block.block_type != BlockType::Tnt {
            return;
        }
        let center = entity.position;
        let placed_by = block.placed_by;
        self.despawn(tnt_id);

        let combat = self.tuning.combat;
        let now = self.now_ms();
        self.events.push(ServerEvent::Explosion {
            position: center,
            radius: combat.tnt_radius,
        });
        info!(x = center.x, y = center.y, "tnt detonated");

        let mut players = Vec::new();
        let mut blocks = Vec::new();
        let mut chained = Vec::new();
        let mut beds = Vec::new();
        for entity in self.state.entities.iter() {
            let distance = entity.position.distance(center);
            let Some(factor) = explosion_factor(distance, combat.tnt_radius) else {
                continue;
            };
            match &entity.kind {
                EntityKind::Player(p) if p.is_alive() => {
                    players.push((entity.id, entity.position, factor));
                }
                EntityKind::Block(b) if b.block_type == BlockType::Tnt => chained.push(entity.id),
                EntityKind::Block(b) => blocks.push((entity.id, b.health.max_hp)),
                EntityKind::Bed(bed) if !bed.health.is_depleted() => beds.push(entity.id),
                _ => {}
            }
        }

        for (id, position, factor) in players {
            let damage = explosion_damage(combat.tnt_damage, factor);
            let knockback =
                (position - center).normalize_or_zero() * combat.tnt_knockback * factor;
            self.hit_player(id, damage, placed_by, knockback);
        }
        for (id, max_hp) in blocks {
            self.damage_block(id, max_hp);
        }
        for id in beds {
            self.damage_bed(id, combat.tnt_damage, placed_by);
        }
        for id in chained {
            if let Some(EntityKind::Block(block)) =
                self.state.entities.get_mut(id).map(|e| &mut e.kind)
            {
                block.detonate_at_ms = Some(now);
            }
        }
    }
}
