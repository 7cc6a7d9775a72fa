// Background passes run once per wall-clock callback: generators, TNT fuses and drop
// cleanup.

use super::Simulation;
use crate::domain::entity::{EntityId, EntityKind, GeneratorType, LocationClass};
use crate::domain::items::BlockType;
use crate::domain::loot::{profile_for, table_for};
use glam::Vec2;
use rand::Rng;
use std::f32::consts::TAU;
use tracing::debug;

impl Simulation {
    /// Each due generator rolls its loot table unless enough loot already lies around it.
    pub(crate) fn tick_generators(&mut self) {
        let now = self.now_ms();
        let merge_radius = self.tuning.economy.merge_radius;
        let generators: Vec<(EntityId, Vec2, GeneratorType, LocationClass)> = self
            .state
            .entities
            .iter()
            .filter_map(|e| match &e.kind {
                EntityKind::ResourceGenerator(g)
                    if now.saturating_sub(g.last_spawn_ms)
                        >= profile_for(g.location).interval_ms =>
                {
                    Some((e.id, e.position, g.generator_type, g.location))
                }
                _ => None,
            })
            .collect();

        for (id, center, generator_type, location) in generators {
            if let Some(EntityKind::ResourceGenerator(g)) =
                self.state.entities.get_mut(id).map(|e| &mut e.kind)
            {
                g.last_spawn_ms = now;
            }

            let profile = profile_for(location);
            let nearby = self.units_near(center, profile.spawn_radius + merge_radius);
            if nearby >= profile.cap {
                continue;
            }
            let Some(roll) = table_for(generator_type).roll(&mut self.rng) else {
                continue;
            };
            let angle = self.rng.gen_range(0.0..TAU);
            let distance = profile.spawn_radius * self.rng.gen_range(0.0f32..1.0).sqrt();
            let position = center + Vec2::from_angle(angle) * distance;
            let drop = self.spawn_drop(roll.item, roll.count, position);
            debug!(
                generator = id.0,
                drop = drop.0,
                item = roll.item.name(),
                count = roll.count,
                "generator spawned loot"
            );
        }
    }

    /// Units of loot lying within `radius` of `center`.
    pub(crate) fn units_near(&self, center: Vec2, radius: f32) -> u32 {
        self.state
            .entities
            .iter()
            .filter(|e| e.position.distance(center) <= radius)
            .map(|e| match &e.kind {
                EntityKind::DroppedItem(drop) => drop.count,
                _ => 0,
            })
            .sum()
    }

    /// Detonates every TNT whose fuse has run out. The due list is taken up front, so TNT
    /// re-armed by these blasts goes off on the next pass.
    pub(crate) fn check_fuses(&mut self) {
        let now = self.now_ms();
        let due: Vec<EntityId> = self
            .state
            .entities
            .iter()
            .filter_map(|e| match &e.kind {
                EntityKind::Block(block)
                    if block.block_type == BlockType::Tnt
                        && block.detonate_at_ms.is_some_and(|at| at <= now) =>
                {
                    Some(e.id)
                }
                _ => None,
            })
            .collect();

        for id in due {
            self.detonate(id);
        }
    }

    pub(crate) fn maybe_cleanup_drops(&mut self) {
        if self.rng.gen_bool(self.tuning.economy.cleanup_chance.clamp(0.0, 1.0)) {
            self.cleanup_drops();
        }
    }

    /// Removes drops nobody touched for the despawn age.
    pub(crate) fn cleanup_drops(&mut self) -> usize {
        let now = self.now_ms();
        let max_age = self.tuning.economy.despawn_ms;
        let expired: Vec<EntityId> = self
            .state
            .entities
            .iter()
            .filter_map(|e| match &e.kind {
                EntityKind::DroppedItem(drop)
                    if now.saturating_sub(drop.spawned_at_ms) >= max_age =>
                {
                    Some(e.id)
                }
                _ => None,
            })
            .collect();

        for id in &expired {
            self.state.entities.remove(*id);
        }
        if !expired.is_empty() {
            debug!(removed = expired.len(), "expired drops cleaned up");
        }
        expired.len()
    }
}
