// Room initialisation: beds, generators and the obstacle scatter.

use super::Simulation;
use crate::domain::entity::{
    BedState, BlockState, EntityId, EntityKind, GeneratorState, GeneratorType, Health,
    LocationClass, Team,
};
use crate::domain::items::BlockType;
use crate::domain::physics::{BodyDesc, BodyKind, Shape};
use crate::domain::rules::snap_to_cell;
use glam::Vec2;
use rand::Rng;
use tracing::debug;

pub(crate) const RED_BED: Vec2 = Vec2::new(240.0, 800.0);
pub(crate) const BLUE_BED: Vec2 = Vec2::new(2160.0, 800.0);

const GENERATORS: [(Vec2, GeneratorType, LocationClass); 4] = [
    (Vec2::new(240.0, 640.0), GeneratorType::Gold, LocationClass::Base),
    (Vec2::new(2160.0, 640.0), GeneratorType::Gold, LocationClass::Base),
    (Vec2::new(1200.0, 500.0), GeneratorType::Supply, LocationClass::Center),
    (Vec2::new(1200.0, 1100.0), GeneratorType::Supply, LocationClass::Center),
];

/// Obstacles keep this much clear space around generators.
const GENERATOR_CLEARANCE: f32 = 120.0;

pub(crate) fn bed_position(team: Team) -> Vec2 {
    match team {
        Team::Red => RED_BED,
        Team::Blue => BLUE_BED,
    }
}

impl Simulation {
    pub(super) fn build_map(&mut self) {
        let now = self.now_ms();

        for team in Team::ALL {
            let id = self.state.spawn(
                bed_position(team),
                EntityKind::Bed(BedState {
                    team,
                    health: Health::full(self.tuning.world.bed_max_hp),
                }),
            );
            self.physics.create_body(
                id,
                BodyDesc {
                    position: bed_position(team),
                    velocity: Vec2::ZERO,
                    shape: Shape::Rect {
                        half_extents: self.tuning.world.bed_half_extents,
                    },
                    kind: BodyKind::Static,
                },
            );
        }

        for (position, generator_type, location) in GENERATORS {
            self.state.spawn(
                position,
                EntityKind::ResourceGenerator(GeneratorState {
                    generator_type,
                    location,
                    last_spawn_ms: now,
                }),
            );
        }

        self.scatter_obstacles();
    }

    fn scatter_obstacles(&mut self) {
        let world = self.tuning.world;
        let band_min = Vec2::new(world.width / 3.0, world.height / 8.0);
        let band_max = Vec2::new(world.width * 2.0 / 3.0, world.height * 7.0 / 8.0);

        let mut placed = 0;
        let mut attempts = 0;
        while placed < world.obstacle_count && attempts < world.obstacle_count * 10 {
            attempts += 1;
            let raw = Vec2::new(
                self.rng.gen_range(band_min.x..band_max.x),
                self.rng.gen_range(band_min.y..band_max.y),
            );
            let cell = snap_to_cell(raw, world.cell_size);
            let crowded = self.state.entities.iter().any(|e| match &e.kind {
                EntityKind::Block(_) => e.position.distance(cell) < world.cell_size,
                EntityKind::ResourceGenerator(_) => {
                    e.position.distance(cell) < GENERATOR_CLEARANCE
                }
                _ => false,
            });
            if crowded {
                continue;
            }
            self.spawn_block(cell, BlockType::Stone, None);
            placed += 1;
        }
        debug!(placed, attempts, "obstacles scattered");
    }

    pub(crate) fn spawn_block(
        &mut self,
        cell: Vec2,
        block_type: BlockType,
        placed_by: Option<EntityId>,
    ) -> EntityId {
        let id = self
            .state
            .spawn(cell, EntityKind::Block(BlockState::new(block_type, placed_by)));
        self.physics.create_body(
            id,
            BodyDesc {
                position: cell,
                velocity: Vec2::ZERO,
                shape: Shape::Rect {
                    half_extents: Vec2::splat(self.tuning.world.cell_size / 2.0),
                },
                kind: BodyKind::Static,
            },
        );
        id
    }

    /// Spawn point of a session's first or second character.
    pub(crate) fn spawn_point(&self, team: Team, index: usize) -> Vec2 {
        let offset = self.tuning.player.spawn_offset;
        let dy = if index == 0 { -offset } else { offset };
        let dx = match team {
            Team::Red => offset,
            Team::Blue => -offset,
        };
        bed_position(team) + Vec2::new(dx, dy)
    }
}
