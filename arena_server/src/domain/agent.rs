// Agents pair an entity record with its physics body and an ordered behavior list.

use super::behaviors::{AiControl, PlayerControl, SyncTransform};
use super::entity::{Entity, EntityId};
use super::input::{Command, PlayerInput};
use super::physics::{BodyHandle, PhysicsWorld};
use super::state::EntityStore;
use super::tuning::Tuning;
use std::collections::VecDeque;

/// Everything a tick exposes to behaviors.
pub struct TickEnv<'a> {
    pub entities: &'a mut EntityStore,
    pub physics: &'a mut dyn PhysicsWorld,
    pub commands: &'a mut Vec<Command>,
    pub tuning: &'a Tuning,
    pub now_ms: u64,
    pub dt: f32,
}

/// View handed to one behavior of one agent.
///
/// Behaviors may mutate their own entity and body; everything else is read-only and
/// cross-entity effects go through `commands`.
pub struct BehaviorCtx<'a, 'b> {
    pub entity_id: EntityId,
    pub body: BodyHandle,
    pub env: &'b mut TickEnv<'a>,
    pub inputs: &'b mut VecDeque<PlayerInput>,
}

impl BehaviorCtx<'_, '_> {
    pub fn me(&self) -> Option<&Entity> {
        self.env.entities.get(self.entity_id)
    }

    pub fn me_mut(&mut self) -> Option<&mut Entity> {
        self.env.entities.get_mut(self.entity_id)
    }

    pub fn others(&self) -> impl Iterator<Item = &Entity> {
        let me = self.entity_id;
        self.env.entities.iter().filter(move |e| e.id != me)
    }

    pub fn push_command(&mut self, command: Command) {
        self.env.commands.push(command);
    }
}

pub trait Behavior: Send {
    fn update(&mut self, _ctx: &mut BehaviorCtx<'_, '_>) {}
    fn post_update(&mut self, _ctx: &mut BehaviorCtx<'_, '_>) {}
}

pub struct Agent {
    pub entity_id: EntityId,
    pub body: BodyHandle,
    /// Inputs in receipt order; drained by `PlayerControl` during `update`.
    pub inputs: VecDeque<PlayerInput>,
    behaviors: Vec<Box<dyn Behavior>>,
}

impl Agent {
    pub fn new(entity_id: EntityId, body: BodyHandle, behaviors: Vec<Box<dyn Behavior>>) -> Self {
        Self {
            entity_id,
            body,
            inputs: VecDeque::new(),
            behaviors,
        }
    }

    /// AI synthesizes input first so control applies it in the same tick.
    pub fn player(entity_id: EntityId, body: BodyHandle) -> Self {
        Self::new(
            entity_id,
            body,
            vec![
                Box::new(AiControl),
                Box::new(PlayerControl),
                Box::new(SyncTransform),
            ],
        )
    }

    pub fn projectile(entity_id: EntityId, body: BodyHandle) -> Self {
        Self::new(entity_id, body, vec![Box::new(SyncTransform)])
    }

    pub fn update(&mut self, env: &mut TickEnv<'_>) {
        let mut ctx = BehaviorCtx {
            entity_id: self.entity_id,
            body: self.body,
            env,
            inputs: &mut self.inputs,
        };
        for behavior in self.behaviors.iter_mut() {
            behavior.update(&mut ctx);
        }
    }

    pub fn post_update(&mut self, env: &mut TickEnv<'_>) {
        let mut ctx = BehaviorCtx {
            entity_id: self.entity_id,
            body: self.body,
            env,
            inputs: &mut self.inputs,
        };
        for behavior in self.behaviors.iter_mut() {
            behavior.post_update(&mut ctx);
        }
    }
}
