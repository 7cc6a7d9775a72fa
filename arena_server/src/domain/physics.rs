// Port to the rigid-body engine. The simulation never sees engine internals,
// only typed handles and the body → entity side table kept behind this trait.

use super::entity::EntityId;
use glam::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Circle { radius: f32 },
    Rect { half_extents: Vec2 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// Moved by velocity, pushed out of static bodies.
    Dynamic,
    /// Immovable obstacle (blocks, beds).
    Static,
    /// Moves freely and reports contacts without being pushed (projectiles).
    Sensor,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyDesc {
    pub position: Vec2,
    pub velocity: Vec2,
    pub shape: Shape,
    pub kind: BodyKind,
}

/// Two bodies touched during the last step. `a` is the moving body and `point` is
/// where its centre was when the touch began.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub a: BodyHandle,
    pub b: BodyHandle,
    pub point: Vec2,
}

pub trait PhysicsWorld: Send {
    fn create_body(&mut self, entity: EntityId, desc: BodyDesc) -> BodyHandle;
    /// Removing an unknown handle is a no-op.
    fn remove_body(&mut self, handle: BodyHandle);
    fn entity_of(&self, handle: BodyHandle) -> Option<EntityId>;
    fn body_of(&self, entity: EntityId) -> Option<BodyHandle>;
    fn position(&self, handle: BodyHandle) -> Option<Vec2>;
    fn velocity(&self, handle: BodyHandle) -> Option<Vec2>;
    fn set_position(&mut self, handle: BodyHandle, position: Vec2);
    /// Sets the driven velocity and clears any residual knockback.
    fn set_velocity(&mut self, handle: BodyHandle, velocity: Vec2);
    /// Sets the driven velocity, leaving knockback to decay on its own.
    fn drive(&mut self, handle: BodyHandle, velocity: Vec2);
    fn apply_impulse(&mut self, handle: BodyHandle, impulse: Vec2);
    fn step(&mut self, dt: f32);
    /// Contacts of the last step, earliest first per moving body.
    fn drain_contacts(&mut self) -> Vec<Contact>;
}
